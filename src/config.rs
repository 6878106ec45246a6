use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphCutError, Result};
use crate::graph::{Connectivity, Grid};

/// Graph shape and solver settings, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphCutConfig {
    /// Volume size along x, y and z. Signed so that bad input can be reported.
    pub dimensions: [i64; 3],
    pub connectivity: Connectivity,
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Stop after this many augmentations. `None` runs to convergence.
    pub max_augmentations: Option<usize>,
}

impl Default for GraphCutConfig {
    fn default() -> Self {
        Self {
            dimensions: [1, 1, 1],
            connectivity: Connectivity::Unconnected,
            solver: SolverConfig::default(),
        }
    }
}

impl GraphCutConfig {
    pub fn new(dimensions: [i64; 3], connectivity: Connectivity) -> Self {
        Self {
            dimensions,
            connectivity,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks the configuration and builds the grid it describes.
    pub fn validate(&self) -> Result<Grid> {
        if self.connectivity == Connectivity::Unconnected {
            return Err(GraphCutError::Unconnected);
        }
        if self.dimensions.iter().any(|&d| d <= 0) {
            return Err(GraphCutError::InvalidDimensions(self.dimensions));
        }
        Grid::new(self.dimensions.map(|d| d as usize), self.connectivity)
    }
}
