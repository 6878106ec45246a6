use serde::{Deserialize, Serialize};

use crate::error::{GraphCutError, Result};
use crate::graph::{Grid, Terminal};

/// User-marked voxels, given as `[x, y, z]` coordinates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seeds {
    pub foreground: Vec<[usize; 3]>,
    pub background: Vec<[usize; 3]>,
}

impl Seeds {
    pub fn new(foreground: Vec<[usize; 3]>, background: Vec<[usize; 3]>) -> Self {
        Self {
            foreground,
            background,
        }
    }

    pub fn points(&self, terminal: Terminal) -> &[[usize; 3]] {
        match terminal {
            Terminal::Source => &self.foreground,
            Terminal::Sink => &self.background,
        }
    }

    /// Both labels need at least one seed, every seed must lie inside `grid`
    /// and no voxel may carry both labels.
    pub fn validate(&self, grid: &Grid) -> Result<()> {
        if self.foreground.is_empty() || self.background.is_empty() {
            return Err(GraphCutError::MissingSeeds {
                foreground: self.foreground.len(),
                background: self.background.len(),
            });
        }
        if let Some(&seed) = self
            .foreground
            .iter()
            .chain(&self.background)
            .find(|seed| !grid.is_valid_coordinate(seed.map(|c| c as i64)))
        {
            return Err(GraphCutError::SeedOutOfBounds(seed));
        }
        if let Some(&seed) = self
            .foreground
            .iter()
            .find(|seed| self.background.contains(seed))
        {
            return Err(GraphCutError::ConflictingSeed(seed));
        }
        Ok(())
    }

    /// Linear indices of the seeds for `terminal`. Call [`Seeds::validate`] first.
    pub fn indices<'a>(&'a self, grid: &'a Grid, terminal: Terminal) -> impl Iterator<Item = usize> + 'a {
        self.points(terminal)
            .iter()
            .map(move |&seed| grid.index_for_coordinate(seed))
    }
}
