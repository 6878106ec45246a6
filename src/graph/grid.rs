use std::fmt;
use std::str::FromStr;

use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::error::{GraphCutError, Result};

/// Which of the 26 unit offsets around a voxel count as neighbors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    Unconnected,
    /// Face neighbors only.
    Six,
    /// Face and edge neighbors.
    Eighteen,
    /// Face, edge and corner neighbors.
    TwentySix,
}

impl Connectivity {
    /// Returns whether a voxel at offset `(dx, dy, dz)` is connected to the center voxel.
    /// Every component must be -1, 0 or 1.
    pub fn is_offset_connected(self, dx: i64, dy: i64, dz: i64) -> bool {
        assert!(
            dx.abs() <= 1 && dy.abs() <= 1 && dz.abs() <= 1,
            "({dx}, {dy}, {dz}) is not a unit offset"
        );
        let axes = dx.abs() + dy.abs() + dz.abs();
        match self {
            Connectivity::Unconnected => false,
            Connectivity::Six => axes == 1,
            Connectivity::Eighteen => axes == 1 || axes == 2,
            Connectivity::TwentySix => axes > 0,
        }
    }

    /// Number of neighbors of an interior voxel.
    pub fn neighbor_count(self) -> usize {
        match self {
            Connectivity::Unconnected => 0,
            Connectivity::Six => 6,
            Connectivity::Eighteen => 18,
            Connectivity::TwentySix => 26,
        }
    }

    /// Number of neighbors of an interior voxel that have a higher linear index.
    /// Every grid edge is owned by its lower-index endpoint, so this is the
    /// number of grid edges stored per voxel.
    pub fn forward_neighbor_count(self) -> usize {
        self.neighbor_count() / 2
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Connectivity::Unconnected => "unconnected",
            Connectivity::Six => "six",
            Connectivity::Eighteen => "eighteen",
            Connectivity::TwentySix => "twentysix",
        };
        f.write_str(name)
    }
}

impl FromStr for Connectivity {
    type Err = GraphCutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unconnected" | "0" => Ok(Connectivity::Unconnected),
            "six" | "6" => Ok(Connectivity::Six),
            "eighteen" | "18" => Ok(Connectivity::Eighteen),
            "twentysix" | "26" => Ok(Connectivity::TwentySix),
            _ => Err(GraphCutError::UnknownConnectivity(s.to_string())),
        }
    }
}

/// The node space of a voxel volume: linear indices laid out row-major with x
/// varying fastest, then y, then z.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    dimensions: [usize; 3],
    connectivity: Connectivity,
    // connected unit offsets, z outermost and x innermost
    offsets: Vec<[i64; 3]>,
}

impl Grid {
    pub fn new(dimensions: [usize; 3], connectivity: Connectivity) -> Result<Self> {
        if connectivity == Connectivity::Unconnected {
            return Err(GraphCutError::Unconnected);
        }
        if dimensions.iter().any(|&d| d == 0) {
            return Err(GraphCutError::InvalidDimensions(dimensions.map(|d| d as i64)));
        }

        let offsets = iproduct!(-1i64..=1, -1i64..=1, -1i64..=1)
            .map(|(dz, dy, dx)| [dx, dy, dz])
            .filter(|&[dx, dy, dz]| connectivity.is_offset_connected(dx, dy, dz))
            .collect();

        Ok(Self {
            dimensions,
            connectivity,
            offsets,
        })
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn node_count(&self) -> usize {
        self.dimensions.iter().product()
    }

    pub fn is_valid_coordinate(&self, coordinate: [i64; 3]) -> bool {
        coordinate
            .iter()
            .zip(self.dimensions.iter())
            .all(|(&c, &d)| c >= 0 && (c as usize) < d)
    }

    /// Linear index of an in-bounds coordinate. Panics when the coordinate is
    /// outside the grid; check with [`Grid::is_valid_coordinate`] first.
    pub fn index_for_coordinate(&self, coordinate: [usize; 3]) -> usize {
        let [x, y, z] = coordinate;
        let [width, height, depth] = self.dimensions;
        assert!(
            x < width && y < height && z < depth,
            "coordinate {coordinate:?} outside grid {:?}",
            self.dimensions
        );
        x + y * width + z * width * height
    }

    pub fn coordinate_for_index(&self, index: usize) -> Option<[usize; 3]> {
        if index >= self.node_count() {
            return None;
        }
        let [width, height, _] = self.dimensions;
        let slice = width * height;
        let z = index / slice;
        let rest = index - z * slice;
        let y = rest / width;
        let x = rest - y * width;
        Some([x, y, z])
    }

    fn offset_index(&self, coordinate: [usize; 3], offset: [i64; 3]) -> Option<usize> {
        let shifted = [
            coordinate[0] as i64 + offset[0],
            coordinate[1] as i64 + offset[1],
            coordinate[2] as i64 + offset[2],
        ];
        if !self.is_valid_coordinate(shifted) {
            return None;
        }
        Some(self.index_for_coordinate(shifted.map(|c| c as usize)))
    }

    /// Indices of all connected, in-bounds neighbors of `index`, in stencil order.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let coordinate = self
            .coordinate_for_index(index)
            .unwrap_or_else(|| panic!("node {index} outside grid {:?}", self.dimensions));
        self.offsets
            .iter()
            .filter_map(move |&offset| self.offset_index(coordinate, offset))
    }

    /// Neighbors of `index` with a strictly higher linear index.
    pub fn forward_neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors(index).filter(move |&neighbor| neighbor > index)
    }
}
