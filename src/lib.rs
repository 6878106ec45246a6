//! Minimum s-t cuts over 3-D voxel grids, used to segment a volume into
//! foreground and background from a few seed points.

pub mod config;
pub mod cuts;
pub mod error;
pub mod graph;
pub mod segmentation;

pub use config::{GraphCutConfig, SolverConfig};
pub use cuts::{Cut, SolveStats, Solver};
pub use error::{GraphCutError, Result};
pub use graph::{Capacity, Connectivity, Edge, EdgeTable, Grid, NodeIndex, Terminal};
pub use segmentation::{CostFunction, GraphCut, IntensityCostFunction, Label, LabelVolume, Seeds, Volume};
