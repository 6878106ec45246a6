use std::io;

use thiserror::Error;

/// Reasons a graph cut cannot be built or run. Broken internal invariants
/// are not reported here; they panic.
#[derive(Debug, Error)]
pub enum GraphCutError {
    #[error("connectivity is unconnected, no graph built")]
    Unconnected,
    #[error("dimensions must be positive, got {0:?}")]
    InvalidDimensions([i64; 3]),
    #[error("unknown connectivity '{0}', expected six, eighteen or twentysix")]
    UnknownConnectivity(String),
    #[error("edge capacities have not been assigned")]
    CapacitiesNotAssigned,
    #[error("edge table built for {edges} nodes does not match a grid of {grid} nodes")]
    TopologyMismatch { grid: usize, edges: usize },
    #[error("no input volume set")]
    MissingInput,
    #[error("need at least one seed per label, got {foreground} foreground and {background} background")]
    MissingSeeds { foreground: usize, background: usize },
    #[error("seed {0:?} lies outside the volume")]
    SeedOutOfBounds([usize; 3]),
    #[error("voxel {0:?} is seeded as both foreground and background")]
    ConflictingSeed([usize; 3]),
    #[error("volume of dimensions {dimensions:?} needs {expected} intensities, got {actual}")]
    VolumeSizeMismatch {
        dimensions: [usize; 3],
        expected: usize,
        actual: usize,
    },
    #[error("cannot read configuration")]
    ConfigIo(#[from] io::Error),
    #[error("cannot parse configuration")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphCutError>;
