mod cost;
mod graph_cut;
mod seeds;
mod volume;

pub use cost::{scale_cost, CostFunction, IntensityCostFunction, IntensityStatistics, MAX_CAPACITY, MIN_CAPACITY};
pub use graph_cut::{seed_capacity, GraphCut};
pub use seeds::Seeds;
pub use volume::{Label, LabelVolume, Volume};
