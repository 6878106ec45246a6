mod cut;
mod frontier;
mod residual;
mod solver;
mod tree;

pub use cut::Cut;
pub use frontier::Frontier;
pub use residual::{reachable_from_source, residual_graph, residual_index, ResidualGraph};
pub use solver::{GrowOutcome, SolveStats, Solver};
pub use tree::{AdoptionSummary, Tree};
