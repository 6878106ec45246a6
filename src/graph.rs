mod edge;
mod edges;
mod grid;
mod node;

pub use edge::{Capacity, Edge};
pub use edges::EdgeTable;
pub use grid::{Connectivity, Grid};
pub use node::{Node, NodeIndex, NodeStore, Terminal};
