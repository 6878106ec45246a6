use crate::cuts::residual::{reachable_from_source, residual_graph, residual_index};
use crate::graph::{Capacity, EdgeTable};

/// A partition of the grid nodes into the SOURCE and SINK sides, with the
/// edges of positive capacity crossing between them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cut {
    pub source_set: Vec<usize>,
    pub sink_set: Vec<usize>,
    pub cut_set: Vec<usize>,
    pub capacity: Capacity,
}

impl Cut {
    /// The cut closest to SOURCE: its side holds every node still reachable
    /// from SOURCE over edges with residual capacity. After a maximum flow its
    /// capacity equals the flow value.
    pub fn from_residual(edges: &EdgeTable) -> Self {
        let node_count = edges.node_count();
        let graph = residual_graph(edges);
        let reachable = reachable_from_source(&graph, node_count);

        let (source_set, sink_set): (Vec<usize>, Vec<usize>) =
            (0..node_count).partition(|&index| reachable[index]);
        let cut_set: Vec<usize> = edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| {
                edge.capacity() > 0
                    && reachable[residual_index(edge.node1(), node_count)]
                    != reachable[residual_index(edge.node2(), node_count)]
            })
            .map(|(index, _)| index)
            .collect();
        let capacity = cut_set.iter().map(|&index| edges[index].capacity()).sum();

        Self {
            source_set,
            sink_set,
            cut_set,
            capacity,
        }
    }

    /// Number of edges crossing the cut.
    pub fn size(&self) -> usize {
        self.cut_set.len()
    }
}
