use petgraph::graph::NodeIndex as ResidualIndex;
use petgraph::visit::Bfs;
use petgraph::{Directed, Graph};

use crate::graph::{Capacity, EdgeTable, NodeIndex, Terminal};

/// Directed graph holding one edge per direction with positive residual
/// capacity, weighted by that residual.
pub type ResidualGraph = Graph<(), Capacity, Directed, usize>;

/// Position of a node in the residual graph: grid nodes keep their index,
/// SOURCE and SINK follow them.
pub fn residual_index(node: NodeIndex, node_count: usize) -> usize {
    match node {
        NodeIndex::Grid(index) => index,
        NodeIndex::Terminal(Terminal::Source) => node_count,
        NodeIndex::Terminal(Terminal::Sink) => node_count + 1,
    }
}

pub fn residual_graph(edges: &EdgeTable) -> ResidualGraph {
    let node_count = edges.node_count();
    let mut graph = ResidualGraph::with_capacity(node_count + 2, 2 * edges.len());
    for _ in 0..node_count + 2 {
        graph.add_node(());
    }

    for edge in edges.iter() {
        let (node1, node2) = (edge.node1(), edge.node2());
        let a = ResidualIndex::<usize>::new(residual_index(node1, node_count));
        let b = ResidualIndex::<usize>::new(residual_index(node2, node_count));
        let forward = edge.capacity_from_node(node1);
        if forward > 0 {
            graph.add_edge(a, b, forward);
        }
        let backward = edge.capacity_from_node(node2);
        if backward > 0 {
            graph.add_edge(b, a, backward);
        }
    }
    graph
}

/// Marks every node reachable from SOURCE, indexed like the residual graph.
pub fn reachable_from_source(graph: &ResidualGraph, node_count: usize) -> Vec<bool> {
    let source = ResidualIndex::<usize>::new(residual_index(NodeIndex::SOURCE, node_count));
    let mut reachable = vec![false; graph.node_count()];
    let mut bfs = Bfs::new(graph, source);
    while let Some(node) = bfs.next(graph) {
        reachable[node.index()] = true;
    }
    reachable
}
