use std::ops::{Index, IndexMut};

use crate::graph::edge::{Capacity, Edge};
use crate::graph::grid::Grid;
use crate::graph::node::NodeIndex;

/// All edges of a grid graph, stored in one flat vector.
///
/// Node `i` owns a contiguous block: its SOURCE edge, its SINK edge, then one
/// edge to every connected neighbor with a higher index, in stencil order.
/// Boundary nodes own shorter blocks, so block starts are recorded while the
/// table is built and lookups jump straight to the block of the lower endpoint.
///
/// The table remembers which edges have been given a capacity. It counts as
/// assigned only once every edge has one.
#[derive(Clone, Debug)]
pub struct EdgeTable {
    edges: Vec<Edge>,
    block_starts: Vec<usize>,
    assigned: Vec<bool>,
    unassigned: usize,
}

impl EdgeTable {
    pub fn new(grid: &Grid) -> Self {
        let node_count = grid.node_count();
        let per_node = 2 + grid.connectivity().forward_neighbor_count();
        let mut edges = Vec::with_capacity(node_count * per_node);
        let mut block_starts = Vec::with_capacity(node_count + 1);

        for index in 0..node_count {
            block_starts.push(edges.len());
            edges.push(Edge::new(NodeIndex::SOURCE, NodeIndex::Grid(index)));
            edges.push(Edge::new(NodeIndex::Grid(index), NodeIndex::SINK));
            edges.extend(
                grid.forward_neighbors(index)
                    .map(|neighbor| Edge::new(NodeIndex::Grid(index), NodeIndex::Grid(neighbor))),
            );
        }
        block_starts.push(edges.len());

        let unassigned = edges.len();
        Self {
            assigned: vec![false; unassigned],
            unassigned,
            edges,
            block_starts,
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of grid nodes this table was built for.
    pub fn node_count(&self) -> usize {
        self.block_starts.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// The block of edges owned by grid node `node`.
    pub fn edges_for_node(&self, node: usize) -> &[Edge] {
        &self.edges[self.block_starts[node]..self.block_starts[node + 1]]
    }

    /// Index of the edge connecting `a` and `b`, in either order. `None` when the
    /// two nodes are not adjacent. Never allocates; scans at most one block.
    pub fn index_for(&self, a: NodeIndex, b: NodeIndex) -> Option<usize> {
        // the owner of an edge is its grid endpoint, or the lower one of two grid endpoints
        let (from, to) = match (a, b) {
            (NodeIndex::Terminal(_), NodeIndex::Terminal(_)) => return None,
            (NodeIndex::Grid(grid), terminal @ NodeIndex::Terminal(_))
            | (terminal @ NodeIndex::Terminal(_), NodeIndex::Grid(grid)) => (grid, terminal),
            (NodeIndex::Grid(a), NodeIndex::Grid(b)) => (a.min(b), NodeIndex::Grid(a.max(b))),
        };
        if from >= self.node_count() {
            return None;
        }

        let start = self.block_starts[from];
        let owner = NodeIndex::Grid(from);
        self.edges_for_node(from)
            .iter()
            .position(|edge| edge.other(owner) == Some(to))
            .map(|offset| start + offset)
    }

    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<&Edge> {
        self.index_for(a, b).map(|index| &self.edges[index])
    }

    pub fn set_capacity(&mut self, index: usize, capacity: Capacity) {
        self.edges[index].set_capacity(capacity);
        if !self.assigned[index] {
            self.assigned[index] = true;
            self.unassigned -= 1;
        }
    }

    /// Sets the capacity of every edge from `capacity_for`.
    pub fn assign_capacities<F>(&mut self, mut capacity_for: F)
    where
        F: FnMut(&Edge) -> Capacity,
    {
        for edge in self.edges.iter_mut() {
            let capacity = capacity_for(edge);
            edge.set_capacity(capacity);
        }
        self.assigned.fill(true);
        self.unassigned = 0;
    }

    /// True once every edge has been given a capacity.
    pub fn capacities_assigned(&self) -> bool {
        self.unassigned == 0
    }

    /// Number of edges still waiting for a capacity.
    pub fn unassigned_count(&self) -> usize {
        self.unassigned
    }

    pub fn reset_flows(&mut self) {
        self.edges.iter_mut().for_each(Edge::reset_flow);
    }
}

impl Index<usize> for EdgeTable {
    type Output = Edge;

    fn index(&self, index: usize) -> &Edge {
        &self.edges[index]
    }
}

impl IndexMut<usize> for EdgeTable {
    fn index_mut(&mut self, index: usize) -> &mut Edge {
        &mut self.edges[index]
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::graph::edges::EdgeTable;
    use crate::graph::grid::{Connectivity, Grid};
    use crate::graph::node::NodeIndex;

    fn table(dimensions: [usize; 3], connectivity: Connectivity) -> EdgeTable {
        EdgeTable::new(&Grid::new(dimensions, connectivity).unwrap())
    }

    #[test]
    fn edge_counts() {
        assert_eq!(2, table([1, 1, 1], Connectivity::TwentySix).len());
        assert_eq!(5, table([2, 1, 1], Connectivity::TwentySix).len());
        assert_eq!(5, table([2, 1, 1], Connectivity::Eighteen).len());
        assert_eq!(5, table([2, 1, 1], Connectivity::Six).len());
        assert_eq!(14, table([2, 2, 1], Connectivity::TwentySix).len());
        assert_eq!(14, table([2, 2, 1], Connectivity::Eighteen).len());
        assert_eq!(12, table([2, 2, 1], Connectivity::Six).len());
        assert_eq!(23, table([2, 3, 1], Connectivity::TwentySix).len());
        assert_eq!(107522, table([20, 33, 12], Connectivity::TwentySix).len());
    }

    #[test]
    fn fresh_table_has_no_capacities() {
        let edges = table([3, 3, 3], Connectivity::Six);
        assert!(!edges.capacities_assigned());
        assert!(edges.iter().all(|edge| edge.capacity() == 0 && edge.flow() == 0));
        assert!(edges.get(edges.len()).is_none());
    }

    #[test]
    fn assignment_needs_every_edge() {
        let mut edges = table([2, 1, 1], Connectivity::Six);
        assert_eq!(5, edges.unassigned_count());

        edges.set_capacity(0, 3);
        edges.set_capacity(0, 4);
        assert!(!edges.capacities_assigned());
        assert_eq!(4, edges.unassigned_count());

        for index in 1..edges.len() {
            edges.set_capacity(index, 1);
        }
        assert!(edges.capacities_assigned());
        assert_eq!(4, edges[0].capacity());

        let mut bulk = table([2, 2, 1], Connectivity::Six);
        bulk.assign_capacities(|_| 2);
        assert!(bulk.capacities_assigned());
        bulk.set_capacity(3, 5);
        assert!(bulk.capacities_assigned());
    }

    #[test]
    fn lookup_six_connected() {
        let edges = table([30, 30, 30], Connectivity::Six);
        let grid = NodeIndex::Grid;

        assert_eq!(Some(0), edges.index_for(NodeIndex::SOURCE, grid(0)));
        assert_eq!(Some(0), edges.index_for(grid(0), NodeIndex::SOURCE));
        assert_eq!(Some(1), edges.index_for(NodeIndex::SINK, grid(0)));
        assert_eq!(Some(1), edges.index_for(grid(0), NodeIndex::SINK));
        assert_eq!(Some(2), edges.index_for(grid(0), grid(1)));
        assert_eq!(Some(2), edges.index_for(grid(1), grid(0)));
        assert_eq!(None, edges.index_for(grid(0), grid(2)));
        assert_eq!(None, edges.index_for(grid(0), grid(29)));
        assert_eq!(Some(3), edges.index_for(grid(0), grid(30)));
        assert_eq!(None, edges.index_for(grid(0), grid(31)));
        assert_eq!(Some(4), edges.index_for(grid(0), grid(900)));

        assert_eq!(Some(5), edges.index_for(grid(1), NodeIndex::SOURCE));
        assert_eq!(Some(6), edges.index_for(NodeIndex::SINK, grid(1)));
        assert_eq!(Some(7), edges.index_for(grid(2), grid(1)));
        assert_eq!(None, edges.index_for(grid(1), grid(3)));
        assert_eq!(None, edges.index_for(grid(1), grid(30)));
        assert_eq!(Some(8), edges.index_for(grid(1), grid(31)));
        assert_eq!(None, edges.index_for(grid(1), grid(32)));
        assert_eq!(Some(9), edges.index_for(grid(1), grid(901)));
    }

    #[test]
    fn lookup_rejects_non_adjacent_pairs() {
        let edges = table([4, 4, 4], Connectivity::TwentySix);
        assert_eq!(None, edges.index_for(NodeIndex::SOURCE, NodeIndex::SINK));
        assert_eq!(None, edges.index_for(NodeIndex::Grid(5), NodeIndex::Grid(5)));
        assert_eq!(None, edges.index_for(NodeIndex::Grid(64), NodeIndex::SOURCE));
        assert_eq!(None, edges.index_for(NodeIndex::Grid(0), NodeIndex::Grid(63)));
    }

    #[test]
    fn canonical_orientation() {
        for connectivity in [Connectivity::Six, Connectivity::Eighteen, Connectivity::TwentySix] {
            let edges = table([30, 30, 30], connectivity);
            let grid = NodeIndex::Grid;

            let edge = edges.edge_between(grid(1), grid(0)).unwrap();
            assert_eq!((grid(0), grid(1)), (edge.node1(), edge.node2()));

            let edge = edges.edge_between(grid(80), NodeIndex::SOURCE).unwrap();
            assert_eq!((NodeIndex::SOURCE, grid(80)), (edge.node1(), edge.node2()));

            let edge = edges.edge_between(NodeIndex::SINK, grid(80)).unwrap();
            assert_eq!((grid(80), NodeIndex::SINK), (edge.node1(), edge.node2()));

            let edge = edges.edge_between(grid(80), grid(79)).unwrap();
            assert_eq!((grid(79), grid(80)), (edge.node1(), edge.node2()));

            assert!(edges.edge_between(grid(0), grid(100)).is_none());
        }
    }

    #[test]
    fn blocks_hold_owner_edges() {
        let edges = table([3, 2, 2], Connectivity::Eighteen);
        let mut total = 0;
        for node in 0..edges.node_count() {
            let block = edges.edges_for_node(node);
            assert_eq!(NodeIndex::SOURCE, block[0].node1());
            assert_eq!(NodeIndex::SINK, block[1].node2());
            assert!(block[2..].iter().all(|edge| edge.node1() == NodeIndex::Grid(node)));
            total += block.len();
        }
        assert_eq!(edges.len(), total);
    }

    #[test]
    fn assigning_capacities() {
        let mut edges = table([2, 2, 2], Connectivity::Six);
        edges.assign_capacities(|edge| if edge.is_terminal() { 3 } else { 7 });
        assert!(edges.capacities_assigned());
        let expected = |terminal: bool| if terminal { 3 } else { 7 };
        assert!(edges.iter().all(|edge| edge.capacity() == expected(edge.is_terminal())));

        edges[2].add_flow_from_node(NodeIndex::Grid(0), 4);
        edges.reset_flows();
        assert!(edges.iter().all(|edge| edge.flow() == 0));
    }

    fn connectivity_strategy() -> impl Strategy<Value = Connectivity> {
        prop_oneof![
            Just(Connectivity::Six),
            Just(Connectivity::Eighteen),
            Just(Connectivity::TwentySix),
        ]
    }

    proptest! {
        #[test]
        fn lookup_is_symmetric(
            x in 1usize..6, y in 1usize..6, z in 1usize..5,
            connectivity in connectivity_strategy(),
        ) {
            let grid = Grid::new([x, y, z], connectivity).unwrap();
            let edges = EdgeTable::new(&grid);

            for node in 0..grid.node_count() {
                let here = NodeIndex::Grid(node);
                for terminal in [NodeIndex::SOURCE, NodeIndex::SINK] {
                    let index = edges.index_for(here, terminal);
                    prop_assert!(index.is_some());
                    prop_assert_eq!(index, edges.index_for(terminal, here));
                }
                for neighbor in grid.neighbors(node) {
                    let there = NodeIndex::Grid(neighbor);
                    let index = edges.index_for(here, there);
                    prop_assert!(index.is_some());
                    prop_assert_eq!(index, edges.index_for(there, here));
                    let edge = &edges[index.unwrap()];
                    prop_assert_eq!(NodeIndex::Grid(node.min(neighbor)), edge.node1());
                    prop_assert_eq!(NodeIndex::Grid(node.max(neighbor)), edge.node2());
                }
            }

            let neighbor_pairs: usize = (0..grid.node_count()).map(|n| grid.neighbors(n).count()).sum();
            prop_assert_eq!(2 * grid.node_count() + neighbor_pairs / 2, edges.len());
        }

        #[test]
        fn residuals_sum_to_twice_capacity(capacity in 0i64..500, pushed in 0i64..500) {
            let mut edges = EdgeTable::new(&Grid::new([2, 1, 1], Connectivity::Six).unwrap());
            let index = edges.index_for(NodeIndex::Grid(0), NodeIndex::Grid(1)).unwrap();
            edges.set_capacity(index, capacity);
            let flow = pushed.min(capacity);
            edges[index].add_flow_from_node(NodeIndex::Grid(1), flow);

            let edge = &edges[index];
            for (node, other) in [(NodeIndex::Grid(0), NodeIndex::Grid(1)), (NodeIndex::Grid(1), NodeIndex::Grid(0))] {
                prop_assert_eq!(2 * capacity, edge.capacity_from_node(node) + edge.capacity_from_node(other));
                prop_assert_eq!(edge.is_saturated_from_node(node), edge.capacity_from_node(node) == 0);
            }
        }
    }
}
