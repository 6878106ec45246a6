use crate::graph::node::{NodeIndex, Terminal};

/// Integer capacity and flow unit. Integers keep augmentation exact.
pub type Capacity = i64;

/// An undirected edge between two nodes, addressed by index.
///
/// Capacity is the maximum flow in either direction. Flow is signed: positive
/// means from `node1` to `node2`. Use the `*_from_node` methods to read or
/// change either as seen from one of the endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    node1: NodeIndex,
    node2: NodeIndex,
    capacity: Capacity,
    flow: Capacity,
}

impl Edge {
    pub fn new(node1: NodeIndex, node2: NodeIndex) -> Self {
        assert_ne!(node1, node2, "edge endpoints must differ");
        assert!(
            !(node1.is_terminal() && node2.is_terminal()),
            "terminals are never connected directly"
        );
        Self {
            node1,
            node2,
            capacity: 0,
            flow: 0,
        }
    }

    pub fn node1(&self) -> NodeIndex {
        self.node1
    }

    pub fn node2(&self) -> NodeIndex {
        self.node2
    }

    pub fn is_terminal(&self) -> bool {
        self.node1.is_terminal() || self.node2.is_terminal()
    }

    /// The terminal endpoint, if this is a terminal edge.
    pub fn terminal(&self) -> Option<Terminal> {
        match (self.node1, self.node2) {
            (NodeIndex::Terminal(terminal), _) | (_, NodeIndex::Terminal(terminal)) => {
                Some(terminal)
            }
            _ => None,
        }
    }

    /// The grid endpoint of a terminal edge.
    pub fn grid_node(&self) -> Option<usize> {
        match (self.node1, self.node2) {
            (NodeIndex::Terminal(_), NodeIndex::Grid(index))
            | (NodeIndex::Grid(index), NodeIndex::Terminal(_)) => Some(index),
            _ => None,
        }
    }

    pub fn connects(&self, node: NodeIndex) -> bool {
        self.node1 == node || self.node2 == node
    }

    pub fn other(&self, node: NodeIndex) -> Option<NodeIndex> {
        if node == self.node1 {
            Some(self.node2)
        } else if node == self.node2 {
            Some(self.node1)
        } else {
            None
        }
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn flow(&self) -> Capacity {
        self.flow
    }

    pub fn set_capacity(&mut self, capacity: Capacity) {
        assert!(capacity >= 0, "capacity must be non-negative, got {capacity}");
        assert!(
            self.flow.abs() <= capacity,
            "capacity {capacity} below current flow {}",
            self.flow
        );
        self.capacity = capacity;
    }

    pub fn reset_flow(&mut self) {
        self.flow = 0;
    }

    /// Current flow leaving `node` through this edge.
    pub fn flow_from_node(&self, node: NodeIndex) -> Capacity {
        assert!(self.connects(node), "{node:?} is not an endpoint of {self:?}");
        if node == self.node1 {
            self.flow
        } else {
            -self.flow
        }
    }

    /// Residual capacity in the direction leaving `node`.
    pub fn capacity_from_node(&self, node: NodeIndex) -> Capacity {
        self.capacity - self.flow_from_node(node)
    }

    pub fn is_saturated_from_node(&self, node: NodeIndex) -> bool {
        self.capacity_from_node(node) == 0
    }

    pub fn add_flow_from_node(&mut self, node: NodeIndex, added_flow: Capacity) {
        let residual = self.capacity_from_node(node);
        assert!(
            added_flow <= residual,
            "pushing {added_flow} from {node:?} exceeds residual capacity {residual}"
        );
        if node == self.node1 {
            self.flow += added_flow;
        } else {
            self.flow -= added_flow;
        }
    }
}
