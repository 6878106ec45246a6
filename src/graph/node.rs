use std::ops::{Index, IndexMut};

/// One of the two terminals of the cut. Also used as the polarity of a search
/// tree, since every tree is rooted at a terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Terminal {
    Source,
    Sink,
}

impl Terminal {
    pub fn opposite(self) -> Self {
        match self {
            Terminal::Source => Terminal::Sink,
            Terminal::Sink => Terminal::Source,
        }
    }
}

/// Identifies a grid node or a terminal. Terminals are never stored in the
/// [`NodeStore`], "no node" is expressed as `Option<NodeIndex>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeIndex {
    Terminal(Terminal),
    Grid(usize),
}

impl NodeIndex {
    pub const SOURCE: NodeIndex = NodeIndex::Terminal(Terminal::Source);
    pub const SINK: NodeIndex = NodeIndex::Terminal(Terminal::Sink);

    pub fn is_terminal(self) -> bool {
        matches!(self, NodeIndex::Terminal(_))
    }

    pub fn grid(self) -> Option<usize> {
        match self {
            NodeIndex::Grid(index) => Some(index),
            NodeIndex::Terminal(_) => None,
        }
    }
}

impl From<usize> for NodeIndex {
    fn from(index: usize) -> Self {
        NodeIndex::Grid(index)
    }
}

impl From<Terminal> for NodeIndex {
    fn from(terminal: Terminal) -> Self {
        NodeIndex::Terminal(terminal)
    }
}

/// Search-tree state of a single voxel.
///
/// A free node has no tree, no parent and no depth. An attached node's depth is
/// one more than its parent's, with terminals at depth 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub tree: Option<Terminal>,
    pub parent: Option<NodeIndex>,
    pub depth: Option<usize>,
    pub active: bool,
    pub orphan: bool,
}

impl Node {
    pub fn is_free(&self) -> bool {
        self.tree.is_none()
    }

    pub fn belongs_to(&self, tree: Terminal) -> bool {
        self.tree == Some(tree)
    }

    /// Removes the node from its tree entirely.
    pub fn detach(&mut self) {
        *self = Node::default();
    }
}

#[derive(Clone, Debug, Default)]
pub struct NodeStore {
    nodes: Vec<Node>,
}

impl NodeStore {
    pub fn new(node_count: usize) -> Self {
        Self {
            nodes: vec![Node::default(); node_count],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Depth of any node index, terminals included. `None` for free grid nodes.
    pub fn depth_of(&self, node: NodeIndex) -> Option<usize> {
        match node {
            NodeIndex::Terminal(_) => Some(0),
            NodeIndex::Grid(index) => self.nodes[index].depth,
        }
    }

    /// Tree membership of any node index; a terminal belongs to its own tree.
    pub fn tree_of(&self, node: NodeIndex) -> Option<Terminal> {
        match node {
            NodeIndex::Terminal(terminal) => Some(terminal),
            NodeIndex::Grid(index) => self.nodes[index].tree,
        }
    }

    pub fn reset(&mut self) {
        self.nodes.iter_mut().for_each(Node::detach);
    }
}

impl Index<usize> for NodeStore {
    type Output = Node;

    fn index(&self, index: usize) -> &Node {
        &self.nodes[index]
    }
}

impl IndexMut<usize> for NodeStore {
    fn index_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }
}
