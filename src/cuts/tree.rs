use tracing::trace;

use crate::cuts::frontier::Frontier;
use crate::graph::{Capacity, EdgeTable, Grid, NodeIndex, NodeStore, Terminal};

/// Counts of what happened while adopting one orphan and its cascade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdoptionSummary {
    pub adopted: usize,
    pub freed: usize,
}

/// One search tree, rooted at `polarity`, viewed through borrows of the
/// shared node and edge state.
///
/// The SOURCE tree pushes flow from parents to children, the SINK tree from
/// children to parents. Every residual check below is made in that direction.
pub struct Tree<'a> {
    polarity: Terminal,
    grid: &'a Grid,
    nodes: &'a mut NodeStore,
    edges: &'a mut EdgeTable,
    frontier: &'a mut Frontier,
}

impl<'a> Tree<'a> {
    pub fn new(
        polarity: Terminal,
        grid: &'a Grid,
        nodes: &'a mut NodeStore,
        edges: &'a mut EdgeTable,
        frontier: &'a mut Frontier,
    ) -> Self {
        Self {
            polarity,
            grid,
            nodes,
            edges,
            frontier,
        }
    }

    pub fn polarity(&self) -> Terminal {
        self.polarity
    }

    fn root(&self) -> NodeIndex {
        NodeIndex::Terminal(self.polarity)
    }

    fn edge_index(&self, a: NodeIndex, b: NodeIndex) -> usize {
        match self.edges.index_for(a, b) {
            Some(index) => index,
            None => panic!("Should always find an edge between {a:?} and {b:?}"),
        }
    }

    fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.tree_of(node) == Some(self.polarity)
    }

    /// Residual capacity of the edge between `parent` and `child` in the
    /// direction this tree pushes flow.
    fn residual(&self, parent: NodeIndex, child: NodeIndex) -> Capacity {
        let edge = &self.edges[self.edge_index(parent, child)];
        match self.polarity {
            Terminal::Source => edge.capacity_from_node(parent),
            Terminal::Sink => edge.capacity_from_node(child),
        }
    }

    /// Makes `child` a child of `parent` and refreshes the depth of everything
    /// hanging below `child`.
    pub fn attach_child(&mut self, child: usize, parent: NodeIndex) {
        assert_ne!(
            NodeIndex::Grid(child),
            parent,
            "cannot attach node {child} to itself"
        );
        assert!(
            self.contains(parent),
            "parent {parent:?} is not in the {:?} tree",
            self.polarity
        );
        // panics when the two nodes are not adjacent
        self.edge_index(parent, NodeIndex::Grid(child));

        let depth = match self.nodes.depth_of(parent) {
            Some(depth) => depth + 1,
            None => panic!("parent {parent:?} has no depth"),
        };
        let node = &mut self.nodes[child];
        node.tree = Some(self.polarity);
        node.parent = Some(parent);
        node.orphan = false;
        self.set_depth(child, depth);

        self.refresh_depths_below(child);
    }

    // active nodes are queued again under their new depth
    fn set_depth(&mut self, node: usize, depth: usize) {
        let entry = &mut self.nodes[node];
        if entry.depth == Some(depth) {
            return;
        }
        entry.depth = Some(depth);
        if entry.active {
            self.frontier.push(depth, NodeIndex::Grid(node));
        }
    }

    fn refresh_depths_below(&mut self, root: usize) {
        let grid = self.grid;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let Some(depth) = self.nodes[node].depth.map(|depth| depth + 1) else {
                continue;
            };
            let children: Vec<usize> = grid
                .neighbors(node)
                .filter(|&neighbor| self.nodes[neighbor].parent == Some(NodeIndex::Grid(node)))
                .collect();
            for child in children.into_iter().rev() {
                self.set_depth(child, depth);
                stack.push(child);
            }
        }
    }

    /// Marks `node` active and queues it for growth. Already active nodes
    /// stay queued once.
    pub fn activate(&mut self, node: usize) {
        let entry = &mut self.nodes[node];
        if entry.active {
            return;
        }
        entry.active = true;
        let depth = entry.depth.unwrap_or_default();
        self.frontier.push(depth, NodeIndex::Grid(node));
    }

    /// Queues a node again after it found a bridge, so it resumes growing once
    /// the augmentation is done.
    pub fn requeue(&mut self, node: NodeIndex) {
        if let Some(depth) = self.nodes.depth_of(node) {
            self.frontier.push(depth, node);
        }
    }

    pub fn deactivate(&mut self, node: NodeIndex) {
        if let NodeIndex::Grid(index) = node {
            self.nodes[index].active = false;
        }
    }

    /// Pops the shallowest active node, dropping entries of nodes that have
    /// since become passive, left the tree or moved to another depth.
    pub fn pop_active(&mut self) -> Option<NodeIndex> {
        while let Some((depth, node)) = self.frontier.pop() {
            let valid = match node {
                NodeIndex::Terminal(terminal) => terminal == self.polarity,
                NodeIndex::Grid(index) => {
                    let entry = &self.nodes[index];
                    entry.active && entry.belongs_to(self.polarity) && entry.depth == Some(depth)
                }
            };
            if valid {
                return Some(node);
            }
        }
        None
    }

    /// Edges from `leaf` up to the terminal, leaf first, and the smallest
    /// residual among them. A terminal leaf has an empty path.
    pub fn path_to_root(&self, leaf: NodeIndex) -> (Vec<usize>, Capacity) {
        assert!(
            self.contains(leaf),
            "{leaf:?} is not in the {:?} tree",
            self.polarity
        );
        let mut path = vec![];
        let mut bottleneck = Capacity::MAX;
        let mut node = leaf;
        while let NodeIndex::Grid(index) = node {
            let parent = match self.nodes[index].parent {
                Some(parent) => parent,
                None => panic!("node {index} in the {:?} tree has no parent", self.polarity),
            };
            path.push(self.edge_index(parent, node));
            bottleneck = bottleneck.min(self.residual(parent, node));
            node = parent;
        }
        assert_eq!(self.root(), node, "path from {leaf:?} ends outside its tree");
        (path, bottleneck)
    }

    /// Pushes `flow` along every edge of `path` in this tree's direction. The
    /// child end of each edge that becomes saturated is flagged and added to
    /// `orphans`.
    pub fn push_flow_through_path(&mut self, path: &[usize], flow: Capacity, orphans: &mut Vec<usize>) {
        for &index in path {
            let edge = &self.edges[index];
            let (parent, child) = match (edge.node1(), edge.node2()) {
                (a, NodeIndex::Grid(b)) if self.nodes[b].parent == Some(a) => (a, b),
                (NodeIndex::Grid(a), b) if self.nodes[a].parent == Some(b) => (b, a),
                (a, b) => panic!("edge {index} between {a:?} and {b:?} is not a tree edge"),
            };
            let from = match self.polarity {
                Terminal::Source => parent,
                Terminal::Sink => NodeIndex::Grid(child),
            };

            let edge = &mut self.edges[index];
            edge.add_flow_from_node(from, flow);
            if edge.is_saturated_from_node(from) {
                self.nodes[child].orphan = true;
                orphans.push(child);
            }
        }
    }

    /// Finds a new parent for `orphan`, or frees it when none is left. Children
    /// of freed nodes are adopted in turn, depth-first.
    pub fn adopt(&mut self, orphan: usize) -> AdoptionSummary {
        let mut summary = AdoptionSummary::default();
        let mut stack = vec![orphan];

        while let Some(orphan) = stack.pop() {
            let node = &self.nodes[orphan];
            if !node.orphan || !node.belongs_to(self.polarity) {
                continue;
            }
            match self.find_parent(orphan) {
                Some(parent) => {
                    trace!(orphan, ?parent, "adopted");
                    self.attach_child(orphan, parent);
                    summary.adopted += 1;
                }
                None => {
                    trace!(orphan, "freed");
                    self.free(orphan, &mut stack);
                    summary.freed += 1;
                }
            }
        }
        summary
    }

    /// Shallowest valid parent for `orphan`; the terminal wins whenever its
    /// edge has residual.
    fn find_parent(&self, orphan: usize) -> Option<NodeIndex> {
        let child = NodeIndex::Grid(orphan);
        if self.residual(self.root(), child) > 0 {
            return Some(self.root());
        }

        let mut best: Option<(usize, usize)> = None;
        for candidate in self.grid.neighbors(orphan) {
            let node = &self.nodes[candidate];
            if !node.belongs_to(self.polarity) || node.orphan {
                continue;
            }
            if self.residual(NodeIndex::Grid(candidate), child) == 0 {
                continue;
            }
            if !self.reaches_root(candidate) {
                continue;
            }
            let depth = node.depth.unwrap_or(usize::MAX);
            if best.map_or(true, |(best_depth, _)| depth < best_depth) {
                best = Some((depth, candidate));
            }
        }
        best.map(|(_, candidate)| NodeIndex::Grid(candidate))
    }

    // no orphan may sit between the candidate and the terminal
    fn reaches_root(&self, candidate: usize) -> bool {
        let mut node = NodeIndex::Grid(candidate);
        while let NodeIndex::Grid(index) = node {
            let entry = &self.nodes[index];
            if entry.orphan {
                return false;
            }
            node = match entry.parent {
                Some(parent) => parent,
                None => return false,
            };
        }
        node == self.root()
    }

    fn free(&mut self, orphan: usize, stack: &mut Vec<usize>) {
        let grid = self.grid;
        let freed = NodeIndex::Grid(orphan);
        let mut children = vec![];

        for neighbor in grid.neighbors(orphan) {
            if !self.nodes[neighbor].belongs_to(self.polarity) {
                continue;
            }
            if self.residual(NodeIndex::Grid(neighbor), freed) > 0 {
                self.activate(neighbor);
            }
            if self.nodes[neighbor].parent == Some(freed) {
                self.nodes[neighbor].orphan = true;
                children.push(neighbor);
            }
        }

        self.nodes[orphan].detach();
        stack.extend(children.into_iter().rev());
    }

    /// Scans the candidates reachable from `active` over residual edges.
    /// Free nodes join the tree as active children. Returns the first edge
    /// that reaches the other tree.
    ///
    /// A terminal scans every grid node in index order, resuming where its
    /// last scan stopped at a bridge.
    pub fn grow(&mut self, active: NodeIndex) -> Option<usize> {
        let node_count = self.grid.node_count();
        let candidates: Vec<usize> = match active {
            NodeIndex::Grid(index) => self.grid.neighbors(index).collect(),
            NodeIndex::Terminal(_) => (self.frontier.terminal_scan()..node_count).collect(),
        };

        for candidate in candidates {
            let child = NodeIndex::Grid(candidate);
            if self.residual(active, child) == 0 {
                continue;
            }
            match self.nodes[candidate].tree {
                None => {
                    self.attach_child(candidate, active);
                    self.activate(candidate);
                    trace!(?active, candidate, tree = ?self.polarity, "grew");
                }
                Some(tree) if tree == self.polarity => {}
                Some(_) => {
                    if active.is_terminal() {
                        self.frontier.set_terminal_scan(candidate);
                    }
                    return Some(self.edge_index(active, child));
                }
            }
        }
        if active.is_terminal() {
            self.frontier.set_terminal_scan(node_count);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::cuts::frontier::Frontier;
    use crate::cuts::tree::{AdoptionSummary, Tree};
    use crate::graph::{Capacity, Connectivity, EdgeTable, Grid, NodeIndex, NodeStore, Terminal};

    struct Fixture {
        grid: Grid,
        nodes: NodeStore,
        edges: EdgeTable,
        frontier: Frontier,
    }

    impl Fixture {
        fn new(dimensions: [usize; 3]) -> Self {
            let grid = Grid::new(dimensions, Connectivity::Six).unwrap();
            let nodes = NodeStore::new(grid.node_count());
            let edges = EdgeTable::new(&grid);
            Self {
                grid,
                nodes,
                edges,
                frontier: Frontier::new(),
            }
        }

        fn tree(&mut self, polarity: Terminal) -> Tree<'_> {
            Tree::new(
                polarity,
                &self.grid,
                &mut self.nodes,
                &mut self.edges,
                &mut self.frontier,
            )
        }

        fn set_capacity(&mut self, a: NodeIndex, b: NodeIndex, capacity: Capacity) {
            let index = self.edges.index_for(a, b).unwrap();
            self.edges.set_capacity(index, capacity);
        }
    }

    fn grid(index: usize) -> NodeIndex {
        NodeIndex::Grid(index)
    }

    #[test]
    fn attach_sets_depths() {
        let mut fixture = Fixture::new([5, 1, 1]);
        let mut tree = fixture.tree(Terminal::Source);
        tree.attach_child(0, NodeIndex::SOURCE);
        tree.attach_child(1, grid(0));
        tree.attach_child(2, grid(1));
        tree.attach_child(3, grid(2));

        assert_eq!(Some(1), fixture.nodes[0].depth);
        assert_eq!(Some(2), fixture.nodes[1].depth);
        assert_eq!(Some(4), fixture.nodes[3].depth);
        assert_eq!(Some(grid(2)), fixture.nodes[3].parent);
        assert!(fixture.nodes[3].belongs_to(Terminal::Source));
        assert!(fixture.nodes[4].is_free());
    }

    #[test]
    fn reattaching_cascades_depths() {
        let mut fixture = Fixture::new([5, 1, 1]);
        let mut tree = fixture.tree(Terminal::Sink);
        tree.attach_child(0, NodeIndex::SINK);
        tree.attach_child(1, grid(0));
        tree.attach_child(2, grid(1));
        tree.attach_child(3, grid(2));
        tree.attach_child(2, NodeIndex::SINK);

        let depths: Vec<_> = fixture.nodes.iter().map(|node| node.depth).collect();
        assert_eq!(vec![Some(1), Some(2), Some(1), Some(2), None], depths);
    }

    #[test]
    #[should_panic(expected = "Should always find an edge")]
    fn attach_needs_an_edge() {
        let mut fixture = Fixture::new([5, 1, 1]);
        let mut tree = fixture.tree(Terminal::Source);
        tree.attach_child(0, NodeIndex::SOURCE);
        tree.attach_child(3, grid(0));
    }

    #[test]
    #[should_panic(expected = "to itself")]
    fn attach_to_itself() {
        let mut fixture = Fixture::new([2, 1, 1]);
        let mut tree = fixture.tree(Terminal::Source);
        tree.attach_child(0, NodeIndex::SOURCE);
        tree.attach_child(0, grid(0));
    }

    #[test]
    fn push_saturates_bottleneck() {
        let mut fixture = Fixture::new([3, 1, 1]);
        fixture.set_capacity(NodeIndex::SOURCE, grid(0), 5);
        fixture.set_capacity(grid(0), grid(1), 4);
        fixture.set_capacity(grid(1), grid(2), 3);

        let mut tree = fixture.tree(Terminal::Source);
        tree.attach_child(0, NodeIndex::SOURCE);
        tree.attach_child(1, grid(0));
        tree.attach_child(2, grid(1));

        let (path, bottleneck) = tree.path_to_root(grid(2));
        assert_eq!(3, path.len());
        assert_eq!(3, bottleneck);

        let mut orphans = vec![];
        tree.push_flow_through_path(&path, bottleneck, &mut orphans);
        assert_eq!(vec![2], orphans);
        assert_eq!((vec![], Capacity::MAX), tree.path_to_root(NodeIndex::SOURCE));
        assert_eq!(0, tree.path_to_root(grid(2)).1);
        assert_eq!(1, tree.path_to_root(grid(1)).1);

        assert!(fixture.nodes[2].orphan);
        assert!(!fixture.nodes[1].orphan);
        let saturated: Vec<_> = path
            .iter()
            .filter(|&&index| fixture.edges[index].capacity() == fixture.edges[index].flow())
            .collect();
        assert_eq!(1, saturated.len());
    }

    #[test]
    fn sink_tree_pushes_toward_root() {
        let mut fixture = Fixture::new([2, 1, 1]);
        fixture.set_capacity(grid(1), NodeIndex::SINK, 2);
        fixture.set_capacity(grid(0), grid(1), 6);

        let mut tree = fixture.tree(Terminal::Sink);
        tree.attach_child(1, NodeIndex::SINK);
        tree.attach_child(0, grid(1));

        let (path, bottleneck) = tree.path_to_root(grid(0));
        assert_eq!(2, bottleneck);
        let mut orphans = vec![];
        tree.push_flow_through_path(&path, bottleneck, &mut orphans);
        assert_eq!(vec![1], orphans);

        let index = fixture.edges.index_for(grid(0), grid(1)).unwrap();
        assert_eq!(2, fixture.edges[index].flow_from_node(grid(0)));
    }

    // 3x2 grid, indices:
    // 0 1 2
    // 3 4 5
    fn branching_source_tree() -> Fixture {
        let mut fixture = Fixture::new([3, 2, 1]);
        for (a, b) in [(0, 1), (0, 3), (3, 4), (1, 4), (4, 1), (1, 2), (4, 5), (2, 5)] {
            fixture.set_capacity(grid(a), grid(b), 1);
        }
        fixture.set_capacity(NodeIndex::SOURCE, grid(0), 1);

        let mut tree = fixture.tree(Terminal::Source);
        tree.attach_child(0, NodeIndex::SOURCE);
        tree.attach_child(1, grid(0));
        tree.attach_child(3, grid(0));
        tree.attach_child(4, grid(3));
        tree.attach_child(2, grid(1));
        fixture
    }

    #[test]
    fn orphan_finds_new_parent() {
        let mut fixture = branching_source_tree();
        let index = fixture.edges.index_for(grid(0), grid(1)).unwrap();
        fixture.edges[index].add_flow_from_node(grid(0), 1);
        fixture.nodes[1].orphan = true;

        let summary = fixture.tree(Terminal::Source).adopt(1);
        assert_eq!(AdoptionSummary { adopted: 1, freed: 0 }, summary);
        assert_eq!(Some(grid(4)), fixture.nodes[1].parent);
        assert_eq!(Some(4), fixture.nodes[1].depth);
        assert_eq!(Some(5), fixture.nodes[2].depth);
        assert!(!fixture.nodes[1].orphan);
    }

    #[test]
    fn orphan_skips_its_descendants() {
        let mut fixture = branching_source_tree();
        // hang 4 below 1 so the only residual neighbor of 1 is its own child
        fixture.tree(Terminal::Source).attach_child(4, grid(1));
        let index = fixture.edges.index_for(grid(0), grid(1)).unwrap();
        fixture.edges[index].add_flow_from_node(grid(0), 1);
        fixture.nodes[1].orphan = true;

        let summary = fixture.tree(Terminal::Source).adopt(1);
        assert!(fixture.nodes[1].is_free());
        assert_eq!(None, fixture.nodes[1].depth);
        // 2 has no other parent, 4 falls back to 3
        assert!(fixture.nodes[2].is_free());
        assert_eq!(Some(grid(3)), fixture.nodes[4].parent);
        assert_eq!(Some(3), fixture.nodes[4].depth);
        assert_eq!(AdoptionSummary { adopted: 1, freed: 2 }, summary);
    }

    #[test]
    fn freeing_reactivates_neighbors() {
        let mut fixture = Fixture::new([4, 1, 1]);
        fixture.set_capacity(NodeIndex::SOURCE, grid(0), 1);
        fixture.set_capacity(NodeIndex::SOURCE, grid(3), 1);
        fixture.set_capacity(grid(1), grid(2), 1);
        fixture.set_capacity(grid(2), grid(3), 1);

        let mut tree = fixture.tree(Terminal::Source);
        tree.attach_child(0, NodeIndex::SOURCE);
        tree.attach_child(1, grid(0));
        tree.attach_child(3, NodeIndex::SOURCE);
        tree.attach_child(2, grid(3));
        // 2 hangs below another pending orphan, so it cannot adopt 1 but may regrow it
        fixture.nodes[1].orphan = true;
        fixture.nodes[3].orphan = true;

        let summary = fixture.tree(Terminal::Source).adopt(1);
        assert_eq!(AdoptionSummary { adopted: 0, freed: 1 }, summary);
        assert!(fixture.nodes[1].is_free());
        assert!(fixture.nodes[2].active);
        assert!(!fixture.nodes[0].active);
        assert_eq!(Some(grid(2)), fixture.tree(Terminal::Source).pop_active());
    }

    #[test]
    fn terminal_grows_every_reachable_node() {
        let mut fixture = Fixture::new([4, 1, 1]);
        fixture.set_capacity(NodeIndex::SOURCE, grid(0), 2);
        fixture.set_capacity(NodeIndex::SOURCE, grid(2), 2);
        fixture.set_capacity(NodeIndex::SOURCE, grid(3), 2);
        fixture.set_capacity(grid(3), NodeIndex::SINK, 2);

        fixture.tree(Terminal::Sink).attach_child(3, NodeIndex::SINK);
        let mut tree = fixture.tree(Terminal::Source);
        let bridge = tree.grow(NodeIndex::SOURCE);

        assert_eq!(fixture.edges.index_for(NodeIndex::SOURCE, grid(3)), bridge);
        assert_eq!(3, fixture.frontier.terminal_scan());
        assert!(fixture.nodes[0].belongs_to(Terminal::Source));
        assert!(fixture.nodes[1].is_free());
        assert!(fixture.nodes[2].belongs_to(Terminal::Source));
        assert!(fixture.nodes[2].active);
    }

    #[test]
    fn stale_entries_are_skipped() {
        let mut fixture = Fixture::new([3, 1, 1]);
        let mut tree = fixture.tree(Terminal::Source);
        tree.attach_child(0, NodeIndex::SOURCE);
        tree.attach_child(1, grid(0));
        tree.attach_child(2, grid(1));
        tree.activate(2);
        tree.activate(1);
        tree.activate(0);
        tree.deactivate(grid(0));

        assert_eq!(Some(grid(1)), tree.pop_active());
        assert_eq!(Some(grid(2)), tree.pop_active());
        assert_eq!(None, tree.pop_active());
    }

    #[test]
    fn moved_nodes_pop_at_their_new_depth() {
        let mut fixture = Fixture::new([5, 1, 1]);
        let mut tree = fixture.tree(Terminal::Source);
        tree.attach_child(0, NodeIndex::SOURCE);
        tree.attach_child(1, grid(0));
        tree.attach_child(2, grid(1));
        tree.attach_child(3, grid(2));
        tree.attach_child(4, grid(3));
        tree.activate(1);
        tree.activate(2);
        tree.activate(4);

        // 3 moves up to depth 1, taking 4 from depth 5 to depth 2
        tree.attach_child(3, NodeIndex::SOURCE);
        tree.activate(3);
        let order: Vec<_> = std::iter::from_fn(|| tree.pop_active()).collect();
        assert_eq!(vec![grid(3), grid(1), grid(4), grid(2)], order);
        assert_eq!(Some(2), fixture.nodes[4].depth);
    }

    #[test]
    fn deepened_nodes_wait_for_shallower_ones() {
        let mut fixture = Fixture::new([5, 1, 1]);
        let mut tree = fixture.tree(Terminal::Sink);
        tree.attach_child(1, NodeIndex::SINK);
        tree.attach_child(4, NodeIndex::SINK);
        tree.attach_child(3, grid(4));
        tree.attach_child(2, grid(3));
        tree.activate(1);
        tree.activate(3);
        tree.activate(2);

        // 1 drops from depth 1 to depth 4 below 2
        tree.attach_child(1, grid(2));
        let order: Vec<_> = std::iter::from_fn(|| tree.pop_active()).collect();
        assert_eq!(vec![grid(3), grid(2), grid(1)], order);
        assert_eq!(Some(4), fixture.nodes[1].depth);
    }
}
