use std::mem;

use tracing::{debug, info, instrument, warn};

use crate::config::SolverConfig;
use crate::cuts::frontier::Frontier;
use crate::cuts::tree::Tree;
use crate::error::{GraphCutError, Result};
use crate::graph::{Capacity, EdgeTable, Grid, NodeIndex, NodeStore, Terminal};

/// What happened during a solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub augmentations: usize,
    pub total_flow: Capacity,
    pub orphans_adopted: usize,
    pub orphans_freed: usize,
    /// The augmentation cap was hit before the flow was maximal.
    pub interrupted: bool,
}

/// Result of one growth step of a single tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowOutcome {
    /// An edge joining the two trees.
    Bridge(usize),
    /// An active node was scanned without reaching the other tree.
    Grew,
    /// The tree has no active nodes left.
    Exhausted,
}

/// Two-tree incremental max-flow over a grid graph.
///
/// The solver owns the node state and the edge table for the duration of a
/// run. Capacities must be assigned before it is built; seeds may be attached
/// before [`Solver::solve`] is called.
#[derive(Debug)]
pub struct Solver {
    grid: Grid,
    nodes: NodeStore,
    edges: EdgeTable,
    source_frontier: Frontier,
    sink_frontier: Frontier,
    orphans: Vec<usize>,
    config: SolverConfig,
    stats: SolveStats,
}

impl Solver {
    pub fn new(grid: Grid, edges: EdgeTable) -> Result<Self> {
        if edges.node_count() != grid.node_count() {
            return Err(GraphCutError::TopologyMismatch {
                grid: grid.node_count(),
                edges: edges.node_count(),
            });
        }
        if !edges.capacities_assigned() {
            return Err(GraphCutError::CapacitiesNotAssigned);
        }

        let nodes = NodeStore::new(grid.node_count());
        Ok(Self {
            grid,
            nodes,
            edges,
            source_frontier: Frontier::new(),
            sink_frontier: Frontier::new(),
            orphans: vec![],
            config: SolverConfig::default(),
            stats: SolveStats::default(),
        })
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    /// Gives the graph back for reuse with new capacities.
    pub fn into_topology(self) -> (Grid, EdgeTable) {
        (self.grid, self.edges)
    }

    fn tree(&mut self, polarity: Terminal) -> Tree<'_> {
        let frontier = match polarity {
            Terminal::Source => &mut self.source_frontier,
            Terminal::Sink => &mut self.sink_frontier,
        };
        Tree::new(polarity, &self.grid, &mut self.nodes, &mut self.edges, frontier)
    }

    /// Hangs `node` directly below `terminal` as an active node.
    pub fn attach_seed(&mut self, node: usize, terminal: Terminal) {
        let mut tree = self.tree(terminal);
        tree.attach_child(node, NodeIndex::Terminal(terminal));
        tree.activate(node);
    }

    /// Queues an attached node for re-adoption before the next growth step.
    pub fn mark_orphan(&mut self, node: usize) {
        assert!(
            !self.nodes[node].is_free(),
            "free node {node} cannot become an orphan"
        );
        self.nodes[node].orphan = true;
        self.orphans.push(node);
    }

    /// Tree each grid node ended up in. `None` for nodes neither tree reached.
    pub fn label(&self, node: usize) -> Option<Terminal> {
        self.nodes[node].tree
    }

    /// Flow currently leaving SOURCE.
    pub fn total_flow(&self) -> Capacity {
        self.edges
            .iter()
            .filter(|edge| edge.node1() == NodeIndex::SOURCE)
            .map(|edge| edge.flow_from_node(NodeIndex::SOURCE))
            .sum()
    }

    /// Runs grow, augment and adopt until neither tree can grow.
    #[instrument(
        skip(self),
        fields(dimensions = ?self.grid.dimensions(), connectivity = %self.grid.connectivity())
    )]
    pub fn solve(&mut self) -> SolveStats {
        self.stats = SolveStats::default();
        self.seed_frontiers();
        info!(nodes = self.grid.node_count(), edges = self.edges.len(), "starting max-flow");

        self.adopt_orphans();
        let mut polarity = Terminal::Source;
        let mut exhausted = 0;
        while exhausted < 2 {
            if self.limit_reached() {
                warn!(
                    augmentations = self.stats.augmentations,
                    "augmentation limit reached, stopping early"
                );
                self.stats.interrupted = true;
                break;
            }
            match self.grow(polarity) {
                GrowOutcome::Bridge(bridge) => {
                    exhausted = 0;
                    self.augment(bridge);
                    self.adopt_orphans();
                }
                GrowOutcome::Grew => exhausted = 0,
                GrowOutcome::Exhausted => exhausted += 1,
            }
            polarity = polarity.opposite();
        }

        self.stats.total_flow = self.total_flow();
        info!(
            augmentations = self.stats.augmentations,
            total_flow = self.stats.total_flow,
            adopted = self.stats.orphans_adopted,
            freed = self.stats.orphans_freed,
            "max-flow finished"
        );
        self.stats
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_augmentations
            .map_or(false, |limit| self.stats.augmentations >= limit)
    }

    // both terminals scan the whole grid first, then every node already
    // attached and active resumes growing
    fn seed_frontiers(&mut self) {
        self.source_frontier.clear();
        self.sink_frontier.clear();
        self.source_frontier.push(0, NodeIndex::SOURCE);
        self.sink_frontier.push(0, NodeIndex::SINK);

        for (index, node) in self.nodes.iter().enumerate() {
            let frontier = match node.tree {
                Some(_) if !node.active => continue,
                Some(Terminal::Source) => &mut self.source_frontier,
                Some(Terminal::Sink) => &mut self.sink_frontier,
                None => continue,
            };
            frontier.push(node.depth.unwrap_or_default(), NodeIndex::Grid(index));
        }
    }

    /// Scans the shallowest active node of one tree.
    pub fn grow(&mut self, polarity: Terminal) -> GrowOutcome {
        let mut tree = self.tree(polarity);
        let Some(active) = tree.pop_active() else {
            return GrowOutcome::Exhausted;
        };
        match tree.grow(active) {
            Some(bridge) => {
                tree.requeue(active);
                GrowOutcome::Bridge(bridge)
            }
            None => {
                tree.deactivate(active);
                GrowOutcome::Grew
            }
        }
    }

    /// Pushes the largest possible flow along the path through `bridge` and
    /// collects the nodes cut off by saturated tree edges.
    fn augment(&mut self, bridge: usize) -> Capacity {
        let edge = &self.edges[bridge];
        let (source_side, sink_side) = match (
            self.nodes.tree_of(edge.node1()),
            self.nodes.tree_of(edge.node2()),
        ) {
            (Some(Terminal::Source), Some(Terminal::Sink)) => (edge.node1(), edge.node2()),
            (Some(Terminal::Sink), Some(Terminal::Source)) => (edge.node2(), edge.node1()),
            trees => panic!("bridge {bridge} does not join the two trees: {trees:?}"),
        };
        let bridge_residual = edge.capacity_from_node(source_side);

        let (source_path, source_bottleneck) = self.tree(Terminal::Source).path_to_root(source_side);
        let (sink_path, sink_bottleneck) = self.tree(Terminal::Sink).path_to_root(sink_side);
        let flow = bridge_residual.min(source_bottleneck).min(sink_bottleneck);

        self.edges[bridge].add_flow_from_node(source_side, flow);
        let mut orphans = mem::take(&mut self.orphans);
        self.tree(Terminal::Source)
            .push_flow_through_path(&source_path, flow, &mut orphans);
        self.tree(Terminal::Sink)
            .push_flow_through_path(&sink_path, flow, &mut orphans);
        self.orphans = orphans;

        self.stats.augmentations += 1;
        debug!(
            bridge,
            flow,
            path = source_path.len() + sink_path.len() + 1,
            orphans = self.orphans.len(),
            "augmented"
        );
        flow
    }

    fn adopt_orphans(&mut self) {
        for orphan in mem::take(&mut self.orphans) {
            let Some(polarity) = self.nodes[orphan].tree else {
                continue;
            };
            let summary = self.tree(polarity).adopt(orphan);
            self.stats.orphans_adopted += summary.adopted;
            self.stats.orphans_freed += summary.freed;
        }
    }
}
