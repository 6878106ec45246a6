use tracing::{info, instrument, warn};

use crate::config::{GraphCutConfig, SolverConfig};
use crate::cuts::{Cut, SolveStats, Solver};
use crate::error::{GraphCutError, Result};
use crate::graph::{Capacity, Connectivity, Edge, EdgeTable, Grid, NodeIndex, Terminal};
use crate::segmentation::cost::{CostFunction, IntensityCostFunction};
use crate::segmentation::seeds::Seeds;
use crate::segmentation::volume::{Label, LabelVolume, Volume};

/// Capacity that ties a seed to its terminal strongly enough that no cut can
/// separate them: more than all grid edges around one voxel together, given
/// the heaviest grid edge in the graph.
pub fn seed_capacity(connectivity: Connectivity, heaviest: Capacity) -> Capacity {
    heaviest
        .max(0)
        .saturating_mul(connectivity.neighbor_count() as Capacity)
        .saturating_add(1)
}

/// Segments a volume into foreground and background from seed points.
///
/// Inputs are set one by one; [`GraphCut::update`] checks that everything is
/// in place and runs the cut. The grid and its edge table are kept between
/// runs as long as the volume dimensions and connectivity stay the same.
#[derive(Default)]
pub struct GraphCut {
    connectivity: Connectivity,
    solver: SolverConfig,
    input: Option<Volume>,
    seeds: Option<Seeds>,
    cost_function: Option<Box<dyn CostFunction>>,
    topology: Option<(Grid, EdgeTable)>,
    output: Option<LabelVolume>,
    stats: Option<SolveStats>,
    cut: Option<Cut>,
}

impl GraphCut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes connectivity and solver settings from `config`. Its dimensions
    /// are ignored; the input volume decides them.
    pub fn with_config(config: &GraphCutConfig) -> Self {
        Self {
            connectivity: config.connectivity,
            solver: config.solver.clone(),
            ..Self::default()
        }
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        self.connectivity = connectivity;
    }

    pub fn set_solver_config(&mut self, solver: SolverConfig) {
        self.solver = solver;
    }

    pub fn input(&self) -> Option<&Volume> {
        self.input.as_ref()
    }

    pub fn set_input(&mut self, volume: Volume) {
        self.input = Some(volume);
    }

    pub fn seeds(&self) -> Option<&Seeds> {
        self.seeds.as_ref()
    }

    pub fn set_seeds(&mut self, seeds: Seeds) {
        self.seeds = Some(seeds);
    }

    pub fn has_cost_function(&self) -> bool {
        self.cost_function.is_some()
    }

    /// Replaces the capacity model. Without one, [`IntensityCostFunction`] is used.
    pub fn set_cost_function(&mut self, cost_function: impl CostFunction + 'static) {
        self.cost_function = Some(Box::new(cost_function));
    }

    /// Drops every input, setting and cached result.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn output(&self) -> Option<&LabelVolume> {
        self.output.as_ref()
    }

    pub fn stats(&self) -> Option<SolveStats> {
        self.stats
    }

    pub fn cut(&self) -> Option<&Cut> {
        self.cut.as_ref()
    }

    /// Runs the segmentation and returns the labels. Fails without touching
    /// the previous result when an input is missing or invalid.
    #[instrument(skip(self), fields(connectivity = %self.connectivity))]
    pub fn update(&mut self) -> Result<&LabelVolume> {
        let (grid, volume, seeds) =
            match ready_inputs(self.input.as_ref(), self.seeds.as_ref(), self.connectivity) {
                Ok(inputs) => inputs,
                Err(error) => {
                    warn!(%error, "skipping update");
                    return Err(error);
                }
            };

        let mut edges = match self.topology.take() {
            Some((cached, mut edges)) if cached == grid => {
                edges.reset_flows();
                edges
            }
            _ => EdgeTable::new(&grid),
        };

        let cost_function = self
            .cost_function
            .get_or_insert_with(|| Box::new(IntensityCostFunction::new()) as Box<dyn CostFunction>);
        cost_function.prepare(volume, seeds);

        let mut seeded = vec![None; grid.node_count()];
        for terminal in [Terminal::Source, Terminal::Sink] {
            for index in seeds.indices(&grid, terminal) {
                seeded[index] = Some(terminal);
            }
        }
        // seed terminal edges are set last, once the grid edges are known
        edges.assign_capacities(|edge| {
            let seed = edge.grid_node().and_then(|node| seeded[node]);
            match (edge.terminal(), seed) {
                (Some(_), Some(_)) => 0,
                _ => cost_function.capacity(volume, edge),
            }
        });
        let heaviest = edges
            .iter()
            .filter(|edge| edge.terminal().is_none())
            .map(Edge::capacity)
            .max()
            .unwrap_or_default();
        let hard = seed_capacity(grid.connectivity(), heaviest);
        for (index, terminal) in seeded.iter().enumerate() {
            if let Some(terminal) = *terminal {
                let Some(edge) = edges.index_for(NodeIndex::Terminal(terminal), NodeIndex::Grid(index)) else {
                    panic!("Should always find an edge between {terminal:?} and seed {index}");
                };
                edges.set_capacity(edge, hard);
            }
        }

        let dimensions = grid.dimensions();
        let mut solver = Solver::new(grid, edges)?.with_config(self.solver.clone());
        for (index, terminal) in seeded.iter().enumerate() {
            if let Some(terminal) = *terminal {
                solver.attach_seed(index, terminal);
            }
        }
        let stats = solver.solve();

        let labels: Vec<Label> = (0..seeded.len())
            .map(|index| Label::from(solver.label(index)))
            .collect();
        let output = LabelVolume::new(dimensions, labels);
        self.cut = Some(Cut::from_residual(solver.edges()));
        self.topology = Some(solver.into_topology());
        self.stats = Some(stats);
        info!(
            foreground = output.count(Label::Foreground),
            background = output.count(Label::Background),
            unlabelled = output.count(Label::Unlabelled),
            flow = stats.total_flow,
            "segmentation updated"
        );
        let output: &LabelVolume = self.output.insert(output);
        Ok(output)
    }
}

fn ready_inputs<'a>(
    input: Option<&'a Volume>,
    seeds: Option<&'a Seeds>,
    connectivity: Connectivity,
) -> Result<(Grid, &'a Volume, &'a Seeds)> {
    let volume = input.ok_or(GraphCutError::MissingInput)?;
    let config = GraphCutConfig {
        dimensions: volume.dimensions().map(|d| d as i64),
        connectivity,
        solver: SolverConfig::default(),
    };
    let grid = config.validate()?;
    let seeds = seeds.ok_or(GraphCutError::MissingSeeds {
        foreground: 0,
        background: 0,
    })?;
    seeds.validate(&grid)?;
    Ok((grid, volume, seeds))
}
