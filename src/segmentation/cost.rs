use tracing::{debug, warn};

use crate::graph::{Capacity, Edge, Terminal};
use crate::segmentation::seeds::Seeds;
use crate::segmentation::volume::Volume;

pub const MIN_CAPACITY: Capacity = 1;
pub const MAX_CAPACITY: Capacity = 256;

/// Turns a normalized cost in [0, 1] into an integer capacity in
/// `MIN_CAPACITY..=MAX_CAPACITY`. Out-of-range costs are clamped first.
pub fn scale_cost(cost: f64) -> Capacity {
    if cost.is_nan() {
        return MIN_CAPACITY;
    }
    (255.0 * cost.clamp(0.0, 1.0)).floor() as Capacity + 1
}

/// Assigns edge capacities for a segmentation run.
pub trait CostFunction {
    /// Called once per run, before any capacity is requested.
    fn prepare(&mut self, volume: &Volume, seeds: &Seeds);

    fn capacity(&self, volume: &Volume, edge: &Edge) -> Capacity;
}

/// Intensity statistics of a volume and its seeds, all on intensities
/// normalized to [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntensityStatistics {
    pub minimum: f64,
    pub maximum: f64,
    pub mean: f64,
    pub deviation: f64,
    pub foreground_mean: f64,
    pub foreground_deviation: f64,
    pub background_mean: f64,
    pub background_deviation: f64,
}

fn mean_and_deviation(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    (mean, variance.sqrt())
}

impl IntensityStatistics {
    pub fn compute(volume: &Volume, seeds: &Seeds) -> Self {
        let intensities = volume.intensities();
        let minimum = intensities.iter().copied().fold(f64::INFINITY, f64::min);
        let maximum = intensities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = maximum - minimum;
        let normalize = |value: f64| if range > 0.0 { (value - minimum) / range } else { 0.0 };

        let normalized: Vec<f64> = intensities.iter().map(|&v| normalize(v)).collect();
        let (mean, deviation) = mean_and_deviation(&normalized);

        let seed_statistics = |terminal: Terminal| {
            let values: Vec<f64> = seeds
                .points(terminal)
                .iter()
                .map(|&seed| normalize(volume.intensity_at(seed)))
                .collect();
            let (seed_mean, seed_deviation) = mean_and_deviation(&values);
            // too few distinct seeds to estimate a spread
            if seed_deviation > f64::EPSILON {
                (seed_mean, seed_deviation)
            } else {
                (seed_mean, deviation)
            }
        };
        let (foreground_mean, foreground_deviation) = seed_statistics(Terminal::Source);
        let (background_mean, background_deviation) = seed_statistics(Terminal::Sink);

        Self {
            minimum,
            maximum,
            mean,
            deviation,
            foreground_mean,
            foreground_deviation,
            background_mean,
            background_deviation,
        }
    }

    pub fn has_contrast(&self) -> bool {
        self.maximum > self.minimum
    }

    pub fn normalize(&self, intensity: f64) -> f64 {
        if self.has_contrast() {
            (intensity - self.minimum) / (self.maximum - self.minimum)
        } else {
            0.0
        }
    }
}

/// Region and boundary terms from intensities.
///
/// A voxel's SOURCE edge grows with its distance from the background seeds'
/// mean and its SINK edge with its distance from the foreground mean, both in
/// units of the seeds' deviation. Grid edges fall off as a Gaussian of the
/// intensity difference.
#[derive(Clone, Debug, Default)]
pub struct IntensityCostFunction {
    statistics: Option<IntensityStatistics>,
}

impl IntensityCostFunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statistics(&self) -> Option<&IntensityStatistics> {
        self.statistics.as_ref()
    }

    fn terminal_cost(statistics: &IntensityStatistics, intensity: f64, terminal: Terminal) -> f64 {
        let (mean, deviation) = match terminal {
            Terminal::Source => (statistics.background_mean, statistics.background_deviation),
            Terminal::Sink => (statistics.foreground_mean, statistics.foreground_deviation),
        };
        (intensity - mean).abs() / deviation.max(f64::EPSILON)
    }

    fn boundary_cost(statistics: &IntensityStatistics, intensity1: f64, intensity2: f64) -> f64 {
        let deviation = statistics.deviation.max(f64::EPSILON);
        (-(intensity1 - intensity2).powi(2) / (2.0 * deviation.powi(2))).exp()
    }
}

impl CostFunction for IntensityCostFunction {
    fn prepare(&mut self, volume: &Volume, seeds: &Seeds) {
        let statistics = IntensityStatistics::compute(volume, seeds);
        if statistics.has_contrast() {
            debug!(?statistics, "intensity statistics");
        } else {
            warn!(
                intensity = statistics.minimum,
                "volume has uniform intensity, every edge gets the minimum capacity"
            );
        }
        self.statistics = Some(statistics);
    }

    fn capacity(&self, volume: &Volume, edge: &Edge) -> Capacity {
        let statistics = match &self.statistics {
            Some(statistics) if statistics.has_contrast() => statistics,
            _ => return MIN_CAPACITY,
        };
        let intensity = |node: usize| statistics.normalize(volume.intensity(node));

        let cost = match (edge.terminal(), edge.grid_node()) {
            (Some(terminal), Some(node)) => Self::terminal_cost(statistics, intensity(node), terminal),
            _ => {
                let (node1, node2) = match (edge.node1().grid(), edge.node2().grid()) {
                    (Some(node1), Some(node2)) => (node1, node2),
                    _ => panic!("grid edge {edge:?} has a terminal endpoint"),
                };
                Self::boundary_cost(statistics, intensity(node1), intensity(node2))
            }
        };
        scale_cost(cost)
    }
}
