use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxel_graph_cut::{Connectivity, GraphCut, GraphCutConfig, Label, LabelVolume, Seeds, Volume};

const DEFAULT_DIMENSIONS: [i64; 3] = [24, 24, 12];

/// Segments a synthetic volume holding a bright blob and prints the labels.
#[derive(Parser, Debug)]
#[command(
    name = "voxel-graph-cut",
    version,
    about = "Graph-cut segmentation of a synthetic voxel volume",
    long_about = None
)]
struct Args {
    /// JSON configuration file. Flags below override its values.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Volume size along x, y and z.
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    dims: Option<Vec<i64>>,

    /// Neighborhood: six, eighteen or twentysix.
    #[arg(long)]
    connectivity: Option<Connectivity>,

    /// Stop after this many augmenting paths.
    #[arg(long)]
    max_augmentations: Option<usize>,

    /// Seed for the synthetic volume's noise.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> anyhow::Result<GraphCutConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => GraphCutConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GraphCutConfig::new(DEFAULT_DIMENSIONS, Connectivity::Six),
    };
    if let Some(dims) = &args.dims {
        match dims[..] {
            [x, y, z] => config.dimensions = [x, y, z],
            _ => bail!("--dims takes exactly three values"),
        }
    }
    if let Some(connectivity) = args.connectivity {
        config.connectivity = connectivity;
    }
    if args.max_augmentations.is_some() {
        config.solver.max_augmentations = args.max_augmentations;
    }
    Ok(config)
}

/// A dark noisy volume with a bright ellipsoid in the middle.
fn synthetic_volume(dimensions: [usize; 3], rng: &mut StdRng) -> anyhow::Result<Volume> {
    let center = dimensions.map(|d| (d as f64 - 1.0) / 2.0);
    let radii = dimensions.map(|d| (d as f64 / 3.0).max(0.5));
    let volume = Volume::from_fn(dimensions, |coordinate| {
        let distance: f64 = (0..3)
            .map(|axis| ((coordinate[axis] as f64 - center[axis]) / radii[axis]).powi(2))
            .sum();
        let base = if distance <= 1.0 { 180.0 } else { 60.0 };
        base + rng.gen_range(-15.0..15.0)
    })?;
    Ok(volume)
}

fn print_slices(labels: &LabelVolume) {
    let [width, height, depth] = labels.dimensions();
    for z in 0..depth {
        println!("z = {z}");
        for y in 0..height {
            let row: String = (0..width)
                .map(|x| match labels.label_at([x, y, z]) {
                    Label::Foreground => '#',
                    Label::Background => '.',
                    Label::Unlabelled => '?',
                })
                .collect();
            println!("  {row}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = load_config(&args)?;
    let grid = config.validate().context("invalid configuration")?;
    let dimensions = grid.dimensions();
    info!(?dimensions, connectivity = %config.connectivity, "building synthetic volume");

    let mut rng = StdRng::seed_from_u64(args.seed);
    let volume = synthetic_volume(dimensions, &mut rng)?;
    let center = dimensions.map(|d| d / 2);
    let seeds = Seeds::new(vec![center], vec![[0, 0, 0]]);

    let mut graph_cut = GraphCut::with_config(&config);
    graph_cut.set_input(volume);
    graph_cut.set_seeds(seeds);
    print_slices(graph_cut.update()?);

    if let Some(stats) = graph_cut.stats() {
        println!(
            "flow {} after {} augmentations ({} orphans adopted, {} freed){}",
            stats.total_flow,
            stats.augmentations,
            stats.orphans_adopted,
            stats.orphans_freed,
            if stats.interrupted { ", interrupted" } else { "" }
        );
    }
    if let Some(cut) = graph_cut.cut() {
        println!(
            "cut: {} edges, capacity {}, {} foreground voxels",
            cut.size(),
            cut.capacity,
            cut.source_set.len()
        );
    }
    Ok(())
}
