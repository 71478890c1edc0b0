//! Application options

use crate::pbrt::Float;
use clap::Parser;
use std::sync::OnceLock;

/// Return the global application options parsed from the command line.
pub fn options() -> &'static Options {
    static DATA: OnceLock<Options> = OnceLock::new();
    DATA.get_or_init(Options::parse)
}

/// System wide options.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Builds acceleration structures for procedural scenes.", long_about = None)]
pub struct Options {
    /// Procedural scene to build.
    #[arg(
        long,
        value_name = "NAME",
        default_value = "cube",
        help = "Scene to generate: cube, random or grid."
    )]
    pub scene: String,

    /// Triangle count for generated scenes.
    #[arg(
        long,
        short = 'n',
        value_name = "NUM",
        default_value_t = 1024,
        help = "Number of triangles for the random and grid scenes."
    )]
    pub triangles: usize,

    /// Light count.
    #[arg(long, value_name = "NUM", default_value_t = 64, help = "Number of lights to generate.")]
    pub lights: usize,

    /// BVH construction method.
    #[arg(
        long = "split-method",
        value_name = "METHOD",
        default_value = "sah",
        help = "BVH construction method: sah or lbvh."
    )]
    pub split_method: String,

    /// Light structure.
    #[arg(
        long = "light-structure",
        value_name = "KIND",
        default_value = "tree",
        help = "Light sampling structure: tree or array."
    )]
    pub light_structure: String,

    /// Light tree bin count.
    #[arg(long, value_name = "NUM", default_value_t = 16, help = "Number of bins for the light tree.")]
    pub bins: usize,

    /// Light tree traversal cost.
    #[arg(
        long = "traversal-cost",
        value_name = "FLOAT",
        default_value_t = 1.0,
        help = "Relative traversal cost used by the light tree split heuristic."
    )]
    pub traversal_cost: Float,

    /// Seed for procedural generation.
    #[arg(long, value_name = "NUM", default_value_t = 0, help = "Random seed.")]
    pub seed: u64,

    /// Simulated device memory.
    #[arg(
        long = "queue-capacity",
        value_name = "BYTES",
        help = "Limit the host queue to the given number of bytes."
    )]
    pub queue_capacity: Option<usize>,

    /// Suppress all text output other than error messages.
    #[arg(long, help = "Suppress all text output other than error messages.")]
    pub quiet: bool,

    /// Print statistics.
    #[arg(long, help = "Print build statistics.")]
    pub stats: bool,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
