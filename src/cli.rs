use std::path::PathBuf;

use clap::Parser;

use crate::csv_reader::ValidationMode;
use crate::kmeans::{ClusterParams, DEFAULT_MAX_ITERATIONS, DEFAULT_SEED, DEFAULT_TOLERANCE};
use crate::pipeline::{default_workers, PipelineConfig, DEFAULT_INPUT, DEFAULT_OUTPUT};
use crate::window::DEFAULT_PRECEDING;

#[derive(Parser, Debug)]
#[command(name = "fraud-clustering")]
#[command(version)]
#[command(about = "Flag suspicious transactions by clustering windowed customer features", long_about = None)]
pub struct Args {
    /// Transactions CSV to read
    #[arg(default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Where to write suspicious transactions (overwritten)
    #[arg(default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Seed for centroid initialization
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Earlier same-customer transactions included in each window
    #[arg(long, default_value_t = DEFAULT_PRECEDING)]
    pub window: usize,

    /// Upper bound on k-means iterations
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_iterations: u64,

    /// Centroid shift at which k-means stops early
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Z-score features before clustering
    #[arg(long)]
    pub standardize: bool,

    /// Drop invalid records with a warning instead of aborting
    #[arg(long)]
    pub lenient: bool,

    /// Threads used for per-customer aggregation
    #[arg(long)]
    pub workers: Option<usize>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            window: self.window,
            workers: self.workers.unwrap_or_else(default_workers),
            validation: if self.lenient {
                ValidationMode::Lenient
            } else {
                ValidationMode::Strict
            },
            cluster: ClusterParams {
                seed: self.seed,
                max_iterations: self.max_iterations,
                tolerance: self.tolerance,
                standardize: self.standardize,
            },
        }
    }
}
