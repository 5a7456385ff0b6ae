// Entry point for transaction fraud screening. Loads transactions, builds windowed
// customer features, clusters them and writes the minority cluster out as suspicious.
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Args;
use features::FEATURE_NAMES;
use kmeans::ClusterProfile;
use pipeline::{run, PipelineReport};

mod cli;
mod csv_reader;
mod error;
mod features;
mod kmeans;
mod pipeline;
mod suspicious;
mod temporal;
mod window;

// RUST_LOG wins over the --log-level default
fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// Prints one cluster's size, customer spread and average features
fn print_cluster_profile(profile: &ClusterProfile) {
    let role = if profile.anomalous { "anomalous" } else { "normal" };
    println!("\nCluster {} ({})", profile.label, role);
    println!("Size: {} transactions", profile.size);
    println!("Unique Customers: {}", profile.unique_customers);

    println!("\nFeature Analysis:");
    for (name, value) in FEATURE_NAMES.iter().zip(profile.avg_features) {
        println!("Avg {}: {:.4}", name, value);
    }
}

fn print_report(report: &PipelineReport) {
    println!("Fraud Screening Results:");
    for profile in &report.profiles {
        print_cluster_profile(profile);
    }

    println!("\nOverall:");
    println!("Transactions Read: {}", report.records_read);
    if report.records_dropped > 0 {
        println!("Dropped as Invalid: {}", report.records_dropped);
    }
    println!("Customers: {}", report.customers);
    println!("Suspicious: {}", report.suspicious);
    println!("Suspicious transactions saved to {}", report.output.display());
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_json);

    let config = args.pipeline_config();
    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        seed = config.cluster.seed,
        window = config.window,
        workers = config.workers,
        standardize = config.cluster.standardize,
        "starting fraud screening"
    );

    let report = run(&config)
        .with_context(|| format!("screening {} failed", config.input.display()))?;

    info!(
        suspicious = report.suspicious,
        anomalous_cluster = report.anomalous_cluster,
        sizes = ?report.cluster_sizes,
        "screening complete"
    );
    print_report(&report);

    Ok(())
}
