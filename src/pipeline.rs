// Batch orchestration: ingest -> window -> cluster -> filter -> write.
use std::path::PathBuf;
use std::thread;

use tracing::info;

use crate::csv_reader::{read_transactions, ValidationMode};
use crate::error::Result;
use crate::kmeans::{classify, profile_clusters, ClusterParams, ClusterProfile, N_CLUSTERS};
use crate::suspicious::{anomalous_cluster, select_suspicious, write_suspicious};
use crate::window::{WindowAggregator, DEFAULT_PRECEDING};

pub const DEFAULT_INPUT: &str = "transactions.csv";
pub const DEFAULT_OUTPUT: &str = "suspicious_transactions.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Earlier same-customer records in each window
    pub window: usize,
    pub workers: usize,
    pub validation: ValidationMode,
    pub cluster: ClusterParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            window: DEFAULT_PRECEDING,
            workers: default_workers(),
            validation: ValidationMode::Strict,
            cluster: ClusterParams::default(),
        }
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Summary of one completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub records_read: usize,
    pub records_dropped: usize,
    pub customers: usize,
    pub cluster_sizes: [usize; N_CLUSTERS],
    pub anomalous_cluster: usize,
    pub suspicious: usize,
    pub output: PathBuf,
    pub profiles: Vec<ClusterProfile>,
}

pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    let ingested = read_transactions(&config.input, config.validation)?;
    info!(
        records = ingested.records.len(),
        dropped = ingested.dropped,
        input = %config.input.display(),
        "transactions loaded"
    );

    let aggregator = WindowAggregator::new(config.window, config.workers);
    let enriched = aggregator.aggregate(&ingested.records)?;

    // Classification needs the full feature set; nothing is emitted before it completes.
    let assignment = classify(&enriched, &config.cluster)?;
    let anomalous = anomalous_cluster(assignment.sizes())?;
    info!(
        sizes = ?assignment.sizes(),
        anomalous,
        "clusters assigned"
    );

    let suspicious = select_suspicious(&enriched, &assignment, anomalous);
    write_suspicious(&config.output, &suspicious, anomalous)?;

    let customers = {
        let mut ids: Vec<i64> = enriched.iter().map(|e| e.record.customer_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    };

    Ok(PipelineReport {
        records_read: ingested.records.len() + ingested.dropped,
        records_dropped: ingested.dropped,
        customers,
        cluster_sizes: assignment.sizes(),
        anomalous_cluster: anomalous,
        suspicious: suspicious.len(),
        output: config.output.clone(),
        profiles: profile_clusters(&enriched, &assignment, anomalous),
    })
}
