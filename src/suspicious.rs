//! Minority-cluster selection and the suspicious-transaction CSV.

use std::fs::{self, File};
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use crate::error::{FraudError, Result};
use crate::kmeans::{ClusterAssignment, N_CLUSTERS};
use crate::window::EnrichedRecord;

pub const OUTPUT_COLUMNS: [&str; 12] = [
    "transaction_id",
    "customer_id",
    "merchant_id",
    "amount",
    "latitude",
    "longitude",
    "timestamp",
    "event_time",
    "transaction_velocity",
    "avg_amount",
    "transaction_count",
    "cluster",
];

#[derive(Debug, Serialize)]
struct SuspiciousRow {
    transaction_id: i64,
    customer_id: i64,
    merchant_id: i64,
    amount: f64,
    latitude: f64,
    longitude: f64,
    timestamp: f64,
    event_time: String,
    transaction_velocity: f64,
    avg_amount: f64,
    transaction_count: usize,
    cluster: usize,
}

impl SuspiciousRow {
    fn new(e: &EnrichedRecord, cluster: usize) -> Self {
        Self {
            transaction_id: e.record.transaction_id,
            customer_id: e.record.customer_id,
            merchant_id: e.record.merchant_id,
            amount: e.record.amount,
            latitude: e.record.latitude,
            longitude: e.record.longitude,
            timestamp: e.record.timestamp,
            event_time: e.event_time.to_string(),
            transaction_velocity: e.transaction_velocity,
            avg_amount: e.avg_amount,
            transaction_count: e.transaction_count,
            cluster,
        }
    }
}

/// The strictly smaller cluster. Equal sizes have no safe answer.
pub fn anomalous_cluster(sizes: [usize; N_CLUSTERS]) -> Result<usize> {
    match sizes[0].cmp(&sizes[1]) {
        std::cmp::Ordering::Less => Ok(0),
        std::cmp::Ordering::Greater => Ok(1),
        std::cmp::Ordering::Equal => Err(FraudError::AmbiguousCluster { size: sizes[0] }),
    }
}

/// Records labelled `anomalous`, ordered by transaction id.
pub fn select_suspicious<'a>(
    records: &'a [EnrichedRecord],
    assignment: &ClusterAssignment,
    anomalous: usize,
) -> Vec<&'a EnrichedRecord> {
    let mut selected: Vec<&EnrichedRecord> = records
        .iter()
        .filter(|e| assignment.label(e.record.transaction_id) == Some(anomalous))
        .collect();
    selected.sort_by_key(|e| e.record.transaction_id);
    selected
}

/// Write `rows` to `path`, replacing whatever was there.
pub fn write_suspicious(path: &Path, rows: &[&EnrichedRecord], cluster: usize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| FraudError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = File::create(path).map_err(|source| FraudError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(OUTPUT_COLUMNS)?;
    for row in rows {
        wtr.serialize(SuspiciousRow::new(row, cluster))?;
    }
    wtr.flush().map_err(|source| FraudError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(rows = rows.len(), path = %path.display(), "suspicious transactions written");
    Ok(())
}
