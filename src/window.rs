//! Per-customer rolling statistics over time-ordered transactions.
//!
//! Each customer's records are sorted by event time (ties by transaction id)
//! and walked once with a deque bounded at `preceding + 1` amounts, so a record only ever sees itself and
//! up to `preceding` earlier records of the same customer.

use std::collections::{BTreeMap, VecDeque};
use std::thread;

use tracing::debug;

use crate::csv_reader::TransactionRecord;
use crate::error::Result;
use crate::temporal::{normalize, EventTime, Normalized};

/// Number of earlier same-customer records included in a window.
pub const DEFAULT_PRECEDING: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: TransactionRecord,
    pub event_time: EventTime,
    pub transaction_velocity: f64,
    pub avg_amount: f64,
    pub transaction_count: usize,
}

type Partition = Vec<(TransactionRecord, Normalized)>;

pub struct WindowAggregator {
    preceding: usize,
    workers: usize,
}

impl WindowAggregator {
    pub fn new(preceding: usize, workers: usize) -> Self {
        Self {
            preceding,
            workers: workers.max(1),
        }
    }

    /// Enrich every record. Output is ordered by transaction id.
    pub fn aggregate(&self, records: &[TransactionRecord]) -> Result<Vec<EnrichedRecord>> {
        let partitions = partition_by_customer(records)?;
        let preceding = self.preceding;

        let mut enriched: Vec<EnrichedRecord> = if self.workers == 1 || partitions.len() < 2 {
            partitions
                .iter()
                .flat_map(|(_, partition)| aggregate_partition(partition, preceding))
                .collect()
        } else {
            let chunk_size = partitions.len().div_ceil(self.workers);
            thread::scope(|scope| {
                let handles: Vec<_> = partitions
                    .chunks(chunk_size)
                    .map(|chunk| {
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .flat_map(|(_, partition)| aggregate_partition(partition, preceding))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .flat_map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                    })
                    .collect()
            })
        };

        enriched.sort_by_key(|e| e.record.transaction_id);
        debug!(
            customers = partitions.len(),
            records = enriched.len(),
            "windowed aggregation finished"
        );
        Ok(enriched)
    }
}

impl Default for WindowAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_PRECEDING, 1)
    }
}

// Customer id -> that customer's records, already in window order.
fn partition_by_customer(records: &[TransactionRecord]) -> Result<Vec<(i64, Partition)>> {
    let mut by_customer: BTreeMap<i64, Partition> = BTreeMap::new();
    for record in records {
        let normalized = normalize(record)?;
        by_customer
            .entry(record.customer_id)
            .or_default()
            .push((record.clone(), normalized));
    }

    let mut partitions: Vec<(i64, Partition)> = by_customer.into_iter().collect();
    for (_, partition) in partitions.iter_mut() {
        partition.sort_by(|(a, na), (b, nb)| {
            na.event_time
                .cmp(&nb.event_time)
                .then(a.transaction_id.cmp(&b.transaction_id))
        });
    }
    Ok(partitions)
}

fn aggregate_partition(
    partition: &[(TransactionRecord, Normalized)],
    preceding: usize,
) -> Vec<EnrichedRecord> {
    let mut window: VecDeque<f64> = VecDeque::with_capacity(preceding + 1);
    let mut out = Vec::with_capacity(partition.len());

    for (record, normalized) in partition {
        window.push_back(record.amount);
        if window.len() > preceding + 1 {
            window.pop_front();
        }

        // Evicted amounts must not contribute, not even as rounding error
        let window_sum: f64 = window.iter().sum();
        let count = window.len();
        out.push(EnrichedRecord {
            record: record.clone(),
            event_time: normalized.event_time,
            transaction_velocity: normalized.transaction_velocity,
            avg_amount: window_sum / count as f64,
            transaction_count: count,
        });
    }
    out
}
