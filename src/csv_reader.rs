use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{FraudError, Result};
use crate::temporal::EventTime;

/// Column names of the input dataset, in the order they must appear.
pub const SCHEMA: [&str; 7] = [
    "transaction_id",
    "customer_id",
    "merchant_id",
    "amount",
    "latitude",
    "longitude",
    "timestamp",
];

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransactionRecord {
    pub transaction_id: i64,
    pub customer_id: i64,
    pub merchant_id: i64,
    pub amount: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch seconds
    pub timestamp: f64,
}

/// What to do with a row that parses but carries an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Abort the run on the first invalid record
    #[default]
    Strict,
    /// Drop invalid records with a warning
    Lenient,
}

/// Records that passed validation plus a count of those dropped in lenient mode.
#[derive(Debug, Default)]
pub struct Ingested {
    pub records: Vec<TransactionRecord>,
    pub dropped: usize,
}

impl TransactionRecord {
    // Range checks for everything the schema types alone cannot express
    pub fn validate(&self) -> Result<()> {
        let id = self.transaction_id;
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(FraudError::invalid(id, "amount", self.amount));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(FraudError::invalid(id, "latitude", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(FraudError::invalid(id, "longitude", self.longitude));
        }
        // Finite but outside the representable time range is rejected here too
        EventTime::from_epoch_seconds(id, self.timestamp)?;
        Ok(())
    }
}

pub fn read_transactions(file_path: &Path, mode: ValidationMode) -> Result<Ingested> {
    let file = File::open(file_path).map_err(|source| FraudError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;
    read_transactions_from(file, mode)
}

// Schema problems are always fatal; value problems follow `mode`.
pub fn read_transactions_from<R: Read>(reader: R, mode: ValidationMode) -> Result<Ingested> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    check_header(&headers)?;

    let mut ingested = Ingested::default();
    let mut seen_ids = HashSet::new();

    for row in rdr.records() {
        let raw = row?;
        let line = raw.position().map(|p| p.line()).unwrap_or(0);

        if raw.len() != SCHEMA.len() {
            return Err(FraudError::SchemaViolation {
                line,
                detail: format!("expected {} columns, found {}", SCHEMA.len(), raw.len()),
            });
        }

        let record: TransactionRecord = raw
            .deserialize(Some(&headers))
            .map_err(|err| type_violation(line, err))?;

        let checked = record.validate().and_then(|_| {
            if seen_ids.insert(record.transaction_id) {
                Ok(())
            } else {
                Err(FraudError::invalid(
                    record.transaction_id,
                    "transaction_id",
                    "duplicate",
                ))
            }
        });

        match (checked, mode) {
            (Ok(()), _) => ingested.records.push(record),
            (Err(err), ValidationMode::Lenient) => {
                warn!(line, error = %err, "dropping invalid record");
                ingested.dropped += 1;
            }
            (Err(err), ValidationMode::Strict) => return Err(err),
        }
    }

    debug!(
        records = ingested.records.len(),
        dropped = ingested.dropped,
        "ingest finished"
    );
    Ok(ingested)
}

fn check_header(headers: &StringRecord) -> Result<()> {
    let found: Vec<&str> = headers.iter().collect();
    if found != SCHEMA {
        return Err(FraudError::SchemaViolation {
            line: 1,
            detail: format!(
                "header must be `{}`, found `{}`",
                SCHEMA.join(","),
                found.join(",")
            ),
        });
    }
    Ok(())
}

fn type_violation(line: u64, err: csv::Error) -> FraudError {
    let column = match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err
            .field()
            .and_then(|idx| SCHEMA.get(idx as usize))
            .copied(),
        _ => None,
    };
    let detail = match column {
        Some(name) => format!("column `{}` does not match its type: {}", name, err),
        None => err.to_string(),
    };
    FraudError::SchemaViolation { line, detail }
}
