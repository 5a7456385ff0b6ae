// Error taxonomy shared by every pipeline stage.
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FraudError>;

#[derive(Debug, Error)]
pub enum FraudError {
    #[error("schema violation at line {line}: {detail}")]
    SchemaViolation { line: u64, detail: String },

    #[error("invalid value for transaction {transaction_id}: column `{column}` = {value}")]
    InvalidValue {
        transaction_id: i64,
        column: &'static str,
        value: String,
    },

    #[error("insufficient data: need at least {needed} feature vectors, have {have}")]
    InsufficientData { needed: usize, have: usize },

    #[error("cannot pick an anomalous cluster: both clusters have {size} members")]
    AmbiguousCluster { size: usize },

    #[error("k-means fit failed: {0}")]
    Clustering(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl FraudError {
    pub(crate) fn invalid(transaction_id: i64, column: &'static str, value: impl ToString) -> Self {
        FraudError::InvalidValue {
            transaction_id,
            column,
            value: value.to_string(),
        }
    }
}
