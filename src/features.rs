use ndarray::{Array2, Axis};

use crate::window::EnrichedRecord;

pub const FEATURE_DIM: usize = 4;

pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "amount",
    "transaction_velocity",
    "avg_amount",
    "transaction_count",
];

/// Fixed-order numeric summary of one enriched transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_DIM]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_DIM] {
        &self.0
    }
}

impl From<&EnrichedRecord> for FeatureVector {
    fn from(e: &EnrichedRecord) -> Self {
        FeatureVector([
            e.record.amount,
            e.transaction_velocity,
            e.avg_amount,
            e.transaction_count as f64,
        ])
    }
}

// One row per record, columns in FEATURE_NAMES order
pub fn assemble(records: &[EnrichedRecord]) -> Array2<f64> {
    let mut data = Array2::zeros((records.len(), FEATURE_DIM));
    for (mut row, record) in data.axis_iter_mut(Axis(0)).zip(records) {
        for (slot, &value) in row.iter_mut().zip(FeatureVector::from(record).values()) {
            *slot = value;
        }
    }
    data
}

/// Z-score each column in place. Constant columns are left untouched.
pub fn standardize(data: &mut Array2<f64>) {
    for mut column in data.axis_iter_mut(Axis(1)) {
        let n = column.len() as f64;
        if n == 0.0 {
            continue;
        }
        let mean = column.sum() / n;
        let variance = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev > 0.0 {
            column.mapv_inplace(|x| (x - mean) / std_dev);
        }
    }
}
