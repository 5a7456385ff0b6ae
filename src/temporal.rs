//! Epoch timestamps to ordered event times, plus the velocity rescaling.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::csv_reader::TransactionRecord;
use crate::error::{FraudError, Result};

/// Format used when an event time is written out.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Divisor applied to `amount` to produce `transaction_velocity`.
pub const VELOCITY_SCALE: f64 = 100.0;

/// A point in time at microsecond resolution. Only ordering and equality matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventTime(DateTime<Utc>);

impl EventTime {
    pub fn from_epoch_seconds(transaction_id: i64, seconds: f64) -> Result<Self> {
        if !seconds.is_finite() {
            return Err(FraudError::invalid(transaction_id, "timestamp", seconds));
        }
        let micros = (seconds * 1_000_000.0).round() as i64;
        DateTime::from_timestamp_micros(micros)
            .map(EventTime)
            .ok_or_else(|| FraudError::invalid(transaction_id, "timestamp", seconds))
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(EVENT_TIME_FORMAT))
    }
}

/// Normalized view of one record: its event time and velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub event_time: EventTime,
    pub transaction_velocity: f64,
}

pub fn transaction_velocity(transaction_id: i64, amount: f64) -> Result<f64> {
    if amount.is_nan() {
        return Err(FraudError::invalid(transaction_id, "amount", amount));
    }
    Ok(amount / VELOCITY_SCALE)
}

pub fn normalize(record: &TransactionRecord) -> Result<Normalized> {
    Ok(Normalized {
        event_time: EventTime::from_epoch_seconds(record.transaction_id, record.timestamp)?,
        transaction_velocity: transaction_velocity(record.transaction_id, record.amount)?,
    })
}
