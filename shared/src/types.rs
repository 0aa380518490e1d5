//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit period scope passed into every ledger and stocktake operation.
///
/// Replaces any notion of an ambient "current period": callers resolve the
/// context once and hand it to each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodContext {
    pub hotel_id: Uuid,
    pub period_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_closed: bool,
}

impl PeriodContext {
    pub fn is_open(&self) -> bool {
        !self.is_closed
    }
}

/// Date range for queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}
