//! Accounting periods

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::PeriodContext;

/// A contiguous accounting period for one hotel.
///
/// Periods move from open to closed exactly once; a closed period's
/// snapshots are the immutable opening balances of the next period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Inclusive date-range overlap with another span.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }

    pub fn context(&self) -> PeriodContext {
        PeriodContext {
            hotel_id: self.hotel_id,
            period_id: self.id,
            start_date: self.start_date,
            end_date: self.end_date,
            is_closed: self.is_closed,
        }
    }
}
