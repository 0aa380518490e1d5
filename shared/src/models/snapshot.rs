//! Closing stock snapshots

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversion::ConversionSpec;

/// Frozen closing stock for one item in one period.
///
/// Unique per (hotel, item, period). Written when a stocktake for the
/// period is approved; once the period closes it is the immutable opening
/// balance of the next period. Costs are frozen at close time so later
/// price changes never drift historical values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub item_id: Uuid,
    pub period_id: Uuid,
    pub closing_full_units: Decimal,
    pub closing_partial_units: Decimal,
    pub unit_cost: Decimal,
    pub cost_per_serving: Decimal,
    pub closing_stock_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockSnapshot {
    /// Closing balance normalized to servings.
    pub fn closing_servings(&self, spec: &ConversionSpec) -> Decimal {
        spec.to_servings(self.closing_full_units, self.closing_partial_units)
    }
}

/// Value of a closing balance at its frozen serving cost.
pub fn closing_stock_value(closing_servings: Decimal, cost_per_serving: Decimal) -> Decimal {
    closing_servings * cost_per_serving
}
