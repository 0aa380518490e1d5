//! Stocktake and line models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversion::ConversionSpec;
use crate::models::MovementAggregates;

/// Stocktake lifecycle. Approved is terminal: counted values and movement
/// caches are frozen from that point on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StocktakeStatus {
    Draft,
    Approved,
}

impl StocktakeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StocktakeStatus::Draft => "draft",
            StocktakeStatus::Approved => "approved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(StocktakeStatus::Draft),
            "approved" => Some(StocktakeStatus::Approved),
            _ => None,
        }
    }
}

/// One count cycle for a hotel. The period link is resolved against the
/// stocktake's own date range; approval proceeds without one but reports
/// every snapshot it could not write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stocktake {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub period_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: StocktakeStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line per item in a stocktake.
///
/// The movement fields cache ledger aggregates for the period;
/// `valuation_cost` is the serving cost frozen when the line was seeded and
/// prices all variance math thereafter, so later item cost changes never
/// rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StocktakeLine {
    pub id: Uuid,
    pub stocktake_id: Uuid,
    pub item_id: Uuid,
    /// Carried from the prior closed period's snapshot, in servings
    pub opening_qty: Decimal,
    pub purchases: Decimal,
    pub sales: Decimal,
    pub waste: Decimal,
    pub transfers_in: Decimal,
    pub transfers_out: Decimal,
    pub adjustments: Decimal,
    pub counted_full_units: Decimal,
    pub counted_partial_units: Decimal,
    /// Serving cost frozen at line-seed time
    pub valuation_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StocktakeLine {
    /// Ledger-derived expectation. Sales are a revenue-side concern and do
    /// not enter the physical expectation.
    pub fn expected_qty(&self) -> Decimal {
        self.opening_qty + self.purchases - self.waste + self.transfers_in - self.transfers_out
            + self.adjustments
    }

    /// Physically counted quantity normalized to servings.
    pub fn counted_qty(&self, spec: &ConversionSpec) -> Decimal {
        spec.to_servings(self.counted_full_units, self.counted_partial_units)
    }

    pub fn variance_qty(&self, spec: &ConversionSpec) -> Decimal {
        self.counted_qty(spec) - self.expected_qty()
    }

    /// Variance priced at the line's frozen valuation cost, never at the
    /// item's live cost.
    pub fn variance_value(&self, spec: &ConversionSpec) -> Decimal {
        self.variance_qty(spec) * self.valuation_cost
    }

    /// Re-derive the cached movement fields from ledger aggregates.
    pub fn refresh_aggregates(&mut self, agg: &MovementAggregates) {
        self.purchases = agg.purchases;
        self.sales = agg.sales;
        self.waste = agg.waste;
        self.transfers_in = agg.transfers_in;
        self.transfers_out = agg.transfers_out;
        self.adjustments = agg.adjustments;
    }
}

/// A line whose snapshot could not be written during approval because no
/// period matched the stocktake's date range. Surfaced to the caller,
/// never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotWarning {
    pub item_id: Uuid,
    pub sku: String,
    pub message: String,
}

/// Structured result of a stocktake approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    /// Adjustment movements posted for nonzero variances
    pub adjustments_created: u32,
    pub snapshot_warnings: Vec<SnapshotWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ConversionRule, ConversionSpec};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line() -> StocktakeLine {
        StocktakeLine {
            id: Uuid::new_v4(),
            stocktake_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            opening_qty: Decimal::ZERO,
            purchases: Decimal::ZERO,
            sales: Decimal::ZERO,
            waste: Decimal::ZERO,
            transfers_in: Decimal::ZERO,
            transfers_out: Decimal::ZERO,
            adjustments: Decimal::ZERO,
            counted_full_units: Decimal::ZERO,
            counted_partial_units: Decimal::ZERO,
            valuation_cost: Decimal::ONE,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn expected_excludes_sales() {
        let mut l = line();
        l.opening_qty = dec("20");
        l.purchases = dec("24");
        l.sales = dec("15");
        assert_eq!(l.expected_qty(), dec("44"));
    }

    #[test]
    fn worked_example_bottled_variance() {
        // Bottled item, 12 bottles per case: opening 1 case + 8 loose,
        // purchase of 24, count of 2 cases + 8 loose.
        let spec =
            ConversionSpec::new(ConversionRule::BottledLike, dec("12"), None).unwrap();
        let mut l = line();
        l.opening_qty = dec("20");
        l.purchases = dec("24");
        l.counted_full_units = dec("2");
        l.counted_partial_units = dec("8");
        l.valuation_cost = dec("1.50");

        assert_eq!(l.expected_qty(), dec("44"));
        assert_eq!(l.counted_qty(&spec), dec("32"));
        assert_eq!(l.variance_qty(&spec), dec("-12"));
        assert_eq!(l.variance_value(&spec), dec("-18.00"));
    }

    #[test]
    fn variance_uses_frozen_cost() {
        let spec =
            ConversionSpec::new(ConversionRule::BottledLike, dec("12"), None).unwrap();
        let mut l = line();
        l.opening_qty = dec("10");
        l.counted_full_units = dec("1");
        l.valuation_cost = dec("2.00");
        // variance of +2 at the frozen cost, whatever the item costs today
        assert_eq!(l.variance_value(&spec), dec("4.00"));
    }

    #[test]
    fn refresh_replaces_cached_fields() {
        let mut l = line();
        l.purchases = dec("99");
        let agg = MovementAggregates {
            purchases: dec("24"),
            sales: dec("10"),
            waste: dec("2"),
            transfers_in: dec("6"),
            transfers_out: dec("4"),
            adjustments: dec("-1"),
        };
        l.refresh_aggregates(&agg);
        assert_eq!(l.purchases, dec("24"));
        assert_eq!(l.sales, dec("10"));
        assert_eq!(l.waste, dec("2"));
        assert_eq!(l.expected_qty(), dec("24") - dec("2") + dec("6") - dec("4") - dec("1"));
    }
}
