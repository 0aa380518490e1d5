//! Stock movement ledger entries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger movement types. The sign of a movement's effect on stock is
/// implied by its type; callers supply magnitudes, except adjustments,
/// which carry their own sign (a stocktake variance may go either way).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Purchase,
    Sale,
    Waste,
    TransferIn,
    TransferOut,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Purchase => "purchase",
            MovementType::Sale => "sale",
            MovementType::Waste => "waste",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(MovementType::Purchase),
            "sale" => Some(MovementType::Sale),
            "waste" => Some(MovementType::Waste),
            "transfer_in" => Some(MovementType::TransferIn),
            "transfer_out" => Some(MovementType::TransferOut),
            "adjustment" => Some(MovementType::Adjustment),
            _ => None,
        }
    }

    /// Sign applied to a recorded magnitude, or `None` for adjustments.
    pub fn implied_sign(&self) -> Option<i64> {
        match self {
            MovementType::Purchase | MovementType::TransferIn => Some(1),
            MovementType::Sale | MovementType::Waste | MovementType::TransferOut => Some(-1),
            MovementType::Adjustment => None,
        }
    }
}

/// Validate a caller-supplied quantity and apply the type's sign.
///
/// Signed-by-type movements must be positive magnitudes; adjustments must
/// be nonzero and keep their sign.
pub fn signed_quantity(
    movement_type: MovementType,
    quantity: Decimal,
) -> Result<Decimal, &'static str> {
    match movement_type.implied_sign() {
        Some(sign) => {
            if quantity <= Decimal::ZERO {
                return Err("quantity must be a positive magnitude");
            }
            Ok(quantity * Decimal::from(sign))
        }
        None => {
            if quantity == Decimal::ZERO {
                return Err("adjustment quantity cannot be zero");
            }
            Ok(quantity)
        }
    }
}

/// Immutable ledger entry. Corrections are new offsetting movements,
/// never edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub item_id: Uuid,
    pub period_id: Option<Uuid>,
    pub movement_type: MovementType,
    /// Signed quantity in serving units
    pub quantity: Decimal,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub recorded_at: DateTime<Utc>,
}

/// Per-type sums of an item's movements within one period.
///
/// All buckets hold positive magnitudes except `adjustments`, which is a
/// signed net. Stocktake line fields are a cache of these values; the
/// ledger stays the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementAggregates {
    pub purchases: Decimal,
    pub sales: Decimal,
    pub waste: Decimal,
    pub transfers_in: Decimal,
    pub transfers_out: Decimal,
    pub adjustments: Decimal,
}

impl MovementAggregates {
    /// Accumulate one ledger entry (signed quantity as stored).
    pub fn apply(&mut self, movement_type: MovementType, signed_quantity: Decimal) {
        match movement_type {
            MovementType::Purchase => self.purchases += signed_quantity,
            MovementType::Sale => self.sales -= signed_quantity,
            MovementType::Waste => self.waste -= signed_quantity,
            MovementType::TransferIn => self.transfers_in += signed_quantity,
            MovementType::TransferOut => self.transfers_out -= signed_quantity,
            MovementType::Adjustment => self.adjustments += signed_quantity,
        }
    }

    pub fn fold<I>(movements: I) -> Self
    where
        I: IntoIterator<Item = (MovementType, Decimal)>,
    {
        let mut agg = MovementAggregates::default();
        for (movement_type, quantity) in movements {
            agg.apply(movement_type, quantity);
        }
        agg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn sign_is_implied_by_type() {
        assert_eq!(
            signed_quantity(MovementType::Purchase, dec("24")).unwrap(),
            dec("24")
        );
        assert_eq!(
            signed_quantity(MovementType::Waste, dec("2")).unwrap(),
            dec("-2")
        );
        assert_eq!(
            signed_quantity(MovementType::TransferOut, dec("5")).unwrap(),
            dec("-5")
        );
    }

    #[test]
    fn signed_types_reject_non_positive_magnitudes() {
        assert!(signed_quantity(MovementType::Purchase, Decimal::ZERO).is_err());
        assert!(signed_quantity(MovementType::Sale, dec("-3")).is_err());
    }

    #[test]
    fn adjustments_keep_their_sign() {
        assert_eq!(
            signed_quantity(MovementType::Adjustment, dec("-12")).unwrap(),
            dec("-12")
        );
        assert!(signed_quantity(MovementType::Adjustment, Decimal::ZERO).is_err());
    }

    #[test]
    fn aggregates_bucket_by_type() {
        let agg = MovementAggregates::fold([
            (MovementType::Purchase, dec("24")),
            (MovementType::Waste, dec("-2")),
            (MovementType::TransferIn, dec("6")),
            (MovementType::TransferOut, dec("-4")),
            (MovementType::Sale, dec("-10")),
            (MovementType::Adjustment, dec("-12")),
        ]);
        assert_eq!(agg.purchases, dec("24"));
        assert_eq!(agg.waste, dec("2"));
        assert_eq!(agg.transfers_in, dec("6"));
        assert_eq!(agg.transfers_out, dec("4"));
        assert_eq!(agg.sales, dec("10"));
        assert_eq!(agg.adjustments, dec("-12"));
    }
}
