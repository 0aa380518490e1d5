//! Movement ledger tests
//!
//! Covers:
//! - Sign-by-type quantity validation
//! - Per-type aggregation of ledger entries
//! - Closed-period and context rules

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{signed_quantity, MovementAggregates, MovementType};
use shared::types::PeriodContext;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn test_movement_type_round_trip() {
        let types = [
            MovementType::Purchase,
            MovementType::Sale,
            MovementType::Waste,
            MovementType::TransferIn,
            MovementType::TransferOut,
            MovementType::Adjustment,
        ];
        for t in types {
            assert_eq!(MovementType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(MovementType::from_str("breakage"), None);
    }

    #[test]
    fn test_inbound_types_are_positive() {
        assert_eq!(
            signed_quantity(MovementType::Purchase, dec("24")).unwrap(),
            dec("24")
        );
        assert_eq!(
            signed_quantity(MovementType::TransferIn, dec("6")).unwrap(),
            dec("6")
        );
    }

    #[test]
    fn test_outbound_types_are_negative() {
        assert_eq!(
            signed_quantity(MovementType::Sale, dec("10")).unwrap(),
            dec("-10")
        );
        assert_eq!(
            signed_quantity(MovementType::Waste, dec("2")).unwrap(),
            dec("-2")
        );
        assert_eq!(
            signed_quantity(MovementType::TransferOut, dec("4")).unwrap(),
            dec("-4")
        );
    }

    #[test]
    fn test_magnitude_must_be_positive() {
        for t in [
            MovementType::Purchase,
            MovementType::Sale,
            MovementType::Waste,
            MovementType::TransferIn,
            MovementType::TransferOut,
        ] {
            assert!(signed_quantity(t, Decimal::ZERO).is_err());
            assert!(signed_quantity(t, dec("-1")).is_err());
        }
    }

    #[test]
    fn test_adjustment_is_signed_and_nonzero() {
        assert_eq!(
            signed_quantity(MovementType::Adjustment, dec("-12")).unwrap(),
            dec("-12")
        );
        assert_eq!(
            signed_quantity(MovementType::Adjustment, dec("3")).unwrap(),
            dec("3")
        );
        assert!(signed_quantity(MovementType::Adjustment, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_aggregate_buckets() {
        let agg = MovementAggregates::fold([
            (MovementType::Purchase, dec("24")),
            (MovementType::Purchase, dec("12")),
            (MovementType::Sale, dec("-10")),
            (MovementType::Waste, dec("-2")),
            (MovementType::TransferIn, dec("6")),
            (MovementType::TransferOut, dec("-4")),
            (MovementType::Adjustment, dec("-12")),
            (MovementType::Adjustment, dec("5")),
        ]);
        assert_eq!(agg.purchases, dec("36"));
        assert_eq!(agg.sales, dec("10"));
        assert_eq!(agg.waste, dec("2"));
        assert_eq!(agg.transfers_in, dec("6"));
        assert_eq!(agg.transfers_out, dec("4"));
        assert_eq!(agg.adjustments, dec("-7"));
    }

    #[test]
    fn test_empty_aggregate_is_zero() {
        let agg = MovementAggregates::fold([]);
        assert_eq!(agg, MovementAggregates::default());
    }

    #[test]
    fn test_period_context_open_flag() {
        let ctx = PeriodContext {
            hotel_id: Uuid::new_v4(),
            period_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
            is_closed: false,
        };
        assert!(ctx.is_open());

        let closed = PeriodContext { is_closed: true, ..ctx };
        assert!(!closed.is_open());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for positive magnitudes (0.1 to 1000.0)
    fn magnitude_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    fn signed_type_strategy() -> impl Strategy<Value = MovementType> {
        prop_oneof![
            Just(MovementType::Purchase),
            Just(MovementType::Sale),
            Just(MovementType::Waste),
            Just(MovementType::TransferIn),
            Just(MovementType::TransferOut),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The stored quantity always carries the type's implied sign
        #[test]
        fn prop_sign_matches_type(
            movement_type in signed_type_strategy(),
            magnitude in magnitude_strategy(),
        ) {
            let signed = signed_quantity(movement_type, magnitude).unwrap();
            match movement_type.implied_sign() {
                Some(1) => prop_assert!(signed > Decimal::ZERO),
                Some(-1) => prop_assert!(signed < Decimal::ZERO),
                _ => prop_assert!(false, "signed types must imply a sign"),
            }
            prop_assert_eq!(signed.abs(), magnitude);
        }

        /// Aggregation bucket magnitudes are non-negative and the net of
        /// all buckets equals the sum of signed quantities
        #[test]
        fn prop_aggregate_net_matches_signed_sum(
            entries in prop::collection::vec(
                (signed_type_strategy(), magnitude_strategy()),
                0..30
            )
        ) {
            let signed: Vec<(MovementType, Decimal)> = entries
                .iter()
                .map(|(t, q)| (*t, signed_quantity(*t, *q).unwrap()))
                .collect();
            let total: Decimal = signed.iter().map(|(_, q)| *q).sum();

            let agg = MovementAggregates::fold(signed);
            prop_assert!(agg.purchases >= Decimal::ZERO);
            prop_assert!(agg.sales >= Decimal::ZERO);
            prop_assert!(agg.waste >= Decimal::ZERO);
            prop_assert!(agg.transfers_in >= Decimal::ZERO);
            prop_assert!(agg.transfers_out >= Decimal::ZERO);

            let net = agg.purchases - agg.sales - agg.waste + agg.transfers_in
                - agg.transfers_out
                + agg.adjustments;
            prop_assert_eq!(net, total);
        }

        /// Folding is order-insensitive
        #[test]
        fn prop_fold_is_order_insensitive(
            entries in prop::collection::vec(
                (signed_type_strategy(), magnitude_strategy()),
                0..20
            )
        ) {
            let signed: Vec<(MovementType, Decimal)> = entries
                .iter()
                .map(|(t, q)| (*t, signed_quantity(*t, *q).unwrap()))
                .collect();
            let mut reversed = signed.clone();
            reversed.reverse();
            prop_assert_eq!(
                MovementAggregates::fold(signed),
                MovementAggregates::fold(reversed)
            );
        }
    }
}
