//! Unit conversion tests
//!
//! Covers the category conversion table:
//! - Serving normalization per rule
//! - Display round-trip identity for legal inputs
//! - Unopened-unit counting (opened fraction vs loose stock)

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::conversion::{ConversionRule, ConversionSpec};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn spec(rule: ConversionRule, uom: &str, serving: Option<&str>) -> ConversionSpec {
    ConversionSpec::new(rule, dec(uom), serving.map(dec)).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Draught: kegs plus pints in the opened keg
    #[test]
    fn test_draught_servings() {
        let s = spec(ConversionRule::Draught, "88", None);
        assert_eq!(s.to_servings(dec("0"), dec("0")), Decimal::ZERO);
        assert_eq!(s.to_servings(dec("1"), dec("0")), dec("88"));
        assert_eq!(s.to_servings(dec("2"), dec("30.5")), dec("206.5"));
    }

    /// Bottled beer: cases plus loose bottles
    #[test]
    fn test_bottled_servings() {
        let s = spec(ConversionRule::BottledLike, "12", None);
        assert_eq!(s.to_servings(dec("1"), dec("8")), dec("20"));
        assert_eq!(s.to_servings(dec("2"), dec("8")), dec("32"));
    }

    /// Spirits: whole bottles plus a 0-1 fraction of the opened bottle
    #[test]
    fn test_spirit_servings() {
        // 700ml bottle at 35ml measures
        let s = spec(ConversionRule::BottleFractional, "700", Some("35"));
        assert_eq!(s.servings_per_full_unit(), dec("20"));
        assert_eq!(s.to_servings(dec("1"), dec("0")), dec("20"));
        assert_eq!(s.to_servings(dec("1"), dec("0.25")), dec("25.00"));
    }

    /// Syrups: bottles plus millilitres in the opened bottle
    #[test]
    fn test_syrup_servings() {
        let s = spec(ConversionRule::SyrupLike, "750", Some("25"));
        assert_eq!(s.to_servings(dec("1"), dec("0")), dec("30"));
        assert_eq!(s.to_servings(dec("1"), dec("500")), dec("50"));
    }

    /// Juices: cases plus a loose-bottle count whose ml fraction is ignored
    #[test]
    fn test_juice_servings_drop_ml_fraction() {
        let s = spec(ConversionRule::JuiceCase, "24", None);
        assert_eq!(s.to_servings(dec("1"), dec("3")), dec("27"));
        assert_eq!(s.to_servings(dec("1"), dec("3.250")), dec("27"));
        assert_eq!(s.to_servings(dec("1"), dec("3.999")), dec("27"));
    }

    /// Bag-in-box worked example: uom=18 litres, 0.2 litre serving
    #[test]
    fn test_bib_worked_example() {
        let s = spec(ConversionRule::BagInBox, "18", Some("200"));
        assert_eq!(s.to_servings(dec("2"), dec("0.5")), dec("182.5"));
        assert_eq!(s.unopened_units(dec("2"), dec("0.5")), dec("2"));
    }

    /// Bottled worked example: uom=12, one case plus eight loose
    #[test]
    fn test_bottled_worked_example() {
        let s = spec(ConversionRule::BottledLike, "12", None);
        let opening = s.to_servings(dec("1"), dec("8"));
        assert_eq!(opening, dec("20"));
        let counted = s.to_servings(dec("2"), dec("8"));
        assert_eq!(counted, dec("32"));
    }

    /// Opened-container categories report only the full count
    #[test]
    fn test_unopened_excludes_opened_partials() {
        let draught = spec(ConversionRule::Draught, "88", None);
        assert_eq!(draught.unopened_units(dec("3"), dec("40")), dec("3"));

        let spirit = spec(ConversionRule::BottleFractional, "700", Some("35"));
        assert_eq!(spirit.unopened_units(dec("4"), dec("0.9")), dec("4"));

        let syrup = spec(ConversionRule::SyrupLike, "750", Some("25"));
        assert_eq!(syrup.unopened_units(dec("2"), dec("600")), dec("2"));
    }

    /// Loose-stock categories include the partial in the unopened count
    #[test]
    fn test_unopened_includes_loose_partials() {
        let bottled = spec(ConversionRule::BottledLike, "12", None);
        assert_eq!(bottled.unopened_units(dec("1"), dec("8")), dec("20"));

        let juice = spec(ConversionRule::JuiceCase, "24", None);
        assert_eq!(juice.unopened_units(dec("1"), dec("3.250")), dec("27"));
    }

    /// The same uom value means different things under different rules
    #[test]
    fn test_uom_meaning_is_rule_specific() {
        let bottled = spec(ConversionRule::BottledLike, "24", None);
        let juice = spec(ConversionRule::JuiceCase, "24", None);
        let syrup = spec(ConversionRule::SyrupLike, "24", Some("8"));

        // Same numeric uom, different serving meanings
        assert_eq!(bottled.to_servings(dec("1"), dec("0")), dec("24"));
        assert_eq!(juice.to_servings(dec("1"), dec("0")), dec("24"));
        assert_eq!(syrup.to_servings(dec("1"), dec("0")), dec("3"));
    }

    #[test]
    fn test_display_of_zero() {
        for s in [
            spec(ConversionRule::Draught, "88", None),
            spec(ConversionRule::BottledLike, "12", None),
            spec(ConversionRule::BottleFractional, "700", Some("35")),
            spec(ConversionRule::SyrupLike, "750", Some("25")),
            spec(ConversionRule::JuiceCase, "24", None),
            spec(ConversionRule::BagInBox, "18", Some("200")),
        ] {
            let (full, partial) = s.to_display(Decimal::ZERO);
            assert_eq!(full, Decimal::ZERO);
            assert_eq!(partial, Decimal::ZERO);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Serving sizes for spirit specs; the bottle count divides out exactly
    fn spirit_serving_strategy() -> impl Strategy<Value = Decimal> {
        prop_oneof![
            Just(dec("25")),
            Just(dec("35")),
            Just(dec("35.5")),
            Just(dec("50")),
        ]
    }

    /// Serving sizes whose decimal division always terminates
    fn syrup_serving_strategy() -> impl Strategy<Value = Decimal> {
        prop_oneof![
            Just(dec("10")),
            Just(dec("20")),
            Just(dec("25")),
            Just(dec("40")),
            Just(dec("50")),
            Just(dec("200")),
        ]
    }

    fn whole(max: i64) -> impl Strategy<Value = Decimal> {
        (0i64..=max).prop_map(Decimal::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Round trip: draught display units survive to_servings/to_display
        #[test]
        fn prop_draught_round_trip(
            uom in 8i64..=100,
            full in 0i64..=20,
            tenths in 0i64..=9,
        ) {
            let s = ConversionSpec::new(ConversionRule::Draught, Decimal::from(uom), None).unwrap();
            let full = Decimal::from(full);
            // partial pints strictly below one keg
            let partial = Decimal::new((uom - 1) * 10 + tenths, 1);
            let (f, p) = s.to_display(s.to_servings(full, partial));
            prop_assert_eq!(f, full);
            prop_assert_eq!(p, partial);
        }

        /// Round trip: bottled cases and loose bottles
        #[test]
        fn prop_bottled_round_trip(
            uom in 2i64..=48,
            full in 0i64..=50,
            partial_seed in 0i64..=1000,
        ) {
            let s = ConversionSpec::new(ConversionRule::BottledLike, Decimal::from(uom), None).unwrap();
            let full = Decimal::from(full);
            let partial = Decimal::from(partial_seed % uom);
            let (f, p) = s.to_display(s.to_servings(full, partial));
            prop_assert_eq!(f, full);
            prop_assert_eq!(p, partial);
        }

        /// Round trip: spirit bottles with a hundredth-scale fraction
        #[test]
        fn prop_spirit_round_trip(
            multiplier in 2i64..=40,
            full in 0i64..=30,
            hundredths in 0i64..=99,
            serving in spirit_serving_strategy(),
        ) {
            let uom = serving * Decimal::from(multiplier);
            let s = ConversionSpec::new(ConversionRule::BottleFractional, uom, Some(serving)).unwrap();
            let full = Decimal::from(full);
            let partial = Decimal::new(hundredths, 2);
            let (f, p) = s.to_display(s.to_servings(full, partial));
            prop_assert_eq!(f, full);
            prop_assert_eq!(p, partial);
        }

        /// Round trip: syrup bottles with whole millilitres remaining
        #[test]
        fn prop_syrup_round_trip(
            multiplier in 10i64..=40,
            full in 0i64..=20,
            partial_seed in 0i64..=10_000,
            serving in syrup_serving_strategy(),
        ) {
            let uom = serving * Decimal::from(multiplier);
            let s = ConversionSpec::new(ConversionRule::SyrupLike, uom, Some(serving)).unwrap();
            let full = Decimal::from(full);
            // whole millilitres strictly below one bottle
            let partial = Decimal::from(partial_seed) % uom;
            let (f, p) = s.to_display(s.to_servings(full, partial));
            prop_assert_eq!(f, full);
            prop_assert_eq!(p, partial);
        }

        /// Round trip: juice cases with whole loose bottles
        #[test]
        fn prop_juice_round_trip(
            uom in 2i64..=24,
            full in 0i64..=50,
            partial_seed in 0i64..=1000,
        ) {
            let s = ConversionSpec::new(ConversionRule::JuiceCase, Decimal::from(uom), None).unwrap();
            let full = Decimal::from(full);
            let partial = Decimal::from(partial_seed % uom);
            let (f, p) = s.to_display(s.to_servings(full, partial));
            prop_assert_eq!(f, full);
            prop_assert_eq!(p, partial);
        }

        /// Round trip: bag-in-box with tenth-of-a-litre partials
        #[test]
        fn prop_bib_round_trip(
            uom in 5i64..=25,
            full in 0i64..=10,
            tenths in 0i64..=9,
        ) {
            let s = ConversionSpec::new(ConversionRule::BagInBox, Decimal::from(uom), Some(dec("200"))).unwrap();
            let full = Decimal::from(full);
            // partial litres strictly below one box
            let partial = Decimal::new((uom - 1) * 10 + tenths, 1);
            let (f, p) = s.to_display(s.to_servings(full, partial));
            prop_assert_eq!(f, full);
            prop_assert_eq!(p, partial);
        }

        /// Servings never decrease when the count grows
        #[test]
        fn prop_servings_monotonic_in_full(
            uom in 2i64..=48,
            full in whole(50),
            partial in whole(40),
        ) {
            let s = ConversionSpec::new(ConversionRule::BottledLike, Decimal::from(uom), None).unwrap();
            let base = s.to_servings(full, partial);
            let more = s.to_servings(full + Decimal::ONE, partial);
            prop_assert!(more > base);
        }

        /// Unopened count never exceeds the serving total for loose-stock
        /// categories
        #[test]
        fn prop_unopened_bounded_by_servings(
            uom in 2i64..=48,
            full in whole(50),
            partial_seed in 0i64..=1000,
        ) {
            let s = ConversionSpec::new(ConversionRule::BottledLike, Decimal::from(uom), None).unwrap();
            let partial = Decimal::from(partial_seed % uom);
            prop_assert!(s.unopened_units(full, partial) <= s.to_servings(full, partial));
        }
    }
}
