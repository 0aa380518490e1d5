//! Unit conversion rules for beverage stock quantities
//!
//! Every product class counts stock in different physical units: draught in
//! kegs and pints, bottled beer in cases and loose bottles, spirits in
//! bottles and fractions, syrups in bottles and millilitres, bag-in-box in
//! boxes and litres. This module is the single source of truth for turning a
//! counted (full, partial) pair into a normalized serving quantity and back.
//!
//! The same numeric `uom` value means different things across categories
//! (pints per keg, bottles per case, millilitres per bottle, litres per box),
//! so conversion always dispatches on the resolved [`ConversionRule`] and
//! never infers meaning from magnitude.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Category, MineralsSubcategory};

/// Errors raised while resolving conversion parameters for an item.
///
/// Conversion itself is total for non-negative inputs; only building the
/// spec from item data can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("minerals items require a subcategory")]
    MissingSubcategory,

    #[error("subcategory is only valid for minerals items")]
    UnexpectedSubcategory,

    #[error("uom must be positive, got {0}")]
    InvalidUom(Decimal),

    #[error("serving size must be positive for this category")]
    MissingServingSize,
}

/// Closed set of conversion behaviours, selected once per item from its
/// category and subcategory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionRule {
    /// Kegs counted whole; the opened keg is measured in pints.
    /// `uom` = pints per keg.
    Draught,
    /// Cases counted whole; loose bottles counted individually.
    /// `uom` = bottles per case. Covers bottled beer, soft drinks, cordials.
    BottledLike,
    /// Bottles counted whole; the opened bottle is estimated as a 0-1
    /// fraction. `uom` = millilitres per bottle. Covers spirits and wine.
    BottleFractional,
    /// Bottles counted whole; the opened bottle is measured in millilitres.
    /// `uom` = millilitres per bottle. Covers syrups and bulk juices.
    SyrupLike,
    /// Cases counted whole; the partial is a loose bottle count whose
    /// millilitre fraction is ignored. `uom` = bottles per case.
    JuiceCase,
    /// Boxes counted whole; the opened box is measured in litres.
    /// `uom` = litres per box.
    BagInBox,
}

impl ConversionRule {
    /// Resolve the rule for a category/subcategory pair.
    pub fn for_category(
        category: Category,
        subcategory: Option<MineralsSubcategory>,
    ) -> Result<Self, ConversionError> {
        match (category, subcategory) {
            (Category::Minerals, Some(sub)) => Ok(match sub {
                MineralsSubcategory::SoftDrinks | MineralsSubcategory::Cordials => {
                    ConversionRule::BottledLike
                }
                MineralsSubcategory::Syrups | MineralsSubcategory::BulkJuices => {
                    ConversionRule::SyrupLike
                }
                MineralsSubcategory::Juices => ConversionRule::JuiceCase,
                MineralsSubcategory::BagInBox => ConversionRule::BagInBox,
            }),
            (Category::Minerals, None) => Err(ConversionError::MissingSubcategory),
            (_, Some(_)) => Err(ConversionError::UnexpectedSubcategory),
            (Category::Draught, None) => Ok(ConversionRule::Draught),
            (Category::Bottled, None) => Ok(ConversionRule::BottledLike),
            (Category::Spirits | Category::Wine, None) => Ok(ConversionRule::BottleFractional),
        }
    }

    /// Whether the partial unit represents an opened container (draught,
    /// spirits, wine, syrups, bag-in-box) rather than unopened loose stock
    /// (bottled beer, soft drinks, cordials, juices).
    pub fn partial_is_opened(&self) -> bool {
        !matches!(self, ConversionRule::BottledLike | ConversionRule::JuiceCase)
    }

    fn needs_serving_size(&self) -> bool {
        matches!(
            self,
            ConversionRule::BottleFractional | ConversionRule::SyrupLike | ConversionRule::BagInBox
        )
    }
}

/// Conversion parameters resolved for one item: the rule plus the item's
/// `uom` and serving size. Built once when the item is loaded and reused for
/// every calculation on that item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionSpec {
    rule: ConversionRule,
    uom: Decimal,
    serving_size_ml: Option<Decimal>,
}

impl ConversionSpec {
    pub fn new(
        rule: ConversionRule,
        uom: Decimal,
        serving_size_ml: Option<Decimal>,
    ) -> Result<Self, ConversionError> {
        if uom <= Decimal::ZERO {
            return Err(ConversionError::InvalidUom(uom));
        }
        if rule.needs_serving_size() {
            match serving_size_ml {
                Some(s) if s > Decimal::ZERO => {}
                _ => return Err(ConversionError::MissingServingSize),
            }
        }
        Ok(Self {
            rule,
            uom,
            serving_size_ml,
        })
    }

    pub fn rule(&self) -> ConversionRule {
        self.rule
    }

    pub fn uom(&self) -> Decimal {
        self.uom
    }

    fn serving_ml(&self) -> Decimal {
        // new() guarantees Some for the rules that read this
        self.serving_size_ml.unwrap_or(Decimal::ONE)
    }

    /// Servings contained in one unopened storage unit (keg, case, bottle,
    /// box). Also the divisor from `unit_cost` to cost per serving.
    pub fn servings_per_full_unit(&self) -> Decimal {
        match self.rule {
            ConversionRule::Draught
            | ConversionRule::BottledLike
            | ConversionRule::JuiceCase => self.uom,
            ConversionRule::BottleFractional | ConversionRule::SyrupLike => {
                self.uom / self.serving_ml()
            }
            ConversionRule::BagInBox => self.uom * Decimal::ONE_THOUSAND / self.serving_ml(),
        }
    }

    /// Normalize a counted (full, partial) pair into servings.
    ///
    /// Total for non-negative inputs; the interpretation of `partial` is
    /// rule-specific (pints, loose bottles, bottle fraction, millilitres,
    /// bottle-count, litres).
    pub fn to_servings(&self, full: Decimal, partial: Decimal) -> Decimal {
        match self.rule {
            ConversionRule::Draught | ConversionRule::BottledLike => full * self.uom + partial,
            ConversionRule::BottleFractional => (full + partial) * self.servings_per_full_unit(),
            ConversionRule::SyrupLike => (full * self.uom + partial) / self.serving_ml(),
            ConversionRule::JuiceCase => full * self.uom + partial.floor(),
            ConversionRule::BagInBox => {
                (full * self.uom + partial) * Decimal::ONE_THOUSAND / self.serving_ml()
            }
        }
    }

    /// Invert a serving quantity back into (full, partial) display units.
    ///
    /// For legal counted inputs (partial within its rule-specific range)
    /// this is the exact inverse of [`Self::to_servings`].
    pub fn to_display(&self, servings: Decimal) -> (Decimal, Decimal) {
        match self.rule {
            ConversionRule::Draught | ConversionRule::BottledLike | ConversionRule::JuiceCase => {
                let full = (servings / self.uom).floor();
                (full, servings - full * self.uom)
            }
            ConversionRule::BottleFractional => {
                let bottles = servings / self.servings_per_full_unit();
                let full = bottles.floor();
                (full, bottles - full)
            }
            ConversionRule::SyrupLike => {
                let total_ml = servings * self.serving_ml();
                let full = (total_ml / self.uom).floor();
                (full, total_ml - full * self.uom)
            }
            ConversionRule::BagInBox => {
                let total_litres = servings * self.serving_ml() / Decimal::ONE_THOUSAND;
                let full = (total_litres / self.uom).floor();
                (full, total_litres - full * self.uom)
            }
        }
    }

    /// Count of unopened stock units.
    ///
    /// Categories whose partial is an opened container report only the full
    /// count (kegs, bottles, boxes). Categories whose partial is unopened
    /// loose stock report the total discrete unit count, so a case-based
    /// item reports bottles: `full * uom + partial`.
    pub fn unopened_units(&self, full: Decimal, partial: Decimal) -> Decimal {
        match self.rule {
            ConversionRule::Draught
            | ConversionRule::BottleFractional
            | ConversionRule::SyrupLike
            | ConversionRule::BagInBox => full,
            ConversionRule::BottledLike => full * self.uom + partial,
            ConversionRule::JuiceCase => full * self.uom + partial.floor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn spec(rule: ConversionRule, uom: &str, serving: Option<&str>) -> ConversionSpec {
        ConversionSpec::new(rule, dec(uom), serving.map(dec)).unwrap()
    }

    #[test]
    fn draught_counts_kegs_and_pints() {
        let s = spec(ConversionRule::Draught, "88", None);
        assert_eq!(s.to_servings(dec("2"), dec("30.5")), dec("206.5"));
        assert_eq!(s.unopened_units(dec("2"), dec("30.5")), dec("2"));
    }

    #[test]
    fn bottled_counts_cases_and_loose_bottles() {
        let s = spec(ConversionRule::BottledLike, "12", None);
        // worked example: 1 case + 8 loose = 20 bottles
        assert_eq!(s.to_servings(dec("1"), dec("8")), dec("20"));
        // loose bottles are unopened stock
        assert_eq!(s.unopened_units(dec("1"), dec("8")), dec("20"));
    }

    #[test]
    fn spirits_fractional_bottle() {
        // 700ml bottle, 35ml measure -> 20 servings per bottle
        let s = spec(ConversionRule::BottleFractional, "700", Some("35"));
        assert_eq!(s.servings_per_full_unit(), dec("20"));
        assert_eq!(s.to_servings(dec("3"), dec("0.5")), dec("70.0"));
        assert_eq!(s.unopened_units(dec("3"), dec("0.5")), dec("3"));
    }

    #[test]
    fn syrup_measured_in_millilitres() {
        // 750ml bottle poured in 25ml servings
        let s = spec(ConversionRule::SyrupLike, "750", Some("25"));
        assert_eq!(s.to_servings(dec("2"), dec("250")), dec("70"));
        assert_eq!(s.unopened_units(dec("2"), dec("250")), dec("2"));
    }

    #[test]
    fn juice_case_ignores_ml_fraction() {
        let s = spec(ConversionRule::JuiceCase, "24", None);
        // 3 loose bottles plus 250ml in an opened one -> fraction dropped
        assert_eq!(s.to_servings(dec("1"), dec("3.250")), dec("27"));
        assert_eq!(s.unopened_units(dec("1"), dec("3.250")), dec("27"));
    }

    #[test]
    fn bag_in_box_worked_example() {
        // 18 litre box, 0.2 litre serving
        let s = spec(ConversionRule::BagInBox, "18", Some("200"));
        assert_eq!(s.to_servings(dec("2"), dec("0.5")), dec("182.5"));
        assert_eq!(s.unopened_units(dec("2"), dec("0.5")), dec("2"));
    }

    #[test]
    fn display_round_trips() {
        let cases = [
            (spec(ConversionRule::Draught, "88", None), dec("2"), dec("30.5")),
            (spec(ConversionRule::BottledLike, "12", None), dec("1"), dec("8")),
            (
                spec(ConversionRule::BottleFractional, "700", Some("35")),
                dec("3"),
                dec("0.5"),
            ),
            (
                spec(ConversionRule::SyrupLike, "750", Some("25")),
                dec("2"),
                dec("250"),
            ),
            (spec(ConversionRule::JuiceCase, "24", None), dec("1"), dec("3")),
            (
                spec(ConversionRule::BagInBox, "18", Some("200")),
                dec("2"),
                dec("0.5"),
            ),
        ];
        for (s, full, partial) in cases {
            let (f, p) = s.to_display(s.to_servings(full, partial));
            assert_eq!((f, p), (full, partial), "rule {:?}", s.rule());
        }
    }

    #[test]
    fn rule_resolution_covers_the_table() {
        use crate::models::Category::*;
        use crate::models::MineralsSubcategory::*;
        assert_eq!(
            ConversionRule::for_category(Draught, None).unwrap(),
            ConversionRule::Draught
        );
        assert_eq!(
            ConversionRule::for_category(Bottled, None).unwrap(),
            ConversionRule::BottledLike
        );
        assert_eq!(
            ConversionRule::for_category(Spirits, None).unwrap(),
            ConversionRule::BottleFractional
        );
        assert_eq!(
            ConversionRule::for_category(Wine, None).unwrap(),
            ConversionRule::BottleFractional
        );
        assert_eq!(
            ConversionRule::for_category(Minerals, Some(SoftDrinks)).unwrap(),
            ConversionRule::BottledLike
        );
        assert_eq!(
            ConversionRule::for_category(Minerals, Some(Cordials)).unwrap(),
            ConversionRule::BottledLike
        );
        assert_eq!(
            ConversionRule::for_category(Minerals, Some(Syrups)).unwrap(),
            ConversionRule::SyrupLike
        );
        assert_eq!(
            ConversionRule::for_category(Minerals, Some(BulkJuices)).unwrap(),
            ConversionRule::SyrupLike
        );
        assert_eq!(
            ConversionRule::for_category(Minerals, Some(Juices)).unwrap(),
            ConversionRule::JuiceCase
        );
        assert_eq!(
            ConversionRule::for_category(Minerals, Some(BagInBox)).unwrap(),
            ConversionRule::BagInBox
        );
    }

    #[test]
    fn rule_resolution_rejects_bad_pairs() {
        assert_eq!(
            ConversionRule::for_category(Category::Minerals, None),
            Err(ConversionError::MissingSubcategory)
        );
        assert_eq!(
            ConversionRule::for_category(
                Category::Draught,
                Some(MineralsSubcategory::Syrups)
            ),
            Err(ConversionError::UnexpectedSubcategory)
        );
    }

    #[test]
    fn spec_construction_validates_parameters() {
        assert!(ConversionSpec::new(ConversionRule::Draught, Decimal::ZERO, None).is_err());
        assert!(
            ConversionSpec::new(ConversionRule::SyrupLike, dec("750"), None).is_err()
        );
        assert!(
            ConversionSpec::new(ConversionRule::BagInBox, dec("18"), Some(Decimal::ZERO)).is_err()
        );
    }
}
