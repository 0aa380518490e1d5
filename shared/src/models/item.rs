//! Stock item master records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversion::{ConversionError, ConversionRule, ConversionSpec};
use crate::models::{Category, MineralsSubcategory};

/// A stock item owned by a hotel.
///
/// `uom` is a category-dependent conversion factor (pints per keg, bottles
/// per case, millilitres per bottle, litres per box) and must only be
/// interpreted through the item's [`ConversionSpec`]. The live on-hand
/// balance is kept in category-specific storage units; items are
/// deactivated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub hotel_id: Uuid,
    /// Unique per hotel
    pub sku: String,
    pub name: String,
    pub category: Category,
    pub subcategory: Option<MineralsSubcategory>,
    pub uom: Decimal,
    /// Serving size in millilitres; required for spirits, wine, syrups,
    /// bulk juices and bag-in-box.
    pub serving_size_ml: Option<Decimal>,
    /// Cost of one storage unit (keg, case, bottle, box)
    pub unit_cost: Decimal,
    pub current_full_units: Decimal,
    pub current_partial_units: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Resolve the conversion parameters for this item. Callers load this
    /// once per item and reuse it for every calculation.
    pub fn conversion(&self) -> Result<ConversionSpec, ConversionError> {
        let rule = ConversionRule::for_category(self.category, self.subcategory)?;
        ConversionSpec::new(rule, self.uom, self.serving_size_ml)
    }

    /// Cost of one serving derived from the storage-unit cost.
    pub fn cost_per_serving(&self) -> Result<Decimal, ConversionError> {
        Ok(self.unit_cost / self.conversion()?.servings_per_full_unit())
    }

    /// Live on-hand balance normalized to servings.
    pub fn on_hand_servings(&self) -> Result<Decimal, ConversionError> {
        let spec = self.conversion()?;
        Ok(spec.to_servings(self.current_full_units, self.current_partial_units))
    }
}
