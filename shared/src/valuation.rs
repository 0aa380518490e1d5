//! Stock valuation and gross-profit arithmetic
//!
//! Pure reductions over stocktake lines. The backend services fetch rows
//! and delegate the math here so reports and tests share one definition.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::conversion::ConversionSpec;
use crate::models::{Category, StocktakeLine};

/// A stocktake line joined with its item's category and conversion spec,
/// ready for valuation.
#[derive(Debug, Clone)]
pub struct ValuedLine {
    pub category: Category,
    pub line: StocktakeLine,
    pub spec: ConversionSpec,
}

/// Per-category value totals for a stocktake. All values are priced at
/// each line's frozen valuation cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub category: Category,
    pub opening_value: Decimal,
    pub purchases_value: Decimal,
    pub expected_value: Decimal,
    pub counted_value: Decimal,
    pub variance_value: Decimal,
    pub item_count: i64,
}

impl CategoryTotals {
    fn new(category: Category) -> Self {
        Self {
            category,
            opening_value: Decimal::ZERO,
            purchases_value: Decimal::ZERO,
            expected_value: Decimal::ZERO,
            counted_value: Decimal::ZERO,
            variance_value: Decimal::ZERO,
            item_count: 0,
        }
    }
}

/// Reduce lines into per-category totals, optionally restricted to one
/// category. Output is ordered by category.
pub fn category_totals(lines: &[ValuedLine], category: Option<Category>) -> Vec<CategoryTotals> {
    let mut grouped: BTreeMap<Category, CategoryTotals> = BTreeMap::new();
    for valued in lines {
        if let Some(wanted) = category {
            if valued.category != wanted {
                continue;
            }
        }
        let totals = grouped
            .entry(valued.category)
            .or_insert_with(|| CategoryTotals::new(valued.category));
        let cost = valued.line.valuation_cost;
        totals.opening_value += valued.line.opening_qty * cost;
        totals.purchases_value += valued.line.purchases * cost;
        totals.expected_value += valued.line.expected_qty() * cost;
        totals.counted_value += valued.line.counted_qty(&valued.spec) * cost;
        totals.variance_value += valued.line.variance_value(&valued.spec);
        totals.item_count += 1;
    }
    grouped.into_values().collect()
}

/// Classic periodic-inventory cost of goods sold.
pub fn cogs(opening_value: Decimal, purchases_value: Decimal, closing_value: Decimal) -> Decimal {
    opening_value + purchases_value - closing_value
}

/// Gross profit percentage, or `None` when revenue is zero.
pub fn gross_profit_percent(revenue: Decimal, cogs: Decimal) -> Option<Decimal> {
    if revenue == Decimal::ZERO {
        return None;
    }
    Some((revenue - cogs) / revenue * Decimal::ONE_HUNDRED)
}

/// Gross-profit report for one stocktake or period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrossProfitReport {
    pub opening_value: Decimal,
    pub purchases_value: Decimal,
    pub closing_value: Decimal,
    pub cogs: Decimal,
    pub revenue: Decimal,
    pub gp_percent: Option<Decimal>,
}

impl GrossProfitReport {
    pub fn build(
        opening_value: Decimal,
        purchases_value: Decimal,
        closing_value: Decimal,
        revenue: Decimal,
    ) -> Self {
        let cogs = cogs(opening_value, purchases_value, closing_value);
        Self {
            opening_value,
            purchases_value,
            closing_value,
            cogs,
            revenue,
            gp_percent: gross_profit_percent(revenue, cogs),
        }
    }
}
