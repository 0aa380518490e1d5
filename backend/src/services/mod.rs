//! Business logic services

use anyhow::anyhow;
use rust_decimal::Decimal;

use shared::conversion::{ConversionRule, ConversionSpec};
use shared::models::{Category, MineralsSubcategory};

use crate::error::{AppError, AppResult};

pub mod catalog;
pub mod ledger;
pub mod period;
pub mod sales;
pub mod stocktake;
pub mod valuation;

pub use catalog::CatalogService;
pub use ledger::LedgerService;
pub use period::PeriodService;
pub use sales::SalesService;
pub use stocktake::StocktakeService;
pub use valuation::ValuationService;

/// Build an item's conversion spec from raw database columns.
pub(crate) fn conversion_spec(
    category: &str,
    subcategory: Option<&str>,
    uom: Decimal,
    serving_size_ml: Option<Decimal>,
) -> AppResult<ConversionSpec> {
    let category = Category::from_str(category)
        .ok_or_else(|| AppError::InternalError(anyhow!("unknown category {}", category)))?;
    let subcategory = match subcategory {
        Some(s) => Some(
            MineralsSubcategory::from_str(s)
                .ok_or_else(|| AppError::InternalError(anyhow!("unknown subcategory {}", s)))?,
        ),
        None => None,
    };
    let rule = ConversionRule::for_category(category, subcategory)?;
    Ok(ConversionSpec::new(rule, uom, serving_size_ml)?)
}
