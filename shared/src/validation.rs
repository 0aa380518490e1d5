//! Validation utilities for the Bar Stock Valuation Platform
//!
//! Pure checks on counted quantities, item parameters and period ranges.
//! The conversion module owns spec construction; these helpers guard user
//! input before it reaches the engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::conversion::{ConversionRule, ConversionSpec};

// ============================================================================
// Item Parameter Validations
// ============================================================================

/// Validate SKU format (3-20 chars, uppercase alphanumeric plus dashes)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 3 {
        return Err("SKU must be at least 3 characters");
    }
    if sku.len() > 20 {
        return Err("SKU must be at most 20 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("SKU must be uppercase alphanumeric with dashes");
    }
    Ok(())
}

/// Validate a unit-of-measure conversion factor
pub fn validate_uom(uom: Decimal) -> Result<(), &'static str> {
    if uom <= Decimal::ZERO {
        return Err("uom must be positive");
    }
    Ok(())
}

/// Validate a storage-unit cost
pub fn validate_unit_cost(cost: Decimal) -> Result<(), &'static str> {
    if cost < Decimal::ZERO {
        return Err("unit cost cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Count Validations
// ============================================================================

/// Validate a counted (full, partial) pair against the item's rule.
///
/// The partial's legal range depends on what it measures: pints left in an
/// opened keg, loose bottles short of a case, a 0-1 bottle fraction,
/// millilitres short of a bottle, or litres short of a box.
pub fn validate_counted_units(
    spec: &ConversionSpec,
    full: Decimal,
    partial: Decimal,
) -> Result<(), &'static str> {
    if full < Decimal::ZERO || full.fract() != Decimal::ZERO {
        return Err("full units must be a non-negative whole number");
    }
    if partial < Decimal::ZERO {
        return Err("partial units cannot be negative");
    }
    match spec.rule() {
        ConversionRule::BottleFractional => {
            if partial >= Decimal::ONE {
                return Err("partial bottle fraction must be below 1");
            }
        }
        ConversionRule::JuiceCase => {
            if partial.floor() >= spec.uom() {
                return Err("loose bottles must be fewer than a full case");
            }
        }
        ConversionRule::Draught
        | ConversionRule::BottledLike
        | ConversionRule::SyrupLike
        | ConversionRule::BagInBox => {
            if partial >= spec.uom() {
                return Err("partial units must be below one full unit");
            }
        }
    }
    Ok(())
}

// ============================================================================
// Period Validations
// ============================================================================

/// Validate a period date range
pub fn validate_period_range(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if end < start {
        return Err("period end date cannot precede its start date");
    }
    Ok(())
}
