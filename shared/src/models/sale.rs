//! Revenue-side sale records
//!
//! Sales feed COGS and gross-profit reporting. They are not part of the
//! physical movement ledger and may exist with or without a stocktake link.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub item_id: Uuid,
    pub stocktake_id: Option<Uuid>,
    /// Quantity sold, in servings
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub sold_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}
