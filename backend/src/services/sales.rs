//! Revenue-side sales recording
//!
//! Sales feed gross-profit reporting only; they never touch the physical
//! movement ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::Sale;
use shared::types::DateRange;

use crate::error::{AppError, AppResult};

/// Sales service
#[derive(Clone)]
pub struct SalesService {
    db: PgPool,
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct RecordSaleInput {
    pub item_id: Uuid,
    pub stocktake_id: Option<Uuid>,
    /// Quantity sold, in servings
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub sold_at: Option<NaiveDate>,
}

/// Row for sale queries
#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    hotel_id: Uuid,
    item_id: Uuid,
    stocktake_id: Option<Uuid>,
    quantity: Decimal,
    unit_price: Decimal,
    total_amount: Decimal,
    sold_at: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            hotel_id: row.hotel_id,
            item_id: row.item_id,
            stocktake_id: row.stocktake_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_amount: row.total_amount,
            sold_at: row.sold_at,
            created_at: row.created_at,
        }
    }
}

const SALE_COLUMNS: &str =
    "id, hotel_id, item_id, stocktake_id, quantity, unit_price, total_amount, sold_at, created_at";

impl SalesService {
    /// Create a new SalesService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale, with or without a stocktake link.
    pub async fn record_sale(&self, hotel_id: Uuid, input: RecordSaleInput) -> AppResult<Sale> {
        if input.quantity <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
            });
        }
        if input.unit_price < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "unit_price".to_string(),
                message: "Unit price cannot be negative".to_string(),
            });
        }

        let item_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM items WHERE id = $1 AND hotel_id = $2)",
        )
        .bind(input.item_id)
        .bind(hotel_id)
        .fetch_one(&self.db)
        .await?;
        if !item_exists {
            return Err(AppError::NotFound("Item".to_string()));
        }

        if let Some(stocktake_id) = input.stocktake_id {
            let stocktake_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM stocktakes WHERE id = $1 AND hotel_id = $2)",
            )
            .bind(stocktake_id)
            .bind(hotel_id)
            .fetch_one(&self.db)
            .await?;
            if !stocktake_exists {
                return Err(AppError::NotFound("Stocktake".to_string()));
            }
        }

        let total_amount = input.quantity * input.unit_price;
        let sold_at = input.sold_at.unwrap_or_else(|| Utc::now().date_naive());

        let row = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            INSERT INTO sales (hotel_id, item_id, stocktake_id, quantity, unit_price, total_amount, sold_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SALE_COLUMNS}
            "#,
        ))
        .bind(hotel_id)
        .bind(input.item_id)
        .bind(input.stocktake_id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(total_amount)
        .bind(sold_at)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// List sales linked to a stocktake
    pub async fn sales_for_stocktake(&self, stocktake_id: Uuid) -> AppResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE stocktake_id = $1
            ORDER BY sold_at DESC, created_at DESC
            "#,
        ))
        .bind(stocktake_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// Total revenue for a hotel over a date range
    pub async fn revenue_between(&self, hotel_id: Uuid, range: DateRange) -> AppResult<Decimal> {
        let revenue = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(total_amount), 0)
            FROM sales
            WHERE hotel_id = $1 AND sold_at BETWEEN $2 AND $3
            "#,
        )
        .bind(hotel_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        Ok(revenue)
    }
}
