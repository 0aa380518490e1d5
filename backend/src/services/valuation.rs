//! Valuation and reporting service
//!
//! Aggregates stocktake lines into stock value, cost of goods sold and
//! gross-profit figures. All value math happens in the shared valuation
//! module at each line's frozen cost.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{Category, StocktakeLine};
use shared::valuation::{category_totals, CategoryTotals, GrossProfitReport, ValuedLine};

use crate::error::{AppError, AppResult};

/// Valuation service
#[derive(Clone)]
pub struct ValuationService {
    db: PgPool,
}

/// Per-line variance entry for the shrinkage report
#[derive(Debug, Clone, Serialize)]
pub struct LineVariance {
    pub item_id: Uuid,
    pub sku: String,
    pub name: String,
    pub category: Category,
    pub expected_qty: Decimal,
    pub counted_qty: Decimal,
    pub variance_qty: Decimal,
    pub variance_value: Decimal,
}

/// Row for line valuation queries
#[derive(Debug, FromRow)]
struct ValuationLineRow {
    id: Uuid,
    stocktake_id: Uuid,
    item_id: Uuid,
    opening_qty: Decimal,
    purchases: Decimal,
    sales: Decimal,
    waste: Decimal,
    transfers_in: Decimal,
    transfers_out: Decimal,
    adjustments: Decimal,
    counted_full_units: Decimal,
    counted_partial_units: Decimal,
    valuation_cost: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sku: String,
    name: String,
    category: String,
    subcategory: Option<String>,
    uom: Decimal,
    serving_size_ml: Option<Decimal>,
}

struct NamedValuedLine {
    valued: ValuedLine,
    sku: String,
    name: String,
}

impl ValuationService {
    /// Create a new ValuationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_valued_lines(&self, stocktake_id: Uuid) -> AppResult<Vec<NamedValuedLine>> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM stocktakes WHERE id = $1)")
                .bind(stocktake_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Stocktake".to_string()));
        }

        let rows = sqlx::query_as::<_, ValuationLineRow>(
            r#"
            SELECT sl.id, sl.stocktake_id, sl.item_id, sl.opening_qty, sl.purchases, sl.sales,
                   sl.waste, sl.transfers_in, sl.transfers_out, sl.adjustments,
                   sl.counted_full_units, sl.counted_partial_units, sl.valuation_cost,
                   sl.created_at, sl.updated_at,
                   i.sku, i.name, i.category, i.subcategory, i.uom, i.serving_size_ml
            FROM stocktake_lines sl
            JOIN items i ON i.id = sl.item_id
            WHERE sl.stocktake_id = $1
            ORDER BY i.category, i.sku
            "#,
        )
        .bind(stocktake_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let spec = super::conversion_spec(
                    &row.category,
                    row.subcategory.as_deref(),
                    row.uom,
                    row.serving_size_ml,
                )?;
                let category = Category::from_str(&row.category).ok_or_else(|| {
                    AppError::InternalError(anyhow!("unknown category {}", row.category))
                })?;
                Ok(NamedValuedLine {
                    sku: row.sku,
                    name: row.name,
                    valued: ValuedLine {
                        category,
                        spec,
                        line: StocktakeLine {
                            id: row.id,
                            stocktake_id: row.stocktake_id,
                            item_id: row.item_id,
                            opening_qty: row.opening_qty,
                            purchases: row.purchases,
                            sales: row.sales,
                            waste: row.waste,
                            transfers_in: row.transfers_in,
                            transfers_out: row.transfers_out,
                            adjustments: row.adjustments,
                            counted_full_units: row.counted_full_units,
                            counted_partial_units: row.counted_partial_units,
                            valuation_cost: row.valuation_cost,
                            created_at: row.created_at,
                            updated_at: row.updated_at,
                        },
                    },
                })
            })
            .collect()
    }

    /// Value totals per category, optionally restricted to one category.
    pub async fn category_totals(
        &self,
        stocktake_id: Uuid,
        category: Option<Category>,
    ) -> AppResult<Vec<CategoryTotals>> {
        let lines = self.fetch_valued_lines(stocktake_id).await?;
        let valued: Vec<ValuedLine> = lines.into_iter().map(|l| l.valued).collect();
        Ok(category_totals(&valued, category))
    }

    /// Per-line variance report sorted by absolute variance value, the
    /// shrinkage view.
    pub async fn variance_report(&self, stocktake_id: Uuid) -> AppResult<Vec<LineVariance>> {
        let lines = self.fetch_valued_lines(stocktake_id).await?;

        let mut report: Vec<LineVariance> = lines
            .into_iter()
            .map(|l| {
                let spec = &l.valued.spec;
                let line = &l.valued.line;
                LineVariance {
                    item_id: line.item_id,
                    sku: l.sku,
                    name: l.name,
                    category: l.valued.category,
                    expected_qty: line.expected_qty(),
                    counted_qty: line.counted_qty(spec),
                    variance_qty: line.variance_qty(spec),
                    variance_value: line.variance_value(spec),
                }
            })
            .collect();

        report.sort_by(|a, b| b.variance_value.abs().cmp(&a.variance_value.abs()));
        Ok(report)
    }

    /// Gross-profit report for a stocktake.
    ///
    /// COGS follows the periodic-inventory formula over the stocktake's
    /// lines; revenue comes from linked sales unless an override is
    /// supplied. `gp_percent` is absent when revenue is zero.
    pub async fn gross_profit(
        &self,
        stocktake_id: Uuid,
        revenue_override: Option<Decimal>,
    ) -> AppResult<GrossProfitReport> {
        let lines = self.fetch_valued_lines(stocktake_id).await?;

        let mut opening_value = Decimal::ZERO;
        let mut purchases_value = Decimal::ZERO;
        let mut closing_value = Decimal::ZERO;
        for l in &lines {
            let cost = l.valued.line.valuation_cost;
            opening_value += l.valued.line.opening_qty * cost;
            purchases_value += l.valued.line.purchases * cost;
            closing_value += l.valued.line.counted_qty(&l.valued.spec) * cost;
        }

        let revenue = match revenue_override {
            Some(amount) => amount,
            None => {
                sqlx::query_scalar::<_, Decimal>(
                    "SELECT COALESCE(SUM(total_amount), 0) FROM sales WHERE stocktake_id = $1",
                )
                .bind(stocktake_id)
                .fetch_one(&self.db)
                .await?
            }
        };

        Ok(GrossProfitReport::build(
            opening_value,
            purchases_value,
            closing_value,
            revenue,
        ))
    }

    /// Gross-profit report for a period, through its stocktake.
    pub async fn gross_profit_for_period(
        &self,
        period_id: Uuid,
        revenue_override: Option<Decimal>,
    ) -> AppResult<GrossProfitReport> {
        let stocktake_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM stocktakes WHERE period_id = $1",
        )
        .bind(period_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stocktake".to_string()))?;

        self.gross_profit(stocktake_id, revenue_override).await
    }
}
