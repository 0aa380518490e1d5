//! Period and snapshot management
//!
//! Owns the period lifecycle and the closing-stock snapshot per item per
//! period. A period closes exactly once, and only after its stocktake is
//! approved; from then on its snapshots are the immutable opening
//! balances of the next period.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::conversion::ConversionSpec;
use shared::models::{closing_stock_value, Period, StockSnapshot, StocktakeStatus};
use shared::types::PeriodContext;
use shared::validation::validate_period_range;

use crate::error::{AppError, AppResult};

/// Period service managing the period lifecycle and stock snapshots
#[derive(Clone)]
pub struct PeriodService {
    db: PgPool,
}

/// Row for snapshot queries
#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: Uuid,
    hotel_id: Uuid,
    item_id: Uuid,
    period_id: Uuid,
    closing_full_units: Decimal,
    closing_partial_units: Decimal,
    unit_cost: Decimal,
    cost_per_serving: Decimal,
    closing_stock_value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SnapshotRow> for StockSnapshot {
    fn from(row: SnapshotRow) -> Self {
        StockSnapshot {
            id: row.id,
            hotel_id: row.hotel_id,
            item_id: row.item_id,
            period_id: row.period_id,
            closing_full_units: row.closing_full_units,
            closing_partial_units: row.closing_partial_units,
            unit_cost: row.unit_cost,
            cost_per_serving: row.cost_per_serving,
            closing_stock_value: row.closing_stock_value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SNAPSHOT_COLUMNS: &str = "id, hotel_id, item_id, period_id, closing_full_units, \
                                closing_partial_units, unit_cost, cost_per_serving, \
                                closing_stock_value, created_at, updated_at";

impl PeriodService {
    /// Create a new PeriodService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an open period. Overlapping an existing period for the hotel
    /// is rejected.
    pub async fn create_period(
        &self,
        hotel_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Period> {
        validate_period_range(start_date, end_date).map_err(|msg| AppError::Validation {
            field: "end_date".to_string(),
            message: msg.to_string(),
        })?;

        let overlaps = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM periods
                WHERE hotel_id = $1 AND start_date <= $3 AND $2 <= end_date
            )
            "#,
        )
        .bind(hotel_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.db)
        .await?;

        if overlaps {
            return Err(AppError::ValidationError(
                "period overlaps an existing period for this hotel".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, (Uuid, Uuid, NaiveDate, NaiveDate, bool, DateTime<Utc>)>(
            r#"
            INSERT INTO periods (hotel_id, start_date, end_date)
            VALUES ($1, $2, $3)
            RETURNING id, hotel_id, start_date, end_date, is_closed, created_at
            "#,
        )
        .bind(hotel_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.db)
        .await?;

        Ok(Period {
            id: row.0,
            hotel_id: row.1,
            start_date: row.2,
            end_date: row.3,
            is_closed: row.4,
            created_at: row.5,
        })
    }

    /// Get a period by ID
    pub async fn get_period(&self, period_id: Uuid) -> AppResult<Period> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, NaiveDate, NaiveDate, bool, DateTime<Utc>)>(
            "SELECT id, hotel_id, start_date, end_date, is_closed, created_at FROM periods WHERE id = $1",
        )
        .bind(period_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Period".to_string()))?;

        Ok(Period {
            id: row.0,
            hotel_id: row.1,
            start_date: row.2,
            end_date: row.3,
            is_closed: row.4,
            created_at: row.5,
        })
    }

    /// List periods for a hotel, newest first
    pub async fn list_periods(&self, hotel_id: Uuid) -> AppResult<Vec<Period>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, NaiveDate, NaiveDate, bool, DateTime<Utc>)>(
            r#"
            SELECT id, hotel_id, start_date, end_date, is_closed, created_at
            FROM periods
            WHERE hotel_id = $1
            ORDER BY start_date DESC
            "#,
        )
        .bind(hotel_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Period {
                id: row.0,
                hotel_id: row.1,
                start_date: row.2,
                end_date: row.3,
                is_closed: row.4,
                created_at: row.5,
            })
            .collect())
    }

    /// Resolve the explicit context passed into ledger and stocktake
    /// operations.
    pub async fn context_for(&self, period_id: Uuid) -> AppResult<PeriodContext> {
        Ok(self.get_period(period_id).await?.context())
    }

    /// Close a period. Requires an approved stocktake; closing is terminal.
    pub async fn close_period(&self, period_id: Uuid) -> AppResult<Period> {
        let period = self.get_period(period_id).await?;
        if period.is_closed {
            return Err(AppError::InvalidState(
                "period is already closed".to_string(),
            ));
        }

        let has_approved_stocktake = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stocktakes WHERE period_id = $1 AND status = $2)",
        )
        .bind(period_id)
        .bind(StocktakeStatus::Approved.as_str())
        .fetch_one(&self.db)
        .await?;

        if !has_approved_stocktake {
            return Err(AppError::InvalidState(
                "period cannot close without an approved stocktake".to_string(),
            ));
        }

        sqlx::query("UPDATE periods SET is_closed = TRUE WHERE id = $1")
            .bind(period_id)
            .execute(&self.db)
            .await?;

        tracing::info!(period_id = %period_id, "period closed");

        self.get_period(period_id).await
    }

    /// Create or update the unique snapshot row for (hotel, item, period).
    ///
    /// `closing_stock_value` is recomputed from the counted units through
    /// the item's conversion rule at the frozen serving cost. Calling this
    /// twice with the same inputs leaves a single unchanged row.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_snapshot(
        &self,
        hotel_id: Uuid,
        item_id: Uuid,
        period_id: Uuid,
        closing_full: Decimal,
        closing_partial: Decimal,
        unit_cost: Decimal,
        cost_per_serving: Decimal,
        spec: &ConversionSpec,
    ) -> AppResult<StockSnapshot> {
        let closing_servings = spec.to_servings(closing_full, closing_partial);
        let stock_value = closing_stock_value(closing_servings, cost_per_serving);

        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            r#"
            INSERT INTO stock_snapshots (hotel_id, item_id, period_id, closing_full_units,
                                         closing_partial_units, unit_cost, cost_per_serving,
                                         closing_stock_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (hotel_id, item_id, period_id) DO UPDATE
            SET closing_full_units = EXCLUDED.closing_full_units,
                closing_partial_units = EXCLUDED.closing_partial_units,
                unit_cost = EXCLUDED.unit_cost,
                cost_per_serving = EXCLUDED.cost_per_serving,
                closing_stock_value = EXCLUDED.closing_stock_value,
                updated_at = NOW()
            RETURNING {SNAPSHOT_COLUMNS}
            "#,
        ))
        .bind(hotel_id)
        .bind(item_id)
        .bind(period_id)
        .bind(closing_full)
        .bind(closing_partial)
        .bind(unit_cost)
        .bind(cost_per_serving)
        .bind(stock_value)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Get the snapshot for an item in a period
    pub async fn get_snapshot(
        &self,
        hotel_id: Uuid,
        item_id: Uuid,
        period_id: Uuid,
    ) -> AppResult<StockSnapshot> {
        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            r#"
            SELECT {SNAPSHOT_COLUMNS}
            FROM stock_snapshots
            WHERE hotel_id = $1 AND item_id = $2 AND period_id = $3
            "#,
        ))
        .bind(hotel_id)
        .bind(item_id)
        .bind(period_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Snapshot".to_string()))?;

        Ok(row.into())
    }

    /// Opening balance for an item entering a period: the closing servings
    /// of the most recent closed period before `period_start`, zero when
    /// the item has no history.
    pub async fn opening_for(
        &self,
        hotel_id: Uuid,
        item_id: Uuid,
        period_start: NaiveDate,
        spec: &ConversionSpec,
    ) -> AppResult<Decimal> {
        let row = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT s.closing_full_units, s.closing_partial_units
            FROM stock_snapshots s
            JOIN periods p ON p.id = s.period_id
            WHERE s.hotel_id = $1 AND s.item_id = $2
              AND p.is_closed AND p.end_date < $3
            ORDER BY p.end_date DESC
            LIMIT 1
            "#,
        )
        .bind(hotel_id)
        .bind(item_id)
        .bind(period_start)
        .fetch_optional(&self.db)
        .await?;

        Ok(match row {
            Some((full, partial)) => spec.to_servings(full, partial),
            None => Decimal::ZERO,
        })
    }
}
