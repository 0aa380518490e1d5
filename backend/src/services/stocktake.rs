//! Stocktake engine
//!
//! Orchestrates a count cycle: draft creation with lines seeded from the
//! prior period's closing balances, count entry, in-cycle movement
//! recording, and the atomic approval that posts variance adjustments to
//! the ledger and writes closing snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{
    signed_quantity, ApprovalOutcome, MovementAggregates, MovementType, SnapshotWarning,
    Stocktake, StocktakeLine, StocktakeStatus,
};
use shared::types::PeriodContext;
use shared::validation::validate_counted_units;

use crate::error::{AppError, AppResult};

/// Stocktake service driving the count lifecycle
#[derive(Clone)]
pub struct StocktakeService {
    db: PgPool,
}

/// Input for recording a movement against a stocktake line
#[derive(Debug, Deserialize)]
pub struct LineMovementInput {
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// A stocktake with its lines
#[derive(Debug, Clone, Serialize)]
pub struct StocktakeWithLines {
    pub stocktake: Stocktake,
    pub lines: Vec<StocktakeLine>,
}

/// Row for stocktake queries
#[derive(Debug, FromRow)]
struct StocktakeRow {
    id: Uuid,
    hotel_id: Uuid,
    period_id: Option<Uuid>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StocktakeRow {
    fn into_stocktake(self) -> AppResult<Stocktake> {
        let status = StocktakeStatus::from_str(&self.status).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("unknown stocktake status {}", self.status))
        })?;
        Ok(Stocktake {
            id: self.id,
            hotel_id: self.hotel_id,
            period_id: self.period_id,
            start_date: self.start_date,
            end_date: self.end_date,
            status,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row for line queries
#[derive(Debug, FromRow)]
struct LineRow {
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
}

impl From<LineRow> for StocktakeLine {
    fn from(row: LineRow) -> Self {
        StocktakeLine {
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
        }
    }
}

/// Row for approval: a line joined with the item fields needed for
/// conversion and snapshots
#[derive(Debug, FromRow)]
struct ApprovalLineRow {
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
    category: String,
    subcategory: Option<String>,
    uom: Decimal,
    serving_size_ml: Option<Decimal>,
}

const STOCKTAKE_COLUMNS: &str = "id, hotel_id, period_id, start_date, end_date, status, \
                                 approved_by, approved_at, created_at, updated_at";

const LINE_COLUMNS: &str = "id, stocktake_id, item_id, opening_qty, purchases, sales, waste, \
                            transfers_in, transfers_out, adjustments, counted_full_units, \
                            counted_partial_units, valuation_cost, created_at, updated_at";

impl StocktakeService {
    /// Create a new StocktakeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a draft stocktake for a period, seeding one line per active
    /// item with its opening balance and frozen serving cost.
    pub async fn create(&self, ctx: &PeriodContext) -> AppResult<StocktakeWithLines> {
        if ctx.is_closed {
            return Err(AppError::InvalidState(
                "cannot create a stocktake for a closed period".to_string(),
            ));
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stocktakes WHERE hotel_id = $1 AND period_id = $2)",
        )
        .bind(ctx.hotel_id)
        .bind(ctx.period_id)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("stocktake".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let stocktake_row = sqlx::query_as::<_, StocktakeRow>(&format!(
            r#"
            INSERT INTO stocktakes (hotel_id, period_id, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {STOCKTAKE_COLUMNS}
            "#,
        ))
        .bind(ctx.hotel_id)
        .bind(ctx.period_id)
        .bind(ctx.start_date)
        .bind(ctx.end_date)
        .bind(StocktakeStatus::Draft.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let items = sqlx::query_as::<_, (Uuid, String, Option<String>, Decimal, Option<Decimal>, Decimal)>(
            r#"
            SELECT id, category, subcategory, uom, serving_size_ml, unit_cost
            FROM items
            WHERE hotel_id = $1 AND is_active
            ORDER BY category, sku
            "#,
        )
        .bind(ctx.hotel_id)
        .fetch_all(&mut *tx)
        .await?;

        for (item_id, category, subcategory, uom, serving_size_ml, unit_cost) in items {
            let spec = super::conversion_spec(&category, subcategory.as_deref(), uom, serving_size_ml)?;
            let valuation_cost = unit_cost / spec.servings_per_full_unit();
            let opening_qty =
                Self::opening_in_tx(&mut tx, ctx.hotel_id, item_id, ctx.start_date, &spec).await?;

            sqlx::query(
                r#"
                INSERT INTO stocktake_lines (stocktake_id, item_id, opening_qty, valuation_cost)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(stocktake_row.id)
            .bind(item_id)
            .bind(opening_qty)
            .bind(valuation_cost)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(stocktake_id = %stocktake_row.id, "stocktake created");

        self.get_stocktake_with_lines(stocktake_row.id).await
    }

    /// Opening balance lookup usable inside the seeding transaction.
    async fn opening_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        hotel_id: Uuid,
        item_id: Uuid,
        period_start: NaiveDate,
        spec: &shared::conversion::ConversionSpec,
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
        .fetch_optional(&mut **tx)
        .await?;

        Ok(match row {
            Some((full, partial)) => spec.to_servings(full, partial),
            None => Decimal::ZERO,
        })
    }

    /// Get a stocktake by ID
    pub async fn get_stocktake(&self, stocktake_id: Uuid) -> AppResult<Stocktake> {
        let row = sqlx::query_as::<_, StocktakeRow>(&format!(
            "SELECT {STOCKTAKE_COLUMNS} FROM stocktakes WHERE id = $1",
        ))
        .bind(stocktake_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stocktake".to_string()))?;

        row.into_stocktake()
    }

    /// Get the stocktake for a period
    pub async fn get_stocktake_for_period(&self, period_id: Uuid) -> AppResult<Stocktake> {
        let row = sqlx::query_as::<_, StocktakeRow>(&format!(
            "SELECT {STOCKTAKE_COLUMNS} FROM stocktakes WHERE period_id = $1",
        ))
        .bind(period_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stocktake".to_string()))?;

        row.into_stocktake()
    }

    /// Get a stocktake with all of its lines
    pub async fn get_stocktake_with_lines(
        &self,
        stocktake_id: Uuid,
    ) -> AppResult<StocktakeWithLines> {
        let stocktake = self.get_stocktake(stocktake_id).await?;

        let rows = sqlx::query_as::<_, LineRow>(&format!(
            r#"
            SELECT {LINE_COLUMNS}
            FROM stocktake_lines
            WHERE stocktake_id = $1
            ORDER BY created_at
            "#,
        ))
        .bind(stocktake_id)
        .fetch_all(&self.db)
        .await?;

        Ok(StocktakeWithLines {
            stocktake,
            lines: rows.into_iter().map(StocktakeLine::from).collect(),
        })
    }

    /// Store a physical count on a line.
    pub async fn set_counted(
        &self,
        stocktake_id: Uuid,
        line_id: Uuid,
        full: Decimal,
        partial: Decimal,
    ) -> AppResult<StocktakeLine> {
        let stocktake = self.get_stocktake(stocktake_id).await?;
        if stocktake.status == StocktakeStatus::Approved {
            return Err(AppError::LockedStocktake(
                "counted values cannot change after approval".to_string(),
            ));
        }

        let item = sqlx::query_as::<_, (String, Option<String>, Decimal, Option<Decimal>)>(
            r#"
            SELECT i.category, i.subcategory, i.uom, i.serving_size_ml
            FROM stocktake_lines sl
            JOIN items i ON i.id = sl.item_id
            WHERE sl.id = $1 AND sl.stocktake_id = $2
            "#,
        )
        .bind(line_id)
        .bind(stocktake_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stocktake line".to_string()))?;

        let spec = super::conversion_spec(&item.0, item.1.as_deref(), item.2, item.3)?;
        validate_counted_units(&spec, full, partial).map_err(|msg| AppError::Validation {
            field: "counted_units".to_string(),
            message: msg.to_string(),
        })?;

        let row = sqlx::query_as::<_, LineRow>(&format!(
            r#"
            UPDATE stocktake_lines
            SET counted_full_units = $1, counted_partial_units = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {LINE_COLUMNS}
            "#,
        ))
        .bind(full)
        .bind(partial)
        .bind(line_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Record a movement for a line's item and refresh the line's cached
    /// aggregates from the ledger.
    ///
    /// The line row is locked for the whole read-aggregate-then-write
    /// sequence so near-simultaneous movements on the same line serialize.
    pub async fn add_movement(
        &self,
        stocktake_id: Uuid,
        line_id: Uuid,
        input: LineMovementInput,
        recorded_by: Uuid,
    ) -> AppResult<StocktakeLine> {
        let stocktake = self.get_stocktake(stocktake_id).await?;
        if stocktake.status == StocktakeStatus::Approved {
            return Err(AppError::LockedStocktake(
                "movements cannot be added after approval".to_string(),
            ));
        }
        let period_id = stocktake.period_id.ok_or_else(|| {
            AppError::MissingPeriod(format!(
                "stocktake {} has no period; record the movement once a period covers {}..{}",
                stocktake.id, stocktake.start_date, stocktake.end_date
            ))
        })?;

        let period_closed =
            sqlx::query_scalar::<_, bool>("SELECT is_closed FROM periods WHERE id = $1")
                .bind(period_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Period".to_string()))?;
        if period_closed {
            return Err(AppError::ValidationError(
                "cannot record movements in a closed period".to_string(),
            ));
        }

        let signed = signed_quantity(input.movement_type, input.quantity).map_err(|msg| {
            AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
            }
        })?;

        let mut tx = self.db.begin().await?;

        let line = sqlx::query_as::<_, (Uuid,)>(
            "SELECT item_id FROM stocktake_lines WHERE id = $1 AND stocktake_id = $2 FOR UPDATE",
        )
        .bind(line_id)
        .bind(stocktake_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stocktake line".to_string()))?;
        let item_id = line.0;

        let item = sqlx::query_as::<_, (Decimal, Decimal, String, Option<String>, Decimal, Option<Decimal>)>(
            r#"
            SELECT current_full_units, current_partial_units, category, subcategory, uom, serving_size_ml
            FROM items
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(item_id)
        .fetch_one(&mut *tx)
        .await?;

        let spec = super::conversion_spec(&item.2, item.3.as_deref(), item.4, item.5)?;

        sqlx::query(
            r#"
            INSERT INTO stock_movements (hotel_id, item_id, period_id, movement_type, quantity, reference, notes, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(stocktake.hotel_id)
        .bind(item_id)
        .bind(period_id)
        .bind(input.movement_type.as_str())
        .bind(signed)
        .bind(&input.reference)
        .bind(&input.notes)
        .bind(recorded_by)
        .execute(&mut *tx)
        .await?;

        let new_servings = spec.to_servings(item.0, item.1) + signed;
        let (full, partial) = spec.to_display(new_servings);
        sqlx::query(
            r#"
            UPDATE items
            SET current_full_units = $1, current_partial_units = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(full)
        .bind(partial)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        // Re-derive the cached aggregates from the ledger rather than
        // incrementing, so the line always matches a fresh aggregate.
        let movement_rows = sqlx::query_as::<_, (String, Decimal)>(
            "SELECT movement_type, quantity FROM stock_movements WHERE item_id = $1 AND period_id = $2",
        )
        .bind(item_id)
        .bind(period_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut agg = MovementAggregates::default();
        for (type_str, quantity) in movement_rows {
            let movement_type = MovementType::from_str(&type_str).ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("unknown movement type {}", type_str))
            })?;
            agg.apply(movement_type, quantity);
        }

        let row = sqlx::query_as::<_, LineRow>(&format!(
            r#"
            UPDATE stocktake_lines
            SET purchases = $1, sales = $2, waste = $3, transfers_in = $4,
                transfers_out = $5, adjustments = $6, updated_at = NOW()
            WHERE id = $7
            RETURNING {LINE_COLUMNS}
            "#,
        ))
        .bind(agg.purchases)
        .bind(agg.sales)
        .bind(agg.waste)
        .bind(agg.transfers_in)
        .bind(agg.transfers_out)
        .bind(agg.adjustments)
        .bind(line_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Approve a stocktake.
    ///
    /// In one transaction: posts an adjustment movement for every nonzero
    /// variance so the ledger reconciles exactly to the counted totals,
    /// upserts the closing snapshot for every line, moves each item's live
    /// balance to its counted units, and flips the status. A stocktake
    /// whose date range no period covers still approves, but every skipped
    /// snapshot is reported in the outcome.
    pub async fn approve(&self, stocktake_id: Uuid, approved_by: Uuid) -> AppResult<ApprovalOutcome> {
        let mut tx = self.db.begin().await?;

        let stocktake_row = sqlx::query_as::<_, StocktakeRow>(&format!(
            "SELECT {STOCKTAKE_COLUMNS} FROM stocktakes WHERE id = $1 FOR UPDATE",
        ))
        .bind(stocktake_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stocktake".to_string()))?;
        let stocktake = stocktake_row.into_stocktake()?;

        if stocktake.status != StocktakeStatus::Draft {
            return Err(AppError::InvalidState(
                "only a draft stocktake can be approved".to_string(),
            ));
        }

        let period = self
            .resolve_period_in_tx(&mut tx, &stocktake)
            .await?;
        if let Some((period_id, is_closed)) = period {
            if is_closed {
                return Err(AppError::InvalidState(format!(
                    "period {} is already closed",
                    period_id
                )));
            }
        }
        let period_id = period.map(|(id, _)| id);

        let lines = sqlx::query_as::<_, ApprovalLineRow>(
            r#"
            SELECT sl.id, sl.stocktake_id, sl.item_id, sl.opening_qty, sl.purchases, sl.sales,
                   sl.waste, sl.transfers_in, sl.transfers_out, sl.adjustments,
                   sl.counted_full_units, sl.counted_partial_units, sl.valuation_cost,
                   sl.created_at, sl.updated_at,
                   i.sku, i.category, i.subcategory, i.uom, i.serving_size_ml
            FROM stocktake_lines sl
            JOIN items i ON i.id = sl.item_id
            WHERE sl.stocktake_id = $1
            FOR UPDATE OF sl
            "#,
        )
        .bind(stocktake_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut adjustments_created = 0u32;
        let mut snapshot_warnings = Vec::new();

        for row in lines {
            let spec = super::conversion_spec(
                &row.category,
                row.subcategory.as_deref(),
                row.uom,
                row.serving_size_ml,
            )?;
            let line = StocktakeLine {
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
            };

            let variance = line.variance_qty(&spec);
            if variance != Decimal::ZERO {
                sqlx::query(
                    r#"
                    INSERT INTO stock_movements (hotel_id, item_id, period_id, movement_type,
                                                 quantity, reference, recorded_by)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(stocktake.hotel_id)
                .bind(line.item_id)
                .bind(period_id)
                .bind(MovementType::Adjustment.as_str())
                .bind(variance)
                .bind(format!("stocktake:{}", stocktake.id))
                .bind(approved_by)
                .execute(&mut *tx)
                .await?;
                adjustments_created += 1;
            }

            match period_id {
                Some(period_id) => {
                    let counted_servings = line.counted_qty(&spec);
                    let frozen_unit_cost = line.valuation_cost * spec.servings_per_full_unit();
                    let stock_value = counted_servings * line.valuation_cost;
                    sqlx::query(
                        r#"
                        INSERT INTO stock_snapshots (hotel_id, item_id, period_id,
                                                     closing_full_units, closing_partial_units,
                                                     unit_cost, cost_per_serving, closing_stock_value)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        ON CONFLICT (hotel_id, item_id, period_id) DO UPDATE
                        SET closing_full_units = EXCLUDED.closing_full_units,
                            closing_partial_units = EXCLUDED.closing_partial_units,
                            unit_cost = EXCLUDED.unit_cost,
                            cost_per_serving = EXCLUDED.cost_per_serving,
                            closing_stock_value = EXCLUDED.closing_stock_value,
                            updated_at = NOW()
                        "#,
                    )
                    .bind(stocktake.hotel_id)
                    .bind(line.item_id)
                    .bind(period_id)
                    .bind(line.counted_full_units)
                    .bind(line.counted_partial_units)
                    .bind(frozen_unit_cost)
                    .bind(line.valuation_cost)
                    .bind(stock_value)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    tracing::warn!(
                        stocktake_id = %stocktake.id,
                        item_id = %line.item_id,
                        sku = %row.sku,
                        "no period covers the stocktake range; snapshot skipped"
                    );
                    snapshot_warnings.push(SnapshotWarning {
                        item_id: line.item_id,
                        sku: row.sku.clone(),
                        message: format!(
                            "no period covers {}..{}; snapshot skipped",
                            stocktake.start_date, stocktake.end_date
                        ),
                    });
                }
            }

            sqlx::query(
                r#"
                UPDATE items
                SET current_full_units = $1, current_partial_units = $2, updated_at = NOW()
                WHERE id = $3
                "#,
            )
            .bind(line.counted_full_units)
            .bind(line.counted_partial_units)
            .bind(line.item_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE stocktakes
            SET status = $1, approved_by = $2, approved_at = NOW(), updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(StocktakeStatus::Approved.as_str())
        .bind(approved_by)
        .bind(stocktake_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            stocktake_id = %stocktake_id,
            adjustments = adjustments_created,
            warnings = snapshot_warnings.len(),
            "stocktake approved"
        );

        Ok(ApprovalOutcome {
            adjustments_created,
            snapshot_warnings,
        })
    }

    /// Resolve the period a stocktake settles into: its linked period, or
    /// failing that any period covering its date range.
    async fn resolve_period_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        stocktake: &Stocktake,
    ) -> AppResult<Option<(Uuid, bool)>> {
        if let Some(period_id) = stocktake.period_id {
            let row = sqlx::query_as::<_, (Uuid, bool)>(
                "SELECT id, is_closed FROM periods WHERE id = $1",
            )
            .bind(period_id)
            .fetch_optional(&mut **tx)
            .await?;
            if row.is_some() {
                return Ok(row);
            }
        }
        let row = sqlx::query_as::<_, (Uuid, bool)>(
            r#"
            SELECT id, is_closed
            FROM periods
            WHERE hotel_id = $1 AND start_date <= $2 AND end_date >= $3
            ORDER BY start_date
            LIMIT 1
            "#,
        )
        .bind(stocktake.hotel_id)
        .bind(stocktake.start_date)
        .bind(stocktake.end_date)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }
}
