//! Movement ledger service
//!
//! Append-only record of quantity-affecting events. Entries are never
//! edited or deleted; corrections are new offsetting movements. Stocktake
//! line fields cache the aggregates computed here, so the ledger remains
//! the source of truth for every derived quantity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{signed_quantity, Movement, MovementAggregates, MovementType};
use shared::types::PeriodContext;

use crate::error::{AppError, AppResult};

/// Ledger service for recording and aggregating stock movements
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Input for recording a movement
#[derive(Debug, Deserialize)]
pub struct RecordMovementInput {
    pub item_id: Uuid,
    pub movement_type: MovementType,
    /// Positive magnitude for signed-by-type movements; signed for
    /// adjustments
    pub quantity: Decimal,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Row for movement queries
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    hotel_id: Uuid,
    item_id: Uuid,
    period_id: Option<Uuid>,
    movement_type: String,
    quantity: Decimal,
    reference: Option<String>,
    notes: Option<String>,
    recorded_by: Uuid,
    recorded_at: DateTime<Utc>,
}

impl MovementRow {
    fn into_movement(self) -> AppResult<Movement> {
        let movement_type = MovementType::from_str(&self.movement_type).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "unknown movement type {}",
                self.movement_type
            ))
        })?;
        Ok(Movement {
            id: self.id,
            hotel_id: self.hotel_id,
            item_id: self.item_id,
            period_id: self.period_id,
            movement_type,
            quantity: self.quantity,
            reference: self.reference,
            notes: self.notes,
            recorded_by: self.recorded_by,
            recorded_at: self.recorded_at,
        })
    }
}

const MOVEMENT_COLUMNS: &str = "id, hotel_id, item_id, period_id, movement_type, quantity, \
                                reference, notes, recorded_by, recorded_at";

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append a movement and roll the item's on-hand balance forward.
    ///
    /// The item row is locked for the duration so concurrent movements on
    /// the same item serialize instead of losing updates.
    pub async fn record(
        &self,
        ctx: &PeriodContext,
        input: RecordMovementInput,
        recorded_by: Uuid,
    ) -> AppResult<Movement> {
        if ctx.is_closed {
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

        let item = sqlx::query_as::<_, (Decimal, Decimal, String, Option<String>, Decimal, Option<Decimal>)>(
            r#"
            SELECT current_full_units, current_partial_units, category, subcategory, uom, serving_size_ml
            FROM items
            WHERE id = $1 AND hotel_id = $2
            FOR UPDATE
            "#,
        )
        .bind(input.item_id)
        .bind(ctx.hotel_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        let spec = super::conversion_spec(&item.2, item.3.as_deref(), item.4, item.5)?;

        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO stock_movements (hotel_id, item_id, period_id, movement_type, quantity, reference, notes, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MOVEMENT_COLUMNS}
            "#,
        ))
        .bind(ctx.hotel_id)
        .bind(input.item_id)
        .bind(ctx.period_id)
        .bind(input.movement_type.as_str())
        .bind(signed)
        .bind(&input.reference)
        .bind(&input.notes)
        .bind(recorded_by)
        .fetch_one(&mut *tx)
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
        .bind(input.item_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            item_id = %input.item_id,
            movement_type = input.movement_type.as_str(),
            quantity = %signed,
            "movement recorded"
        );

        row.into_movement()
    }

    /// Sum an item's movements by type over the period.
    pub async fn aggregate(
        &self,
        item_id: Uuid,
        ctx: &PeriodContext,
    ) -> AppResult<MovementAggregates> {
        let rows = sqlx::query_as::<_, (String, Decimal)>(
            r#"
            SELECT movement_type, quantity
            FROM stock_movements
            WHERE item_id = $1 AND period_id = $2
            "#,
        )
        .bind(item_id)
        .bind(ctx.period_id)
        .fetch_all(&self.db)
        .await?;

        let mut agg = MovementAggregates::default();
        for (type_str, quantity) in rows {
            let movement_type = MovementType::from_str(&type_str).ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("unknown movement type {}", type_str))
            })?;
            agg.apply(movement_type, quantity);
        }
        Ok(agg)
    }

    /// List an item's movements within the period, most recent first
    pub async fn movements_for(
        &self,
        item_id: Uuid,
        ctx: &PeriodContext,
    ) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE item_id = $1 AND period_id = $2
            ORDER BY recorded_at DESC
            "#,
        ))
        .bind(item_id)
        .bind(ctx.period_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MovementRow::into_movement).collect()
    }
}
