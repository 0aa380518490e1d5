//! Item catalog service for stock item master records

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{Category, Item, MineralsSubcategory};
use shared::validation::{validate_sku, validate_unit_cost, validate_uom};

use crate::error::{AppError, AppResult};

/// Catalog service for managing stock items
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Input for creating an item
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemInput {
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub category: Category,
    pub subcategory: Option<MineralsSubcategory>,
    pub uom: Decimal,
    pub serving_size_ml: Option<Decimal>,
    pub unit_cost: Decimal,
}

/// Row for item queries
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    hotel_id: Uuid,
    sku: String,
    name: String,
    category: String,
    subcategory: Option<String>,
    uom: Decimal,
    serving_size_ml: Option<Decimal>,
    unit_cost: Decimal,
    current_full_units: Decimal,
    current_partial_units: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_item(self) -> AppResult<Item> {
        let category = Category::from_str(&self.category)
            .ok_or_else(|| AppError::InternalError(anyhow!("unknown category {}", self.category)))?;
        let subcategory = match self.subcategory {
            Some(ref s) => Some(MineralsSubcategory::from_str(s).ok_or_else(|| {
                AppError::InternalError(anyhow!("unknown subcategory {}", s))
            })?),
            None => None,
        };
        Ok(Item {
            id: self.id,
            hotel_id: self.hotel_id,
            sku: self.sku,
            name: self.name,
            category,
            subcategory,
            uom: self.uom,
            serving_size_ml: self.serving_size_ml,
            unit_cost: self.unit_cost,
            current_full_units: self.current_full_units,
            current_partial_units: self.current_partial_units,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ITEM_COLUMNS: &str = "id, hotel_id, sku, name, category, subcategory, uom, serving_size_ml, \
                            unit_cost, current_full_units, current_partial_units, is_active, \
                            created_at, updated_at";

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a stock item
    pub async fn create_item(&self, hotel_id: Uuid, input: CreateItemInput) -> AppResult<Item> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        validate_sku(&input.sku).map_err(|msg| AppError::Validation {
            field: "sku".to_string(),
            message: msg.to_string(),
        })?;
        validate_uom(input.uom).map_err(|msg| AppError::Validation {
            field: "uom".to_string(),
            message: msg.to_string(),
        })?;
        validate_unit_cost(input.unit_cost).map_err(|msg| AppError::Validation {
            field: "unit_cost".to_string(),
            message: msg.to_string(),
        })?;

        // Resolving the conversion spec up front rejects bad category/uom
        // combinations before anything is persisted.
        let probe = Item {
            id: Uuid::nil(),
            hotel_id,
            sku: input.sku.clone(),
            name: input.name.clone(),
            category: input.category,
            subcategory: input.subcategory,
            uom: input.uom,
            serving_size_ml: input.serving_size_ml,
            unit_cost: input.unit_cost,
            current_full_units: Decimal::ZERO,
            current_partial_units: Decimal::ZERO,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        probe.conversion()?;

        let sku_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM items WHERE hotel_id = $1 AND sku = $2)",
        )
        .bind(hotel_id)
        .bind(&input.sku)
        .fetch_one(&self.db)
        .await?;

        if sku_exists {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO items (hotel_id, sku, name, category, subcategory, uom, serving_size_ml, unit_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ITEM_COLUMNS}
            "#,
        ))
        .bind(hotel_id)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(input.category.as_str())
        .bind(input.subcategory.map(|s| s.as_str()))
        .bind(input.uom)
        .bind(input.serving_size_ml)
        .bind(input.unit_cost)
        .fetch_one(&self.db)
        .await?;

        row.into_item()
    }

    /// Get an item by ID
    pub async fn get_item(&self, hotel_id: Uuid, item_id: Uuid) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 AND hotel_id = $2",
        ))
        .bind(item_id)
        .bind(hotel_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        row.into_item()
    }

    /// Get an item by SKU
    pub async fn get_item_by_sku(&self, hotel_id: Uuid, sku: &str) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE hotel_id = $1 AND sku = $2",
        ))
        .bind(hotel_id)
        .bind(sku)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        row.into_item()
    }

    /// List items for a hotel, active only unless asked otherwise
    pub async fn list_items(&self, hotel_id: Uuid, include_inactive: bool) -> AppResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM items
            WHERE hotel_id = $1 AND (is_active OR $2)
            ORDER BY category, sku
            "#,
        ))
        .bind(hotel_id)
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// Update an item's storage-unit cost.
    ///
    /// Only the live item changes; stocktake lines and snapshots keep the
    /// costs frozen when they were written.
    pub async fn update_cost(
        &self,
        hotel_id: Uuid,
        item_id: Uuid,
        unit_cost: Decimal,
    ) -> AppResult<Item> {
        validate_unit_cost(unit_cost).map_err(|msg| AppError::Validation {
            field: "unit_cost".to_string(),
            message: msg.to_string(),
        })?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items
            SET unit_cost = $1, updated_at = NOW()
            WHERE id = $2 AND hotel_id = $3
            RETURNING {ITEM_COLUMNS}
            "#,
        ))
        .bind(unit_cost)
        .bind(item_id)
        .bind(hotel_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        row.into_item()
    }

    /// Deactivate an item. Items are never deleted; history keeps
    /// referencing them.
    pub async fn deactivate_item(&self, hotel_id: Uuid, item_id: Uuid) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND hotel_id = $2
            RETURNING {ITEM_COLUMNS}
            "#,
        ))
        .bind(item_id)
        .bind(hotel_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        row.into_item()
    }
}
