//! Authorized part lookups and the application write path.
//!
//! After the `sku` migration the column has no default, so every part created
//! here must carry an explicit SKU.

use chrono::Utc;
use migration::{SkuRules, SKU_MAX_LEN};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use thiserror::Error;
use tracing::info;

use crate::entities::{authorized_part, prelude::AuthorizedPart};

/// Autocomplete result cap
pub const SEARCH_LIMIT: u64 = 10;
pub const PART_NUMBER_MAX_LEN: usize = 50;
pub const REVISION_MAX_LEN: usize = 10;
pub const DEFAULT_REVISION: &str = "A";

const LIKE_ESCAPE: char = '!';

#[derive(Debug, Error)]
pub enum PartError {
    #[error("{0}")]
    Validation(String),

    #[error("part_number '{0}' already exists")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone)]
pub struct NewAuthorizedPart {
    pub part_number: String,
    pub sku: Option<String>,
    pub description: String,
    pub revision: Option<String>,
    pub is_active: Option<bool>,
}

/// SKU the backfill rules would derive for a part number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuSuggestion {
    pub sku: String,
    pub fits: bool,
}

/// Active parts whose part number contains `query`, case-insensitively,
/// ordered by part number.
pub async fn search_active(
    db: &DatabaseConnection,
    query: &str,
) -> Result<Vec<authorized_part::Model>, DbErr> {
    let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));

    AuthorizedPart::find()
        .filter(authorized_part::Column::IsActive.eq(true))
        .filter(
            Expr::expr(Func::lower(Expr::col(authorized_part::Column::PartNumber)))
                .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)),
        )
        .order_by_asc(authorized_part::Column::PartNumber)
        .limit(SEARCH_LIMIT)
        .all(db)
        .await
}

pub async fn create(
    db: &DatabaseConnection,
    new: NewAuthorizedPart,
) -> Result<authorized_part::Model, PartError> {
    let part_number = validate_part_number(&new.part_number)?;
    let sku = validate_sku(new.sku.as_deref())?;
    let revision = validate_revision(new.revision.as_deref())?;
    let description = new.description.trim().to_string();
    if description.is_empty() {
        return Err(PartError::Validation("description is required".to_string()));
    }

    let existing = AuthorizedPart::find()
        .filter(authorized_part::Column::PartNumber.eq(&part_number))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(PartError::Duplicate(part_number));
    }

    let now = Utc::now().naive_utc();
    let part = authorized_part::ActiveModel {
        id: NotSet,
        part_number: Set(part_number.clone()),
        sku: Set(sku),
        description: Set(description),
        revision: Set(revision),
        is_active: Set(new.is_active.unwrap_or(true)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let inserted = part.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => PartError::Duplicate(part_number.clone()),
        _ => PartError::Database(e),
    })?;

    info!(id = inserted.id, part_number = %inserted.part_number, sku = %inserted.sku, "Created authorized part");
    Ok(inserted)
}

pub fn suggest_sku(part_number: &str) -> SkuSuggestion {
    match SkuRules::default().derive_checked(part_number.trim()) {
        Ok(sku) => SkuSuggestion { sku, fits: true },
        Err(overflow) => SkuSuggestion {
            sku: overflow.sku,
            fits: false,
        },
    }
}

pub fn validate_part_number(part_number: &str) -> Result<String, PartError> {
    let part_number = part_number.trim();
    if part_number.is_empty() {
        return Err(PartError::Validation("part_number is required".to_string()));
    }
    if part_number.chars().count() > PART_NUMBER_MAX_LEN {
        return Err(PartError::Validation(format!(
            "part_number cannot exceed {} characters",
            PART_NUMBER_MAX_LEN
        )));
    }
    Ok(part_number.to_string())
}

pub fn validate_sku(sku: Option<&str>) -> Result<String, PartError> {
    let sku = sku.map(str::trim).unwrap_or_default();
    if sku.is_empty() {
        return Err(PartError::Validation("sku is required".to_string()));
    }
    if sku.chars().count() > SKU_MAX_LEN {
        return Err(PartError::Validation(format!(
            "sku cannot exceed {} characters",
            SKU_MAX_LEN
        )));
    }
    Ok(sku.to_string())
}

fn validate_revision(revision: Option<&str>) -> Result<String, PartError> {
    let revision = revision.map(str::trim).unwrap_or_default();
    if revision.is_empty() {
        return Ok(DEFAULT_REVISION.to_string());
    }
    if revision.chars().count() > REVISION_MAX_LEN {
        return Err(PartError::Validation(format!(
            "revision cannot exceed {} characters",
            REVISION_MAX_LEN
        )));
    }
    Ok(revision.to_string())
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
