//! Read-only preview of the SKUs the backfill derives, one entry per part.
//!
//! Used before running the `sku` migration to find part numbers whose derived
//! SKU would not fit the column, so the source data can be fixed first.

use migration::{SkuRules, SKU_MAX_LEN};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder, QuerySelect};

use crate::entities::{authorized_part, prelude::AuthorizedPart};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuPreview {
    pub id: i32,
    pub part_number: String,
    pub derived_sku: String,
    pub fits: bool,
}

#[derive(Debug, Default)]
pub struct SkuReport {
    pub rows: Vec<SkuPreview>,
}

impl SkuReport {
    pub fn overflows(&self) -> impl Iterator<Item = &SkuPreview> {
        self.rows.iter().filter(|row| !row.fits)
    }

    pub fn overflow_count(&self) -> usize {
        self.overflows().count()
    }
}

/// Only `id` and `part_number` are read, so this works whether or not the
/// `sku` column exists yet.
pub async fn preview(db: &DatabaseConnection, rules: &SkuRules) -> Result<SkuReport, DbErr> {
    let parts: Vec<(i32, String)> = AuthorizedPart::find()
        .select_only()
        .column(authorized_part::Column::Id)
        .column(authorized_part::Column::PartNumber)
        .order_by_asc(authorized_part::Column::Id)
        .into_tuple()
        .all(db)
        .await?;

    let rows = parts
        .into_iter()
        .map(|(id, part_number)| {
            let derived_sku = rules.derive(&part_number);
            let fits = derived_sku.chars().count() <= SKU_MAX_LEN;
            SkuPreview {
                id,
                part_number,
                derived_sku,
                fits,
            }
        })
        .collect();

    Ok(SkuReport { rows })
}
