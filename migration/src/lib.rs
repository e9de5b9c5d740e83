pub use sea_orm_migration::prelude::*;
pub use sea_orm_migration::sea_orm;

pub mod add_sku;
pub mod error;
pub mod sku_rules;

mod m20260301_000001_create_authorized_part;
mod m20260302_000001_add_sku_to_authorized_part;

pub use add_sku::{AddSkuColumn, BackfillReport, StepMode, StepReport};
pub use error::{ConstraintReason, Phase, RowViolation, StepError};
pub use sku_rules::{derive_sku, SkuRule, SkuRules, SkuTooLong, SKU_MAX_LEN};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_authorized_part::Migration),
            Box::new(m20260302_000001_add_sku_to_authorized_part::Migration),
        ]
    }
}
