use sea_orm_migration::prelude::*;

use crate::add_sku::{AddSkuColumn, AuthorizedPart};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SKU used in the PN/SKU/SERIAL CSV export
        AddSkuColumn::default().apply(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Derived values are lost
        manager
            .alter_table(
                Table::alter()
                    .table(AuthorizedPart::Table)
                    .drop_column(AuthorizedPart::Sku)
                    .to_owned(),
            )
            .await
    }
}
