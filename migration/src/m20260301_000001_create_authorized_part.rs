use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Parts that may be referenced by serial numbers
        let mut table = Table::create();
        table.table(AuthorizedPart::Table).if_not_exists();
        for column in columns() {
            table.col(column);
        }
        manager.create_table(table.to_owned()).await?;

        for index in indexes() {
            manager.create_index(index).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthorizedPart::Table).to_owned())
            .await
    }
}

/// Column definitions of `authorized_part` as created here. The SQLite table
/// rebuild in the `sku` migration starts from these.
pub(crate) fn columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new(AuthorizedPart::Id)
            .integer()
            .not_null()
            .auto_increment()
            .primary_key()
            .to_owned(),
        ColumnDef::new(AuthorizedPart::PartNumber)
            .string_len(50)
            .not_null()
            .unique_key()
            .to_owned(),
        ColumnDef::new(AuthorizedPart::Description)
            .text()
            .not_null()
            .to_owned(),
        ColumnDef::new(AuthorizedPart::Revision)
            .string_len(10)
            .not_null()
            .default("A")
            .to_owned(),
        ColumnDef::new(AuthorizedPart::IsActive)
            .boolean()
            .not_null()
            .default(true)
            .to_owned(),
        ColumnDef::new(AuthorizedPart::CreatedAt)
            .timestamp()
            .not_null()
            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp))
            .to_owned(),
        ColumnDef::new(AuthorizedPart::UpdatedAt)
            .timestamp()
            .not_null()
            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp))
            .to_owned(),
    ]
}

pub(crate) fn indexes() -> Vec<IndexCreateStatement> {
    vec![
        // Autocomplete only lists active parts
        Index::create()
            .name("idx_authorized_part_is_active")
            .table(AuthorizedPart::Table)
            .col(AuthorizedPart::IsActive)
            .to_owned(),
    ]
}

/// Names of the columns returned by [`columns`], in the same order.
pub(crate) const COLUMN_NAMES: [&str; 7] = [
    "id",
    "part_number",
    "description",
    "revision",
    "is_active",
    "created_at",
    "updated_at",
];

#[derive(DeriveIden)]
enum AuthorizedPart {
    Table,
    Id,
    PartNumber,
    Description,
    Revision,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
