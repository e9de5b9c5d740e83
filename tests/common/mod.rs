use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use serials_backend::services::authorized_parts::{self, NewAuthorizedPart};

/// Set up a migrated in-memory test database
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Insert a part through the application write path
#[allow(dead_code)]
pub async fn seed_part(db: &DatabaseConnection, part_number: &str, sku: &str, is_active: bool) {
    authorized_parts::create(
        db,
        NewAuthorizedPart {
            part_number: part_number.to_string(),
            sku: Some(sku.to_string()),
            description: format!("{} description", part_number),
            revision: None,
            is_active: Some(is_active),
        },
    )
    .await
    .expect("Failed to seed part");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_test_db() {
        let db = setup_test_db().await;
        assert!(db.is_ok(), "Test database setup should succeed");
    }
}
