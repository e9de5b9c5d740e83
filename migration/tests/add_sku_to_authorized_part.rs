use migration::sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use migration::{
    add_sku, AddSkuColumn, ConstraintReason, MigratorTrait, Phase, SchemaManager, StepError,
    StepMode,
};

const PARTS: &[(&str, &str)] = &[
    ("PCB-MAIN-001", "Main board"),
    ("CAP10UF", "Electrolytic capacitor"),
    ("RES100", "100 ohm resistor"),
    ("XYZ9", "Misc"),
    ("PCB-CAP-1", "Cap carrier board"),
];

/// In-memory database with `authorized_part` created but no `sku` column yet.
async fn setup_unmigrated_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    migration::Migrator::up(&db, Some(1))
        .await
        .expect("Failed to create authorized_part");
    db
}

async fn insert_parts(db: &DatabaseConnection, parts: &[(&str, &str)]) {
    for (part_number, description) in parts {
        db.execute(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "INSERT INTO authorized_part (part_number, description) VALUES (?, ?)",
            [(*part_number).into(), (*description).into()],
        ))
        .await
        .expect("Failed to insert part");
    }
}

async fn sku_of(db: &DatabaseConnection, part_number: &str) -> String {
    let row = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT sku FROM authorized_part WHERE part_number = ?",
            [part_number.into()],
        ))
        .await
        .unwrap()
        .expect("part not found");
    row.try_get("", "sku").unwrap()
}

async fn has_sku_column(db: &DatabaseConnection) -> bool {
    SchemaManager::new(db)
        .has_column(add_sku::TABLE, add_sku::COLUMN)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_migration_backfills_every_row() {
    let db = setup_unmigrated_db().await;
    insert_parts(&db, PARTS).await;

    migration::Migrator::up(&db, None).await.unwrap();

    assert_eq!(sku_of(&db, "PCB-MAIN-001").await, "SKU-PCB-MAIN-001-PCB");
    assert_eq!(sku_of(&db, "CAP10UF").await, "SKU-CAP10UF-CAP");
    assert_eq!(sku_of(&db, "RES100").await, "SKU-RES100-RES");
    assert_eq!(sku_of(&db, "XYZ9").await, "SKU-XYZ9");
    assert_eq!(sku_of(&db, "PCB-CAP-1").await, "SKU-PCB-CAP-1-PCB");
    assert!(migration::Migrator::get_pending_migrations(&db)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_migration_on_empty_table() {
    let db = setup_unmigrated_db().await;
    let manager = SchemaManager::new(&db);

    let report = AddSkuColumn::default().apply(&manager).await.unwrap();

    assert!(report.column_added);
    assert!(report.default_dropped);
    assert_eq!(report.backfill.updated, 0);
    assert_eq!(report.backfill.skipped, 0);
}

#[tokio::test]
async fn test_insert_without_sku_fails_after_migration() {
    let db = setup_unmigrated_db().await;
    insert_parts(&db, PARTS).await;
    migration::Migrator::up(&db, None).await.unwrap();

    let missing = db
        .execute_unprepared(
            "INSERT INTO authorized_part (part_number, description) VALUES ('LED-1', 'Indicator')",
        )
        .await;
    let err = missing.expect_err("insert without sku must fail");
    assert!(err.to_string().contains("NOT NULL"), "unexpected error: {err}");

    db.execute_unprepared(
        "INSERT INTO authorized_part (part_number, sku, description) \
         VALUES ('LED-1', 'SKU-LED-1', 'Indicator')",
    )
    .await
    .expect("insert with explicit sku must succeed");
    assert_eq!(sku_of(&db, "LED-1").await, "SKU-LED-1");
}

#[tokio::test]
async fn test_rebuild_keeps_rows_and_index() {
    let db = setup_unmigrated_db().await;
    insert_parts(&db, PARTS).await;
    db.execute_unprepared(
        "UPDATE authorized_part SET revision = 'C', is_active = 0 WHERE part_number = 'XYZ9'",
    )
    .await
    .unwrap();

    migration::Migrator::up(&db, None).await.unwrap();

    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT id, description, revision, is_active FROM authorized_part WHERE part_number = 'XYZ9'",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i32>("", "id").unwrap(), 4);
    assert_eq!(row.try_get::<String>("", "description").unwrap(), "Misc");
    assert_eq!(row.try_get::<String>("", "revision").unwrap(), "C");
    assert!(!row.try_get::<bool>("", "is_active").unwrap());

    let manager = SchemaManager::new(&db);
    assert!(manager
        .has_index(add_sku::TABLE, "idx_authorized_part_is_active")
        .await
        .unwrap());
    assert!(!manager
        .has_table("authorized_part__sku_rebuild")
        .await
        .unwrap());
    assert_eq!(add_sku::column_default(&db).await.unwrap(), None);
}

#[tokio::test]
async fn test_overflowing_sku_rolls_back_whole_step() {
    let db = setup_unmigrated_db().await;
    insert_parts(&db, PARTS).await;
    let long_part = format!("PCB{}", "0".repeat(43));
    insert_parts(&db, &[(long_part.as_str(), "Oversized part number")]).await;

    let manager = SchemaManager::new(&db);
    let err = AddSkuColumn::default()
        .apply(&manager)
        .await
        .expect_err("54-character sku must be rejected");

    assert_eq!(err.phase(), Phase::Backfill);
    assert!(!err.is_retryable());
    match &err {
        StepError::ConstraintViolation {
            reason: ConstraintReason::SkuTooLong(rows),
            ..
        } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].id, 6);
            assert_eq!(rows[0].overflow.part_number, long_part);
            assert_eq!(rows[0].overflow.sku_len(), 54);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Column addition rolled back with the failed backfill
    assert!(!has_sku_column(&db).await);
}

#[tokio::test]
async fn test_failed_migration_stays_pending_and_can_be_rerun() {
    let db = setup_unmigrated_db().await;
    let long_part = format!("RES{}", "9".repeat(43));
    insert_parts(&db, &[("RES100", "100 ohm resistor"), (long_part.as_str(), "Too long")]).await;

    let err = migration::Migrator::up(&db, None).await.unwrap_err();
    assert!(err.to_string().contains("backfill"), "unexpected error: {err}");
    assert!(err.to_string().contains(&long_part));
    assert!(!has_sku_column(&db).await);
    assert_eq!(
        migration::Migrator::get_pending_migrations(&db)
            .await
            .unwrap()
            .len(),
        1
    );

    // Operator fixes the source data and reruns
    db.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        "UPDATE authorized_part SET part_number = 'RES470' WHERE part_number = ?",
        [long_part.as_str().into()],
    ))
    .await
    .unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    assert_eq!(sku_of(&db, "RES470").await, "SKU-RES470-RES");
}

#[tokio::test]
async fn test_backfill_is_idempotent() {
    let db = setup_unmigrated_db().await;
    insert_parts(&db, PARTS).await;
    let manager = SchemaManager::new(&db);
    let step = AddSkuColumn::default();

    assert!(step.add_column(&manager, StepMode::Transactional).await.unwrap());
    db.execute_unprepared("UPDATE authorized_part SET sku = 'SKU-KEEP' WHERE part_number = 'XYZ9'")
        .await
        .unwrap();

    let first = step.backfill(&db).await.unwrap();
    assert_eq!(first.updated, 4);
    assert_eq!(first.skipped, 1);

    let second = step.backfill(&db).await.unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.skipped, 5);

    assert_eq!(sku_of(&db, "XYZ9").await, "SKU-KEEP");
    assert_eq!(sku_of(&db, "RES100").await, "SKU-RES100-RES");
}

#[tokio::test]
async fn test_add_column_twice_is_schema_conflict() {
    let db = setup_unmigrated_db().await;
    migration::Migrator::up(&db, None).await.unwrap();

    let manager = SchemaManager::new(&db);
    let err = AddSkuColumn::default().apply(&manager).await.unwrap_err();
    assert!(matches!(
        err,
        StepError::SchemaConflict {
            phase: Phase::AddColumn,
            ..
        }
    ));
    assert!(err.to_string().contains("already applied"));
}

#[tokio::test]
async fn test_reentrant_mode_resumes_partial_application() {
    let db = setup_unmigrated_db().await;
    insert_parts(&db, PARTS).await;
    let manager = SchemaManager::new(&db);
    let step = AddSkuColumn::default();

    // Column added but the backfill never ran
    assert!(step.add_column(&manager, StepMode::Reentrant).await.unwrap());
    assert_eq!(
        add_sku::column_default(&db).await.unwrap().as_deref(),
        Some("''")
    );

    let report = step
        .apply_with_mode(&manager, StepMode::Reentrant)
        .await
        .unwrap();
    assert!(!report.column_added);
    assert_eq!(report.backfill.updated, 5);
    assert!(report.default_dropped);

    // Nothing left to do on a second pass
    let report = step
        .apply_with_mode(&manager, StepMode::Reentrant)
        .await
        .unwrap();
    assert!(!report.column_added);
    assert_eq!(report.backfill.updated, 0);
    assert_eq!(report.backfill.skipped, 5);
    assert!(!report.default_dropped);
}

#[tokio::test]
async fn test_empty_sku_survives_finalize() {
    let db = setup_unmigrated_db().await;
    insert_parts(&db, &[("XYZ9", "Misc")]).await;
    let manager = SchemaManager::new(&db);
    let step = AddSkuColumn::default();

    step.add_column(&manager, StepMode::Transactional).await.unwrap();
    // Finalize without backfilling first: '' is a legal value
    assert!(step.finalize_constraint(&manager).await.unwrap());
    assert_eq!(sku_of(&db, "XYZ9").await, "");
    assert!(!step.finalize_constraint(&manager).await.unwrap());
}

#[tokio::test]
async fn test_down_drops_column() {
    let db = setup_unmigrated_db().await;
    insert_parts(&db, PARTS).await;
    migration::Migrator::up(&db, None).await.unwrap();

    migration::Migrator::down(&db, Some(1)).await.unwrap();

    assert!(!has_sku_column(&db).await);
}
