//! Schema evolution that makes `authorized_part.sku` a required column.
//!
//! 1. Add `sku varchar(50) NOT NULL DEFAULT ''`.
//! 2. Backfill every row still holding `''` with the SKU derived from its
//!    `part_number`.
//! 3. Drop the temporary default so new rows must supply a SKU.
//!
//! On Postgres and SQLite the phases share one transaction and the table is
//! either fully migrated or untouched. MySQL commits DDL implicitly, so there
//! every phase is re-entrant instead.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DbBackend, Statement, TransactionTrait};
use tracing::{debug, info, warn};

use crate::error::{is_duplicate_column, ConstraintReason, Phase, RowViolation, StepError};
use crate::m20260301_000001_create_authorized_part as base;
use crate::sku_rules::{SkuRules, SKU_MAX_LEN};

pub const TABLE: &str = "authorized_part";
pub const COLUMN: &str = "sku";

const REBUILD_TABLE: &str = "authorized_part__sku_rebuild";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// All phases in one transaction; an existing column is a conflict.
    Transactional,
    /// Each phase checks its own postcondition and skips if already met.
    Reentrant,
}

impl StepMode {
    pub fn for_backend(backend: DbBackend) -> Self {
        match backend {
            DbBackend::Postgres | DbBackend::Sqlite => StepMode::Transactional,
            DbBackend::MySql => StepMode::Reentrant,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    /// Rows whose empty `sku` was replaced by a derived value.
    pub updated: u64,
    /// Rows that already had a non-empty `sku`.
    pub skipped: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub column_added: bool,
    pub backfill: BackfillReport,
    pub default_dropped: bool,
}

/// The add/backfill/finalize step for `authorized_part.sku`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddSkuColumn {
    rules: SkuRules,
}

impl AddSkuColumn {
    pub fn new(rules: SkuRules) -> Self {
        Self { rules }
    }

    /// Run all three phases in the mode suited to the connected backend.
    pub async fn apply(&self, manager: &SchemaManager<'_>) -> Result<StepReport, StepError> {
        let mode = StepMode::for_backend(manager.get_database_backend());
        self.apply_with_mode(manager, mode).await
    }

    pub async fn apply_with_mode(
        &self,
        manager: &SchemaManager<'_>,
        mode: StepMode,
    ) -> Result<StepReport, StepError> {
        info!(table = TABLE, column = COLUMN, ?mode, "Applying sku schema evolution");

        let report = match mode {
            StepMode::Reentrant => self.run_phases(manager, mode).await?,
            StepMode::Transactional => {
                let txn = manager
                    .get_connection()
                    .begin()
                    .await
                    .map_err(|e| StepError::from_db(Phase::AddColumn, e))?;

                let result = self.run_phases(&SchemaManager::new(&txn), mode).await;
                match result {
                    Ok(report) => {
                        txn.commit()
                            .await
                            .map_err(|e| StepError::from_db(Phase::FinalizeConstraint, e))?;
                        report
                    }
                    Err(err) => {
                        warn!(phase = %err.phase(), error = %err, "sku schema evolution failed, rolling back");
                        if let Err(rollback_err) = txn.rollback().await {
                            warn!(error = %rollback_err, "Rollback failed");
                        }
                        return Err(err);
                    }
                }
            }
        };

        info!(
            column_added = report.column_added,
            updated = report.backfill.updated,
            skipped = report.backfill.skipped,
            default_dropped = report.default_dropped,
            "sku schema evolution complete"
        );
        Ok(report)
    }

    async fn run_phases(
        &self,
        manager: &SchemaManager<'_>,
        mode: StepMode,
    ) -> Result<StepReport, StepError> {
        let column_added = self.add_column(manager, mode).await?;
        let backfill = self.backfill(manager.get_connection()).await?;
        let default_dropped = self.finalize_constraint(manager).await?;

        Ok(StepReport {
            column_added,
            backfill,
            default_dropped,
        })
    }

    /// Phase 1. Returns whether the column was added by this call.
    pub async fn add_column(
        &self,
        manager: &SchemaManager<'_>,
        mode: StepMode,
    ) -> Result<bool, StepError> {
        let phase = Phase::AddColumn;
        let conflict = StepError::SchemaConflict {
            phase,
            table: TABLE,
            column: COLUMN,
        };

        let exists = manager
            .has_column(TABLE, COLUMN)
            .await
            .map_err(|e| StepError::from_db(phase, e))?;
        if exists {
            return match mode {
                StepMode::Transactional => Err(conflict),
                StepMode::Reentrant => {
                    info!(table = TABLE, column = COLUMN, "Column already present, resuming");
                    Ok(false)
                }
            };
        }

        manager
            .alter_table(
                Table::alter()
                    .table(AuthorizedPart::Table)
                    .add_column(
                        ColumnDef::new(AuthorizedPart::Sku)
                            .string_len(SKU_MAX_LEN as u32)
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await
            .map_err(|e| {
                if is_duplicate_column(&e.to_string()) {
                    conflict
                } else {
                    StepError::from_db(phase, e)
                }
            })?;

        debug!(table = TABLE, column = COLUMN, "Added column with temporary default");
        Ok(true)
    }

    /// Phase 2. Derives a SKU for every row whose `sku` is `''`.
    ///
    /// All derivations are checked against the column bound before anything
    /// is written; any overflow fails the phase and lists every offending row.
    pub async fn backfill<C>(&self, conn: &C) -> Result<BackfillReport, StepError>
    where
        C: ConnectionTrait,
    {
        let phase = Phase::Backfill;
        let backend = conn.get_database_backend();

        let pending = Query::select()
            .columns([AuthorizedPart::Id, AuthorizedPart::PartNumber])
            .from(AuthorizedPart::Table)
            .and_where(Expr::col(AuthorizedPart::Sku).eq(""))
            .order_by(AuthorizedPart::Id, Order::Asc)
            .to_owned();
        let rows = conn
            .query_all(backend.build(&pending))
            .await
            .map_err(|e| StepError::from_db(phase, e))?;

        let mut assignments = Vec::with_capacity(rows.len());
        let mut violations = Vec::new();
        for row in rows {
            let id: i32 = row
                .try_get("", "id")
                .map_err(|e| StepError::from_db(phase, e))?;
            let part_number: String = row
                .try_get("", "part_number")
                .map_err(|e| StepError::from_db(phase, e))?;

            match self.rules.derive_checked(&part_number) {
                Ok(sku) => assignments.push((id, sku)),
                Err(overflow) => {
                    warn!(
                        id,
                        part_number = %overflow.part_number,
                        sku_len = overflow.sku_len(),
                        "Derived sku exceeds column bound"
                    );
                    violations.push(RowViolation { id, overflow });
                }
            }
        }

        if !violations.is_empty() {
            return Err(StepError::ConstraintViolation {
                phase,
                reason: ConstraintReason::SkuTooLong(violations),
            });
        }

        let mut report = BackfillReport {
            skipped: self.count_filled(conn).await?,
            ..Default::default()
        };

        for (id, sku) in assignments {
            debug!(id, %sku, "Backfilling sku");
            let update = Query::update()
                .table(AuthorizedPart::Table)
                .value(AuthorizedPart::Sku, sku)
                .and_where(Expr::col(AuthorizedPart::Id).eq(id))
                .and_where(Expr::col(AuthorizedPart::Sku).eq(""))
                .to_owned();
            let result = conn
                .execute(backend.build(&update))
                .await
                .map_err(|e| StepError::from_db(phase, e))?;
            report.updated += result.rows_affected();
        }

        info!(updated = report.updated, skipped = report.skipped, "Backfilled sku");
        Ok(report)
    }

    async fn count_filled<C>(&self, conn: &C) -> Result<u64, StepError>
    where
        C: ConnectionTrait,
    {
        let phase = Phase::Backfill;
        let stmt = Query::select()
            .expr_as(Func::count(Expr::col(AuthorizedPart::Id)), Alias::new("filled"))
            .from(AuthorizedPart::Table)
            .and_where(Expr::col(AuthorizedPart::Sku).ne(""))
            .to_owned();

        let row = conn
            .query_one(conn.get_database_backend().build(&stmt))
            .await
            .map_err(|e| StepError::from_db(phase, e))?;
        let filled: i64 = match row {
            Some(row) => row
                .try_get("", "filled")
                .map_err(|e| StepError::from_db(phase, e))?,
            None => 0,
        };
        Ok(filled.max(0) as u64)
    }

    /// Phase 3. Drops the temporary default if it is still there. Returns
    /// whether a default was dropped.
    pub async fn finalize_constraint(&self, manager: &SchemaManager<'_>) -> Result<bool, StepError> {
        let phase = Phase::FinalizeConstraint;
        let conn = manager.get_connection();

        let Some(default) = column_default(conn)
            .await
            .map_err(|e| StepError::from_db(phase, e))?
        else {
            info!(table = TABLE, column = COLUMN, "No default on column, nothing to finalize");
            return Ok(false);
        };
        debug!(%default, "Dropping temporary sku default");

        let result = match manager.get_database_backend() {
            DbBackend::Sqlite => rebuild_sqlite_table(manager).await,
            backend => conn
                .execute_unprepared(&drop_default_sql(backend))
                .await
                .map(|_| ()),
        };
        result.map_err(|e| StepError::from_db(phase, e))?;

        Ok(true)
    }
}

/// Current default expression of `authorized_part.sku`, `None` when the
/// column has no default.
pub async fn column_default<C>(conn: &C) -> Result<Option<String>, DbErr>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();
    let sql = match backend {
        DbBackend::Postgres => {
            "SELECT column_default::text AS column_default FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2"
        }
        DbBackend::MySql => {
            "SELECT COLUMN_DEFAULT AS column_default FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_NAME = ?"
        }
        DbBackend::Sqlite => {
            "SELECT dflt_value AS column_default FROM pragma_table_info(?) WHERE name = ?"
        }
    };
    let stmt = Statement::from_sql_and_values(backend, sql, [TABLE.into(), COLUMN.into()]);

    match conn.query_one(stmt).await? {
        Some(row) => row.try_get("", "column_default"),
        None => Err(DbErr::Custom(format!("column {}.{} not found", TABLE, COLUMN))),
    }
}

fn drop_default_sql(backend: DbBackend) -> String {
    match backend {
        DbBackend::MySql => format!("ALTER TABLE `{}` ALTER COLUMN `{}` DROP DEFAULT", TABLE, COLUMN),
        _ => format!(r#"ALTER TABLE "{}" ALTER COLUMN "{}" DROP DEFAULT"#, TABLE, COLUMN),
    }
}

/// SQLite cannot alter a column default in place: recreate the table with
/// `sku` required and no default, copy the rows across and swap the tables.
async fn rebuild_sqlite_table(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let mut create = Table::create();
    create.table(Alias::new(REBUILD_TABLE));
    for column in base::columns() {
        create.col(column);
    }
    create.col(
        ColumnDef::new(AuthorizedPart::Sku)
            .string_len(SKU_MAX_LEN as u32)
            .not_null(),
    );
    manager.create_table(create.to_owned()).await?;

    let columns = base::COLUMN_NAMES
        .iter()
        .chain([COLUMN].iter())
        .map(|name| format!(r#""{}""#, name))
        .collect::<Vec<_>>()
        .join(", ");
    manager
        .get_connection()
        .execute_unprepared(&format!(
            r#"INSERT INTO "{}" ({cols}) SELECT {cols} FROM "{}""#,
            REBUILD_TABLE,
            TABLE,
            cols = columns
        ))
        .await?;

    manager
        .drop_table(Table::drop().table(AuthorizedPart::Table).to_owned())
        .await?;
    manager
        .rename_table(
            Table::rename()
                .table(Alias::new(REBUILD_TABLE), AuthorizedPart::Table)
                .to_owned(),
        )
        .await?;

    for index in base::indexes() {
        manager.create_index(index).await?;
    }

    debug!(table = TABLE, "Rebuilt table without sku default");
    Ok(())
}

#[derive(DeriveIden)]
pub(crate) enum AuthorizedPart {
    Table,
    Id,
    PartNumber,
    Sku,
}
