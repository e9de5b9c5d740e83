use std::fmt;

use sea_orm_migration::prelude::DbErr;
use thiserror::Error;

use crate::sku_rules::SkuTooLong;

/// Phase of the `sku` schema evolution that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AddColumn,
    Backfill,
    FinalizeConstraint,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AddColumn => "add_column",
            Phase::Backfill => "backfill",
            Phase::FinalizeConstraint => "finalize_constraint",
        };
        f.write_str(name)
    }
}

/// A row whose derived SKU does not fit the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowViolation {
    pub id: i32,
    pub overflow: SkuTooLong,
}

impl fmt::Display for RowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.id, self.overflow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintReason {
    /// Derived SKUs longer than the column allows. Every offending row is listed.
    SkuTooLong(Vec<RowViolation>),
    /// The engine rejected a NULL `sku`.
    NotNull(String),
}

impl fmt::Display for ConstraintReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintReason::SkuTooLong(rows) => {
                write!(f, "{} row(s) would overflow sku", rows.len())?;
                for row in rows {
                    write!(f, "; {}", row)?;
                }
                Ok(())
            }
            ConstraintReason::NotNull(msg) => write!(f, "not-null violation: {}", msg),
        }
    }
}

/// Failure of the `sku` schema evolution, tagged with the failing phase.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{phase}: column {table}.{column} already exists (migration already applied or name taken)")]
    SchemaConflict {
        phase: Phase,
        table: &'static str,
        column: &'static str,
    },

    #[error("{phase}: constraint violation: {reason}")]
    ConstraintViolation { phase: Phase, reason: ConstraintReason },

    #[error("{phase}: lock wait timed out, step may be retried: {source}")]
    TransientLockTimeout {
        phase: Phase,
        #[source]
        source: DbErr,
    },

    #[error("{phase}: database error: {source}")]
    Database {
        phase: Phase,
        #[source]
        source: DbErr,
    },
}

impl StepError {
    /// Classify an engine error raised during `phase`.
    pub fn from_db(phase: Phase, err: DbErr) -> Self {
        let msg = err.to_string().to_lowercase();

        if is_lock_timeout(&msg) {
            return StepError::TransientLockTimeout { phase, source: err };
        }
        if is_not_null_violation(&msg) {
            return StepError::ConstraintViolation {
                phase,
                reason: ConstraintReason::NotNull(err.to_string()),
            };
        }
        StepError::Database { phase, source: err }
    }

    pub fn phase(&self) -> Phase {
        match self {
            StepError::SchemaConflict { phase, .. }
            | StepError::ConstraintViolation { phase, .. }
            | StepError::TransientLockTimeout { phase, .. }
            | StepError::Database { phase, .. } => *phase,
        }
    }

    /// Whether the caller may retry the whole step.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StepError::TransientLockTimeout { .. })
    }
}

impl From<StepError> for DbErr {
    fn from(err: StepError) -> Self {
        DbErr::Migration(err.to_string())
    }
}

/// Engine messages for an existing column, across Postgres, MySQL and SQLite.
pub(crate) fn is_duplicate_column(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    msg.contains("duplicate column") || (msg.contains("column") && msg.contains("already exists"))
}

fn is_lock_timeout(msg: &str) -> bool {
    msg.contains("lock timeout")
        || msg.contains("lock wait timeout")
        || msg.contains("could not obtain lock")
        || msg.contains("deadlock")
        || msg.contains("database is locked")
        || msg.contains("database table is locked")
}

fn is_not_null_violation(msg: &str) -> bool {
    msg.contains("not-null constraint")
        || msg.contains("not null constraint failed")
        || msg.contains("cannot be null")
}
