//! The version-history bookkeeping table.

use crate::dialect::Dialect;
use crate::error::Error;
use crate::executor::{SqlExecutor, Value};

/// One row of the version-history table, as read back by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRow {
    pub version: i64,
    /// Whether this row's transition was still in progress when recorded.
    pub running: bool,
}

/// Owns all access to the version-history table.
///
/// The table is append-only: rows are never updated or deleted by normal
/// operation, and the row with the greatest surrogate id is the authoritative
/// current state. Each migration step records two rows, an in-flight marker
/// (`running = true`) before the procedure runs and a completion row
/// (`running = false`) after it, so an interruption between the two is
/// detectable on the next read.
#[derive(Debug, Clone, Copy)]
pub struct HistoryTable {
    dialect: Dialect,
}

impl HistoryTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Create the version-history table if it does not exist. Idempotent.
    pub fn ensure_table(&self, db: &mut dyn SqlExecutor) -> Result<(), Error> {
        db.execute(self.dialect.create_history_table(), &[])?;
        Ok(())
    }

    /// The version recorded by the most recent row, or `0` for a pristine
    /// database.
    ///
    /// A most-recent row with `running = true` means a prior run was
    /// interrupted before recording completion. That state must not be
    /// silently resumed or re-applied, so this fails with
    /// [`Error::MigrationAlreadyRunning`] until resolved externally.
    pub fn current_version(&self, db: &mut dyn SqlExecutor) -> Result<i64, Error> {
        match self.latest_row(db)? {
            None => Ok(0),
            Some(HistoryRow { version, running: true }) => {
                Err(Error::MigrationAlreadyRunning(version))
            }
            Some(HistoryRow { version, .. }) => Ok(version),
        }
    }

    /// Append a `{version, running}` row. Existing rows are never touched.
    pub fn record_version(
        &self,
        db: &mut dyn SqlExecutor,
        version: i64,
        running: bool,
    ) -> Result<(), Error> {
        db.execute(
            self.dialect.insert_version(),
            &[Value::BigInt(version), Value::Bool(running)],
        )?;
        Ok(())
    }

    /// The most recent row without the in-flight check, for repair tooling.
    pub fn latest_row(&self, db: &mut dyn SqlExecutor) -> Result<Option<HistoryRow>, Error> {
        db.query_version_row(self.dialect.select_latest_version())
    }
}
