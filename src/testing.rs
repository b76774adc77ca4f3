//! Testing utilities: an in-memory [SqlExecutor] for exercising the runner
//! without a live database.

use crate::error::Error;
use crate::executor::{SqlExecutor, Value};
use crate::history::HistoryRow;

/// An in-memory executor that models just enough SQL for the runner: the
/// version-history table, plus a log of every statement it is handed.
///
/// Statements issued by user migration procedures are recorded and otherwise
/// ignored, so procedures can be asserted on without a database. A failure can
/// be injected with [`MemoryExecutor::fail_on`]; any statement containing the
/// fragment then errors instead of executing, which exercises the engine's
/// data-access failure paths.
///
/// ```
/// use stratum::testing::MemoryExecutor;
/// use stratum::{FnMigration, Runner};
///
/// let mut db = MemoryExecutor::new();
/// let mut runner = Runner::new();
/// runner.register(Box::new(FnMigration::new(1))).unwrap();
///
/// let report = runner.run(&mut db, &["postgres", "up"]).unwrap();
/// assert_eq!(report.version, 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    table_exists: bool,
    rows: Vec<HistoryRow>,
    statements: Vec<String>,
    fail_on: Option<String>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error on any statement containing `fragment`.
    pub fn fail_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_on = Some(fragment.into());
        self
    }

    /// Seed a history row directly, as if a prior run had recorded it.
    pub fn seed_row(&mut self, version: i64, running: bool) {
        self.table_exists = true;
        self.rows.push(HistoryRow { version, running });
    }

    /// Every history row recorded so far, oldest first.
    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    /// Every statement handed to this executor, in order, including failed
    /// ones.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    fn check_failure(&self, statement: &str) -> Result<(), Error> {
        match &self.fail_on {
            Some(fragment) if statement.contains(fragment.as_str()) => Err(Error::Execution(
                format!("injected failure on `{fragment}`"),
            )),
            _ => Ok(()),
        }
    }
}

impl SqlExecutor for MemoryExecutor {
    fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, Error> {
        self.statements.push(statement.to_string());
        self.check_failure(statement)?;

        if statement.starts_with("CREATE TABLE IF NOT EXISTS migrations") {
            self.table_exists = true;
            return Ok(0);
        }

        if statement.starts_with("INSERT INTO migrations") {
            if !self.table_exists {
                return Err(Error::Execution(
                    "table `migrations` does not exist".to_string(),
                ));
            }
            let row = match params {
                [Value::BigInt(version), Value::Bool(running)] => HistoryRow {
                    version: *version,
                    running: *running,
                },
                other => {
                    return Err(Error::Execution(format!(
                        "unexpected parameters: {other:?}"
                    )))
                }
            };
            self.rows.push(row);
            return Ok(1);
        }

        // Anything else is user migration SQL; recording it is enough.
        Ok(0)
    }

    fn query_version_row(&mut self, statement: &str) -> Result<Option<HistoryRow>, Error> {
        self.statements.push(statement.to_string());
        self.check_failure(statement)?;

        if !self.table_exists {
            return Err(Error::Execution(
                "table `migrations` does not exist".to_string(),
            ));
        }
        Ok(self.rows.last().copied())
    }
}
