//! MySQL support.
//!
//! Implements [SqlExecutor] for [`mysql::Conn`], so a blocking MySQL
//! connection can be handed to [`Runner::run`](crate::Runner::run) directly.
//!
//! Note that MySQL DDL statements cause an implicit commit and cannot be
//! rolled back; keep migrations small and idempotent (`IF EXISTS` /
//! `IF NOT EXISTS`) so a failed run leaves as little partial state as
//! possible.

use mysql::prelude::Queryable;
use mysql::Conn;

use crate::error::Error;
use crate::executor::{SqlExecutor, Value};
use crate::history::HistoryRow;

// Re-export mysql types for use in migrations
pub use mysql::Conn as MysqlConn;

impl SqlExecutor for Conn {
    fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, Error> {
        if params.is_empty() {
            self.query_drop(statement)?;
        } else {
            let bound: Vec<mysql::Value> = params
                .iter()
                .map(|value| match value {
                    Value::BigInt(version) => mysql::Value::Int(*version),
                    Value::Bool(running) => mysql::Value::from(*running),
                })
                .collect();
            self.exec_drop(statement, mysql::Params::Positional(bound))?;
        }
        Ok(self.affected_rows())
    }

    fn query_version_row(&mut self, statement: &str) -> Result<Option<HistoryRow>, Error> {
        let row: Option<(i64, bool)> = self.query_first(statement)?;
        Ok(row.map(|(version, running)| HistoryRow { version, running }))
    }
}
