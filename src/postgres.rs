//! PostgreSQL support.
//!
//! Implements [SqlExecutor] for [`postgres::Client`], so a blocking postgres
//! connection can be handed to [`Runner::run`](crate::Runner::run) directly.
//!
//! ```ignore
//! use postgres::{Client, NoTls};
//! use stratum::Runner;
//!
//! let mut client = Client::connect("postgres://postgres@localhost/app", NoTls)?;
//! let report = runner.run(&mut client, &["postgres", "up"])?;
//! ```

use postgres::types::ToSql;
use postgres::Client;

use crate::error::Error;
use crate::executor::{SqlExecutor, Value};
use crate::history::HistoryRow;

// Re-export postgres types for use in migrations
pub use postgres::Client as PostgresClient;

impl SqlExecutor for Client {
    fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, Error> {
        let bound: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|value| match value {
                Value::BigInt(version) => version as &(dyn ToSql + Sync),
                Value::Bool(running) => running as &(dyn ToSql + Sync),
            })
            .collect();
        Ok(Client::execute(self, statement, &bound)?)
    }

    fn query_version_row(&mut self, statement: &str) -> Result<Option<HistoryRow>, Error> {
        let row = self.query_opt(statement, &[])?;
        Ok(row.map(|row| HistoryRow {
            version: row.get(0),
            running: row.get(1),
        }))
    }
}
