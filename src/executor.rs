//! The SQL capability seam between the runner and a concrete database.

use crate::error::Error;
use crate::history::HistoryRow;

/// A value bound as a positional statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    BigInt(i64),
    Bool(bool),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Blocking SQL capabilities the runner requires from a database connection.
///
/// The engine is agnostic to the concrete database behind this trait; the
/// configured [`Dialect`](crate::Dialect) only decides which statement strings
/// are issued through it. Migration procedures receive the same executor, so
/// they can read data, transform it in Rust, and write it back.
///
/// Implementations are provided for `postgres::Client` and `mysql::Conn`
/// behind the matching cargo features. Tests use
/// [`testing::MemoryExecutor`](crate::testing::MemoryExecutor).
///
/// Every operation blocks until completion or failure; callers that need
/// timeouts must impose them at the connection layer.
pub trait SqlExecutor {
    /// Execute a statement with positional parameters, returning the number
    /// of affected rows.
    fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, Error>;

    /// Run a query expected to yield at most one `{version, running}` row of
    /// the version-history table.
    fn query_version_row(&mut self, statement: &str) -> Result<Option<HistoryRow>, Error>;
}
