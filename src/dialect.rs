//! Supported database dialects and the statements each one needs.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Name of the version-history table.
pub const HISTORY_TABLE_NAME: &str = "migrations";

/// A supported database dialect.
///
/// Each variant carries the dialect-specific statements the bookkeeping store
/// issues, so supporting a new database means adding one variant and its
/// statements here. An unsupported identifier is rejected when parsing, before
/// it can reach any statement path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
}

impl Dialect {
    /// Recognize a configuration token, if it names a supported dialect.
    pub(crate) fn token(token: &str) -> Option<Self> {
        match token {
            "postgres" => Some(Self::Postgres),
            "mysql" => Some(Self::MySql),
            _ => None,
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` for the version-history table.
    pub(crate) fn create_history_table(&self) -> &'static str {
        match self {
            Self::Postgres => {
                "CREATE TABLE IF NOT EXISTS migrations (id SERIAL PRIMARY KEY, version BIGINT NOT NULL, running BOOLEAN DEFAULT TRUE, created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW())"
            }
            Self::MySql => {
                "CREATE TABLE IF NOT EXISTS migrations (id BIGINT PRIMARY KEY AUTO_INCREMENT, version BIGINT NOT NULL, running BOOLEAN DEFAULT TRUE, created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)"
            }
        }
    }

    /// Append a `{version, running}` row, bound as positional parameters.
    pub(crate) fn insert_version(&self) -> &'static str {
        match self {
            Self::Postgres => "INSERT INTO migrations (version, running) VALUES ($1, $2)",
            Self::MySql => "INSERT INTO migrations (version, running) VALUES (?, ?)",
        }
    }

    /// Most recent history row; the greatest surrogate id is authoritative.
    pub(crate) fn select_latest_version(&self) -> &'static str {
        "SELECT version, running FROM migrations ORDER BY id DESC LIMIT 1"
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::token(s).ok_or_else(|| Error::UnrecognizedDatabase(s.to_string()))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::MySql => write!(f, "mysql"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_identifiers() {
        assert_eq!("postgres".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mysql".parse::<Dialect>().unwrap(), Dialect::MySql);
    }

    #[test]
    fn rejects_unsupported_identifier() {
        let err = "sqlite".parse::<Dialect>().unwrap_err();
        assert!(matches!(err, Error::UnrecognizedDatabase(ref db) if db == "sqlite"));
    }

    #[test]
    fn placeholders_match_dialect() {
        assert!(Dialect::Postgres.insert_version().contains("$1"));
        assert!(Dialect::MySql.insert_version().contains("?"));
    }

    #[test]
    fn history_table_carries_running_flag() {
        for dialect in [Dialect::Postgres, Dialect::MySql] {
            let ddl = dialect.create_history_table();
            assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS migrations"));
            assert!(ddl.contains("running BOOLEAN DEFAULT TRUE"));
        }
    }
}
