/// Error type for the stratum crate.
///
/// Every variant is terminal: nothing is retried internally, and a run stops
/// at the first error it encounters. Errors returned by user migration
/// procedures are propagated verbatim, never wrapped in one of these variants.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The database identifier is not one of the supported dialects.
    #[error("unrecognized database: {0}")]
    UnrecognizedDatabase(String),
    /// The action is not one of `up` or `down`.
    #[error("unrecognized action: {0}")]
    UnrecognizedAction(String),
    /// A downgrade was requested but no registered migration matches the
    /// recorded current version. This happens when the registry has changed
    /// between runs and no longer contains the migration that produced the
    /// database's current state.
    #[error("previous migration not found for version {0}")]
    PreviousMigrationNotFound(i64),
    /// A migration with this version has already been registered.
    #[error("version {0} already registered")]
    VersionAlreadyRegistered(i64),
    /// The most recent history row is an in-flight marker: a prior run was
    /// interrupted before recording completion. Blocks every subsequent run
    /// until resolved with [`Runner::resolve_interrupted`](crate::Runner::resolve_interrupted).
    #[error("migration at version {0} is already running")]
    MigrationAlreadyRunning(i64),
    /// Wraps an underlying data-access failure (connection, syntax,
    /// constraint).
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("{0}")]
    Generic(String),
}

#[cfg(feature = "postgres")]
impl From<postgres::Error> for Error {
    fn from(value: postgres::Error) -> Self {
        Self::Execution(value.to_string())
    }
}

#[cfg(feature = "mysql")]
impl From<mysql::Error> for Error {
    fn from(value: mysql::Error) -> Self {
        Self::Execution(value.to_string())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Generic(value)
    }
}
