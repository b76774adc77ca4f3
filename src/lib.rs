//! `stratum` is a compact, code-first library for running versioned database
//! schema migrations.
//!
//! Core concepts:
//! - Migrations are plain Rust: each one is a `version` plus `up`/`down`
//!   procedures that receive a live connection through the [SqlExecutor]
//!   capability, so a migration can query data, transform it in Rust, and
//!   write it back rather than being limited to prepared SQL strings.
//! - The database's position is tracked in an append-only `migrations` table.
//!   The most recent row is authoritative, and every step is bracketed by an
//!   in-flight marker row and a completion row, which turns an interrupted
//!   run into a detectable, recoverable state instead of a silent re-run or
//!   skip.
//!
//! # Running migrations
//!
//! Register migrations on a [Runner] (typically once at startup), then hand
//! [`Runner::run`] a live connection and a handful of option tokens naming
//! the dialect and direction:
//!
//! ```no_run
//! use postgres::{Client, NoTls};
//! use stratum::{FnMigration, Runner};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runner = Runner::new();
//!     runner.register(Box::new(
//!         FnMigration::new(1)
//!             .named("create users")
//!             .with_up(|db| {
//!                 db.execute("CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT)", &[])?;
//!                 Ok(())
//!             })
//!             .with_down(|db| {
//!                 db.execute("DROP TABLE users", &[])?;
//!                 Ok(())
//!             }),
//!     ))?;
//!
//!     let mut client = Client::connect("postgres://postgres@localhost/app", NoTls)?;
//!     let report = runner.run(&mut client, &["postgres", "up"])?;
//!     if report.changed {
//!         println!("migrated to version {}", report.version);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Options default to `{up, postgres}`; unrecognized tokens are ignored. A
//! `"down"` token reverts exactly one step per run.
//!
//! # Partial failure
//!
//! Migrations apply one at a time, in ascending version order, and the run
//! stops at the first error: earlier migrations in the batch stay committed,
//! and the report carries the last committed version together with the error.
//! The failing step's in-flight marker remains in the history table, so every
//! later run fails fast with [`Error::MigrationAlreadyRunning`] instead of
//! guessing whether the interrupted procedure took effect. Once you have
//! inspected the database, clear the marker explicitly with
//! [`Runner::resolve_interrupted`].
//!
//! This guard is cooperative, not transactional: two processes racing into
//! `run` can both pass the check before either records a marker. True mutual
//! exclusion needs an external lock such as a database advisory lock.
//!
//! # Database support
//!
//! - PostgreSQL via the `postgres` feature (on by default)
//! - MySQL via the `mysql` feature (on by default)
//!
//! Any other connection type can participate by implementing [SqlExecutor].
//! The `testing` feature exposes [`testing::MemoryExecutor`] for exercising
//! migration logic without a database, and the `tracing` feature logs each
//! migration step.

mod dialect;
mod error;
mod executor;
mod history;
mod options;
mod registry;
mod runner;

pub use dialect::{Dialect, HISTORY_TABLE_NAME};
pub use error::Error;
pub use executor::{SqlExecutor, Value};
pub use history::{HistoryRow, HistoryTable};
pub use options::{Action, Config};
pub use registry::{FnMigration, Migration, Registry};
pub use runner::{RunReport, Runner};

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
