//! The migration engine and its public entry points.

use std::time::{Duration, Instant};

use crate::error::Error;
use crate::executor::SqlExecutor;
use crate::history::HistoryTable;
use crate::options::{Action, Config};
use crate::registry::{Migration, Registry};

/// The outcome contract returned to every caller of [`Runner::run`].
#[derive(Debug)]
pub struct RunReport {
    /// Whether the recorded version changed during this run.
    pub changed: bool,
    /// The best-known committed version: on success the version reached, on a
    /// mid-batch failure the last version whose completion was recorded.
    pub version: i64,
    /// Versions whose steps completed during this run, in execution order.
    pub migrations_run: Vec<i64>,
    /// The error that stopped the run early, if any. Steps completed before
    /// it remain committed; nothing is rolled back.
    pub failure: Option<Error>,
}

impl RunReport {
    /// True when the run completed without error.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    fn empty() -> Self {
        Self {
            changed: false,
            version: 0,
            migrations_run: Vec::new(),
            failure: None,
        }
    }
}

type StepStartHook = Box<dyn Fn(i64, &str) + Send + Sync>;
type StepCompleteHook = Box<dyn Fn(i64, &str, Duration) + Send + Sync>;
type StepErrorHook = Box<dyn Fn(i64, &str, &Error) + Send + Sync>;

/// The entrypoint for running registered migrations against a database.
///
/// A runner owns its [Registry] and drives one logical transition per [run]
/// invocation: forward through every pending migration in ascending version
/// order, or backward by exactly one step. Each step is bracketed by history
/// rows (an in-flight marker before the procedure, a completion row after),
/// so a crash mid-step is detected on the next run instead of being silently
/// resumed or re-applied.
///
/// [run]: Runner::run
pub struct Runner {
    registry: Registry,
    on_migration_start: Option<StepStartHook>,
    on_migration_complete: Option<StepCompleteHook>,
    on_migration_error: Option<StepErrorHook>,
}

// Manual Debug impl since the hook closures don't implement Debug
impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("registry", &self.registry)
            .field("on_migration_start", &self.on_migration_start.is_some())
            .field(
                "on_migration_complete",
                &self.on_migration_complete.is_some(),
            )
            .field("on_migration_error", &self.on_migration_error.is_some())
            .finish()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }

    /// Wrap an already-populated registry.
    pub fn from_registry(registry: Registry) -> Self {
        Self {
            registry,
            on_migration_start: None,
            on_migration_complete: None,
            on_migration_error: None,
        }
    }

    /// Add a migration to the registry. Fails with
    /// [`Error::VersionAlreadyRegistered`] on a duplicate version.
    pub fn register(&mut self, migration: Box<dyn Migration>) -> Result<(), Error> {
        self.registry.register(migration)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Set a callback to be invoked when a migration step starts.
    /// The callback receives the migration version and name.
    pub fn on_migration_start<F>(mut self, callback: F) -> Self
    where
        F: Fn(i64, &str) + Send + Sync + 'static,
    {
        self.on_migration_start = Some(Box::new(callback));
        self
    }

    /// Set a callback to be invoked when a migration step completes.
    /// The callback receives the migration version, name, and duration.
    pub fn on_migration_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(i64, &str, Duration) + Send + Sync + 'static,
    {
        self.on_migration_complete = Some(Box::new(callback));
        self
    }

    /// Set a callback to be invoked when a migration step fails.
    /// The callback receives the migration version, name, and error.
    pub fn on_migration_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(i64, &str, &Error) + Send + Sync + 'static,
    {
        self.on_migration_error = Some(Box::new(callback));
        self
    }

    /// Run one logical transition, interpreting `tokens` as described in
    /// [`Config::from_tokens`].
    ///
    /// `Err` means the run could not start: the bookkeeping table could not
    /// be ensured, the current version could not be read, or a prior run left
    /// an in-flight marker ([`Error::MigrationAlreadyRunning`]). An `Ok`
    /// report carrying a `failure` means stepping began and stopped early;
    /// its `version` is then the last committed version, and earlier steps of
    /// the batch remain applied.
    pub fn run<S: AsRef<str>>(
        &self,
        db: &mut dyn SqlExecutor,
        tokens: &[S],
    ) -> Result<RunReport, Error> {
        self.run_with_config(db, Config::from_tokens(tokens))
    }

    /// [run](Runner::run) with an explicit configuration.
    pub fn run_with_config(
        &self,
        db: &mut dyn SqlExecutor,
        config: Config,
    ) -> Result<RunReport, Error> {
        // Nothing registered is a no-op, not an error; no SQL is issued.
        if self.registry.is_empty() {
            return Ok(RunReport::empty());
        }

        let sorted = self.registry.sorted();
        let history = HistoryTable::new(config.dialect);

        history.ensure_table(db)?;
        let old_version = history.current_version(db)?;

        let (version, migrations_run, failure) = match config.action {
            Action::Up => self.run_up(db, &history, &sorted, old_version),
            Action::Down => self.run_down(db, &history, &sorted, old_version),
        };

        Ok(RunReport {
            changed: old_version != version,
            version,
            migrations_run,
            failure,
        })
    }

    /// Clear an in-flight marker left by an interrupted run.
    ///
    /// An interrupted step leaves the most recent history row with
    /// `running = true`, which blocks every subsequent run. After inspecting
    /// the database, call this with the version that reflects reality: the
    /// marker's version if the interrupted procedure did complete, or the
    /// last completed version if it did not. Refuses to record anything
    /// unless the latest row actually is an in-flight marker; nothing is
    /// ever cleared automatically.
    pub fn resolve_interrupted<S: AsRef<str>>(
        &self,
        db: &mut dyn SqlExecutor,
        tokens: &[S],
        version: i64,
    ) -> Result<(), Error> {
        let config = Config::from_tokens(tokens);
        let history = HistoryTable::new(config.dialect);

        match history.latest_row(db)? {
            Some(row) if row.running => history.record_version(db, version, false),
            _ => Err(Error::Generic(
                "no interrupted migration to resolve".to_string(),
            )),
        }
    }

    /// Walk every migration with a version strictly greater than the current
    /// one, ascending, stopping at the first failure. Returns the last
    /// committed version, the versions completed in this batch, and the error
    /// that stopped the walk, if any.
    fn run_up(
        &self,
        db: &mut dyn SqlExecutor,
        history: &HistoryTable,
        sorted: &[&dyn Migration],
        old_version: i64,
    ) -> (i64, Vec<i64>, Option<Error>) {
        let mut version = old_version;
        let mut completed = Vec::new();

        for migration in sorted.iter().filter(|m| m.version() > old_version) {
            if let Err(error) = self.step(db, history, *migration, migration.version(), Action::Up)
            {
                return (version, completed, Some(error));
            }
            version = migration.version();
            completed.push(version);
        }

        (version, completed, None)
    }

    /// Revert a single step: the registered migration with the greatest
    /// version at or below the current one. On any failure the reported
    /// version is the unchanged current version.
    fn run_down(
        &self,
        db: &mut dyn SqlExecutor,
        history: &HistoryTable,
        sorted: &[&dyn Migration],
        old_version: i64,
    ) -> (i64, Vec<i64>, Option<Error>) {
        if old_version == 0 {
            return (0, Vec::new(), None);
        }

        let Some(migration) = sorted.iter().rev().find(|m| m.version() <= old_version) else {
            return (
                old_version,
                Vec::new(),
                Some(Error::PreviousMigrationNotFound(old_version)),
            );
        };

        let target = migration.version() - 1;
        match self.step(db, history, *migration, target, Action::Down) {
            Ok(()) => (target, vec![migration.version()], None),
            Err(error) => (old_version, Vec::new(), Some(error)),
        }
    }

    /// One migration step: record the in-flight marker at `mark_version`, run
    /// the procedure, record completion at the same version. A failure at any
    /// point leaves the marker in place for the next run to trip over.
    fn step(
        &self,
        db: &mut dyn SqlExecutor,
        history: &HistoryTable,
        migration: &dyn Migration,
        mark_version: i64,
        action: Action,
    ) -> Result<(), Error> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "migration_step",
            version = migration.version(),
            name = %migration.name(),
            action = %action,
        )
        .entered();

        #[cfg(feature = "tracing")]
        tracing::info!("starting migration step");

        if let Some(ref callback) = self.on_migration_start {
            callback(migration.version(), &migration.name());
        }

        let started = Instant::now();
        let result = self.apply(db, history, migration, mark_version, action);

        match &result {
            Ok(()) => {
                let elapsed = started.elapsed();

                #[cfg(feature = "tracing")]
                tracing::info!(
                    duration_ms = elapsed.as_millis() as u64,
                    "migration step completed"
                );

                if let Some(ref callback) = self.on_migration_complete {
                    callback(migration.version(), &migration.name(), elapsed);
                }
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %error, "migration step failed");

                if let Some(ref callback) = self.on_migration_error {
                    callback(migration.version(), &migration.name(), error);
                }
            }
        }

        result
    }

    fn apply(
        &self,
        db: &mut dyn SqlExecutor,
        history: &HistoryTable,
        migration: &dyn Migration,
        mark_version: i64,
        action: Action,
    ) -> Result<(), Error> {
        history.record_version(db, mark_version, true)?;
        match action {
            Action::Up => migration.up(db)?,
            Action::Down => migration.down(db)?,
        }
        history.record_version(db, mark_version, false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::history::HistoryRow;
    use crate::registry::FnMigration;
    use crate::testing::MemoryExecutor;

    fn noop(version: i64) -> Box<FnMigration> {
        Box::new(FnMigration::new(version))
    }

    #[test]
    fn empty_registry_is_a_no_op() {
        let mut db = MemoryExecutor::new();
        let runner = Runner::new();
        let report = runner.run::<&str>(&mut db, &[]).unwrap();
        assert!(!report.changed);
        assert_eq!(report.version, 0);
        assert!(report.is_success());
        assert!(db.statements().is_empty());
    }

    #[test]
    fn up_applies_a_pending_migration() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();

        let report = runner.run(&mut db, &["postgres", "up"]).unwrap();
        assert!(report.changed);
        assert_eq!(report.version, 1);
        assert_eq!(report.migrations_run, vec![1]);
        assert!(report.is_success());
        assert_eq!(
            db.rows(),
            &[
                HistoryRow { version: 1, running: true },
                HistoryRow { version: 1, running: false },
            ]
        );
    }

    #[test]
    fn up_is_idempotent_at_the_boundary() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();

        runner.run(&mut db, &["up"]).unwrap();
        let report = runner.run(&mut db, &["up"]).unwrap();
        assert!(!report.changed);
        assert_eq!(report.version, 1);
        assert!(report.migrations_run.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn up_walks_every_pending_migration_in_order() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner.register(noop(2)).unwrap();
        runner.register(noop(1)).unwrap();

        let report = runner.run(&mut db, &["up"]).unwrap();
        assert_eq!(report.version, 2);
        assert_eq!(report.migrations_run, vec![1, 2]);
        assert_eq!(
            db.rows(),
            &[
                HistoryRow { version: 1, running: true },
                HistoryRow { version: 1, running: false },
                HistoryRow { version: 2, running: true },
                HistoryRow { version: 2, running: false },
            ]
        );
    }

    #[test]
    fn up_skips_versions_at_or_below_the_current_one() {
        let mut db = MemoryExecutor::new();
        db.seed_row(5, false);
        let mut runner = Runner::new();
        for version in 1..=3 {
            runner.register(noop(version)).unwrap();
        }

        let report = runner.run(&mut db, &["up"]).unwrap();
        assert!(!report.changed);
        assert_eq!(report.version, 5);
        assert!(report.migrations_run.is_empty());
    }

    #[test]
    fn migration_procedures_receive_the_executor() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner
            .register(Box::new(FnMigration::new(1).with_up(|db| {
                db.execute("CREATE TABLE users (id SERIAL PRIMARY KEY)", &[])?;
                Ok(())
            })))
            .unwrap();

        runner.run(&mut db, &["up"]).unwrap();
        assert!(db
            .statements()
            .iter()
            .any(|s| s == "CREATE TABLE users (id SERIAL PRIMARY KEY)"));
    }

    #[test]
    fn up_stops_at_the_first_failing_migration() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();
        runner
            .register(Box::new(FnMigration::new(2).with_up(|_| {
                Err(Error::Generic("boom".to_string()))
            })))
            .unwrap();

        let report = runner.run(&mut db, &["up"]).unwrap();
        assert!(report.changed);
        assert_eq!(report.version, 1);
        assert_eq!(report.migrations_run, vec![1]);
        assert!(matches!(report.failure, Some(Error::Generic(ref m)) if m == "boom"));
        // The failing migration's in-flight marker stays behind.
        assert_eq!(db.rows().last(), Some(&HistoryRow { version: 2, running: true }));

        // Which blocks the next attempt until resolved.
        let err = runner.run(&mut db, &["up"]).unwrap_err();
        assert!(matches!(err, Error::MigrationAlreadyRunning(2)));
    }

    #[test]
    fn up_reports_no_progress_when_marking_fails() {
        let mut db = MemoryExecutor::new().fail_on("INSERT");
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();

        let report = runner.run(&mut db, &["up"]).unwrap();
        assert!(!report.changed);
        assert_eq!(report.version, 0);
        assert!(matches!(report.failure, Some(Error::Execution(_))));
    }

    #[test]
    fn down_reverts_a_single_step() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();

        runner.run(&mut db, &["up"]).unwrap();
        let report = runner.run(&mut db, &["down"]).unwrap();
        assert!(report.changed);
        assert_eq!(report.version, 0);
        assert_eq!(report.migrations_run, vec![1]);
        assert_eq!(db.rows().last(), Some(&HistoryRow { version: 0, running: false }));
    }

    #[test]
    fn down_at_version_zero_is_a_no_op() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();

        runner.run(&mut db, &["up"]).unwrap();
        runner.run(&mut db, &["down"]).unwrap();
        let report = runner.run(&mut db, &["down"]).unwrap();
        assert!(!report.changed);
        assert_eq!(report.version, 0);
        assert!(report.migrations_run.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn down_steps_back_one_migration_at_a_time() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();
        runner.register(noop(2)).unwrap();

        runner.run(&mut db, &["up"]).unwrap();
        let report = runner.run(&mut db, &["down"]).unwrap();
        assert_eq!(report.version, 1);
        let report = runner.run(&mut db, &["down"]).unwrap();
        assert_eq!(report.version, 0);
    }

    #[test]
    fn down_without_a_matching_migration_fails() {
        let mut db = MemoryExecutor::new();
        db.seed_row(1, false);
        let mut runner = Runner::new();
        runner.register(noop(2)).unwrap();

        let report = runner.run(&mut db, &["down"]).unwrap();
        assert!(!report.changed);
        assert_eq!(report.version, 1);
        assert!(matches!(
            report.failure,
            Some(Error::PreviousMigrationNotFound(1))
        ));
    }

    #[test]
    fn down_with_a_failing_procedure_reports_the_old_version() {
        let mut db = MemoryExecutor::new();
        db.seed_row(1, false);
        let mut runner = Runner::new();
        runner
            .register(Box::new(FnMigration::new(1).with_down(|_| {
                Err(Error::Generic("cannot drop".to_string()))
            })))
            .unwrap();

        let report = runner.run(&mut db, &["down"]).unwrap();
        assert!(!report.changed);
        assert_eq!(report.version, 1);
        assert!(matches!(report.failure, Some(Error::Generic(ref m)) if m == "cannot drop"));
        assert_eq!(db.rows().last(), Some(&HistoryRow { version: 0, running: true }));

        let err = runner.run(&mut db, &["down"]).unwrap_err();
        assert!(matches!(err, Error::MigrationAlreadyRunning(0)));
    }

    #[test]
    fn table_creation_failure_aborts_the_run() {
        let mut db = MemoryExecutor::new().fail_on("CREATE TABLE IF NOT EXISTS");
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();

        let err = runner.run(&mut db, &["up"]).unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
        assert!(db.rows().is_empty());
    }

    #[test]
    fn unrecognized_tokens_fall_back_to_defaults() {
        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();

        let report = runner.run(&mut db, &["sideways"]).unwrap();
        assert_eq!(report.version, 1);
        // Default dialect is postgres: positional markers are $n.
        assert!(db.statements().iter().any(|s| s.contains("$1")));
    }

    #[test]
    fn resolve_interrupted_clears_a_stuck_marker() {
        let mut db = MemoryExecutor::new();
        db.seed_row(2, true);
        let mut runner = Runner::new();
        runner.register(noop(1)).unwrap();
        runner.register(noop(2)).unwrap();

        let err = runner.run(&mut db, &["up"]).unwrap_err();
        assert!(matches!(err, Error::MigrationAlreadyRunning(2)));

        runner.resolve_interrupted(&mut db, &["postgres"], 2).unwrap();
        let report = runner.run(&mut db, &["up"]).unwrap();
        assert!(!report.changed);
        assert_eq!(report.version, 2);
    }

    #[test]
    fn resolve_interrupted_refuses_a_completed_history() {
        let mut db = MemoryExecutor::new();
        db.seed_row(1, false);
        let runner = Runner::new();

        let err = runner
            .resolve_interrupted(&mut db, &["postgres"], 1)
            .unwrap_err();
        assert!(matches!(err, Error::Generic(_)));
        assert_eq!(db.rows().len(), 1);
    }

    #[test]
    fn hooks_observe_each_step() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(Mutex::new(Vec::new()));
        let failed = Arc::new(Mutex::new(Vec::new()));

        let mut db = MemoryExecutor::new();
        let mut runner = Runner::new()
            .on_migration_start({
                let started = Arc::clone(&started);
                move |version, _name| started.lock().unwrap().push(version)
            })
            .on_migration_complete({
                let completed = Arc::clone(&completed);
                move |version, _name, _duration| completed.lock().unwrap().push(version)
            })
            .on_migration_error({
                let failed = Arc::clone(&failed);
                move |version, _name, _error| failed.lock().unwrap().push(version)
            });
        runner.register(noop(1)).unwrap();
        runner
            .register(Box::new(FnMigration::new(2).with_up(|_| {
                Err(Error::Generic("boom".to_string()))
            })))
            .unwrap();

        runner.run(&mut db, &["up"]).unwrap();
        assert_eq!(*started.lock().unwrap(), vec![1, 2]);
        assert_eq!(*completed.lock().unwrap(), vec![1]);
        assert_eq!(*failed.lock().unwrap(), vec![2]);
    }
}
