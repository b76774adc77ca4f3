//! Migration definitions and the registry that holds them.

use crate::error::Error;
use crate::executor::SqlExecutor;

/// A versioned pair of forward/backward change procedures.
///
/// The `version` value is the ordering key. It is assigned by the author, must
/// be unique among all migrations given to one registry, and must never change
/// once the migration has been applied to any database. Both procedures
/// default to no-ops, so a migration may supply only the direction it needs.
/// `name` only aids debugging and logging.
pub trait Migration {
    fn version(&self) -> i64;

    /// Apply this migration.
    fn up(&self, _db: &mut dyn SqlExecutor) -> Result<(), Error> {
        Ok(())
    }

    /// Revert this migration.
    fn down(&self, _db: &mut dyn SqlExecutor) -> Result<(), Error> {
        Ok(())
    }

    fn name(&self) -> String {
        format!("Migration {}", self.version())
    }
}

impl PartialEq for dyn Migration {
    fn eq(&self, other: &Self) -> bool {
        self.version() == other.version()
    }
}

impl std::fmt::Debug for dyn Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version())
            .field("name", &self.name())
            .finish()
    }
}

type StepFn = Box<dyn Fn(&mut dyn SqlExecutor) -> Result<(), Error> + Send + Sync>;

/// A [Migration] assembled from closures, for callers that prefer not to
/// declare a struct per migration.
///
/// ```
/// use stratum::FnMigration;
///
/// let migration = FnMigration::new(1)
///     .named("create users")
///     .with_up(|db| {
///         db.execute("CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT)", &[])?;
///         Ok(())
///     })
///     .with_down(|db| {
///         db.execute("DROP TABLE users", &[])?;
///         Ok(())
///     });
/// ```
pub struct FnMigration {
    version: i64,
    name: Option<String>,
    up: Option<StepFn>,
    down: Option<StepFn>,
}

impl FnMigration {
    /// A migration with the given version and no-op procedures.
    pub fn new(version: i64) -> Self {
        Self {
            version,
            name: None,
            up: None,
            down: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_up<F>(mut self, up: F) -> Self
    where
        F: Fn(&mut dyn SqlExecutor) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.up = Some(Box::new(up));
        self
    }

    pub fn with_down<F>(mut self, down: F) -> Self
    where
        F: Fn(&mut dyn SqlExecutor) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.down = Some(Box::new(down));
        self
    }
}

impl Migration for FnMigration {
    fn version(&self) -> i64 {
        self.version
    }

    fn up(&self, db: &mut dyn SqlExecutor) -> Result<(), Error> {
        match &self.up {
            Some(step) => step(db),
            None => Ok(()),
        }
    }

    fn down(&self, db: &mut dyn SqlExecutor) -> Result<(), Error> {
        match &self.down {
            Some(step) => step(db),
            None => Ok(()),
        }
    }

    fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Migration {}", self.version))
    }
}

/// An explicit, caller-owned collection of migrations.
///
/// Versions must be unique; ordering is enforced lazily before each run, not
/// at insertion time. The registry has no internal locking: populate it
/// cooperatively, typically once at startup.
#[derive(Debug, Default)]
pub struct Registry {
    migrations: Vec<Box<dyn Migration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a migration. Fails with [`Error::VersionAlreadyRegistered`] if its
    /// version is already present; the registry is left unchanged in that
    /// case.
    pub fn register(&mut self, migration: Box<dyn Migration>) -> Result<(), Error> {
        let version = migration.version();
        if self.migrations.iter().any(|m| m.version() == version) {
            return Err(Error::VersionAlreadyRegistered(version));
        }
        self.migrations.push(migration);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// The registered migrations in ascending version order.
    pub(crate) fn sorted(&self) -> Vec<&dyn Migration> {
        let mut sorted: Vec<&dyn Migration> =
            self.migrations.iter().map(|m| m.as_ref()).collect();
        sorted.sort_by_key(|m| m.version());
        sorted
    }
}
