use std::time::Duration;

/// Collection holding the migration state by default.
pub const DEFAULT_MIGRATIONS_COLLECTION: &str = "schema_migrations";

/// Collection holding the advisory lock record by default.
pub const DEFAULT_LOCKING_COLLECTION: &str = "migrate_advisory_lock";

/// Default name of the unique index on the lock key.
pub const DEFAULT_LOCK_INDEX_NAME: &str = "lock_unique_key";

/// Deadline of lock and version operations. Command execution is unbounded.
pub const CONTEXT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// The single value every lock record carries in [LOCK_KEY_FIELD]. The unique
/// index on that field lets at most one record exist.
pub(crate) const LOCK_KEY_UNIQUE_VALUE: i32 = 0;

pub(crate) const LOCK_KEY_FIELD: &str = "locking_key";
pub(crate) const VERSION_FIELD: &str = "version";
pub(crate) const DIRTY_FIELD: &str = "dirty";

/// Locking behaviour of the driver.
///
/// Locking is disabled by default. Empty names fall back to
/// [DEFAULT_LOCKING_COLLECTION] and [DEFAULT_LOCK_INDEX_NAME] when the
/// configuration is handed to [super::DriverBuilder::locking].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockingConfig {
    /// Collection where the lock record is stored.
    pub collection_name: String,
    /// Name of the unique index required by the locking process.
    pub index_name: String,
    /// Enables or disables locking.
    pub enabled: bool,
}

impl LockingConfig {
    /// An enabled configuration with default names.
    pub fn enabled() -> Self {
        LockingConfig {
            enabled: true,
            ..Default::default()
        }
        .with_defaults()
    }

    pub fn with_collection_name(mut self, collection_name: &str) -> Self {
        self.collection_name = collection_name.to_string();
        self
    }

    pub fn with_index_name(mut self, index_name: &str) -> Self {
        self.index_name = index_name.to_string();
        self
    }

    pub(crate) fn with_defaults(mut self) -> Self {
        if self.collection_name.is_empty() {
            self.collection_name = DEFAULT_LOCKING_COLLECTION.to_string();
        }
        if self.index_name.is_empty() {
            self.index_name = DEFAULT_LOCK_INDEX_NAME.to_string();
        }
        self
    }
}

/// Settings of a [super::DocumentDriver], fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub(crate) database_name: String,
    pub(crate) migrations_collection: String,
    pub(crate) transaction_mode: bool,
    pub(crate) locking: LockingConfig,
}

impl DriverConfig {
    /// Database holding the migration state and receiving migration commands.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn migrations_collection(&self) -> &str {
        &self.migrations_collection
    }

    /// Whether a migration's commands run inside one transaction.
    pub fn transaction_mode(&self) -> bool {
        self.transaction_mode
    }

    pub fn locking(&self) -> &LockingConfig {
        &self.locking
    }
}
