use super::config::{DriverConfig, LockingConfig, DEFAULT_MIGRATIONS_COLLECTION};
use super::executor::{CommandBatch, MigrationExecutor};
use super::lock::AdvisoryLock;
use super::logging::DriverLogger;
use super::migration_driver::MigrationDriver;
use super::version::VersionStore;
use crate::client::DocumentClient;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use log::Log;
use std::io::Read;
use std::ops::Deref;
use std::sync::Arc;

/// Migration driver for a document database.
///
/// # Purpose
/// `DocumentDriver` records the migration state of one database in a
/// dedicated collection, serializes concurrent migration runs with an
/// advisory lock and executes migrations written as JSON arrays of database
/// commands.
///
/// # Characteristics
/// - **Cloneable**: clones share the same lock state
/// - **Client Agnostic**: works with any [crate::client::DocumentClientProvider]
/// - **Optional Locking**: disabled unless configured, then backed by a unique index
/// - **Transactions**: a migration can run inside one transaction
///
/// # Usage
/// ```text
/// let driver = DocumentDriver::builder()
///     .client(client)
///     .database("app")
///     .locking(LockingConfig::enabled())
///     .transactions(true)
///     .build()?;
///
/// driver.lock()?;
/// let (version, dirty) = driver.get_version()?;
/// driver.set_version(1, true)?;
/// driver.run_migration(&mut migration_file)?;
/// driver.set_version(1, false)?;
/// driver.unlock()?;
/// ```
#[derive(Clone)]
pub struct DocumentDriver {
    inner: Arc<DocumentDriverInner>,
}

impl DocumentDriver {
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Creates a driver with default settings: default migrations collection,
    /// no transactions and no locking.
    pub fn new(client: DocumentClient, database: &str) -> MigrateResult<Self> {
        Self::builder().client(client).database(database).build()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.inner.config
    }

    /// Whether this driver currently holds the advisory lock.
    pub fn is_locked(&self) -> bool {
        self.inner.lock.is_locked()
    }

    fn open(client: DocumentClient, config: DriverConfig, logger: DriverLogger) -> MigrateResult<Self> {
        let database = client.database(&config.database_name);
        let lock = AdvisoryLock::new(&database, config.locking.clone(), logger.clone());
        let versions = VersionStore::new(&database, &config.migrations_collection, logger.clone());
        let executor = MigrationExecutor::new(
            client.clone(),
            database,
            config.transaction_mode,
            logger.clone(),
        );

        lock.prepare()?;

        logger.verbose(format_args!(
            "Migration driver ready for database {} (collection: {}, transactions: {}, locking: {})",
            config.database_name,
            config.migrations_collection,
            config.transaction_mode,
            config.locking.enabled
        ));

        Ok(DocumentDriver {
            inner: Arc::new(DocumentDriverInner {
                config,
                lock,
                versions,
                executor,
                logger,
            }),
        })
    }
}

impl Deref for DocumentDriver {
    type Target = DriverConfig;

    fn deref(&self) -> &Self::Target {
        &self.inner.config
    }
}

struct DocumentDriverInner {
    config: DriverConfig,
    lock: AdvisoryLock,
    versions: VersionStore,
    executor: MigrationExecutor,
    logger: DriverLogger,
}

impl MigrationDriver for DocumentDriver {
    fn lock(&self) -> MigrateResult<()> {
        self.inner.lock.lock()
    }

    fn unlock(&self) -> MigrateResult<()> {
        self.inner.lock.unlock()
    }

    fn get_version(&self) -> MigrateResult<(u64, bool)> {
        self.inner.versions.get_version()
    }

    fn set_version(&self, version: u64, dirty: bool) -> MigrateResult<()> {
        self.inner.versions.set_version(version, dirty)
    }

    fn run_migration(&self, migration: &mut dyn Read) -> MigrateResult<()> {
        let batch = CommandBatch::from_reader(migration)?;
        self.inner.logger.verbose(format_args!(
            "Running migration with {} command(s) on {}",
            batch.len(),
            self.inner.config.database_name
        ));
        self.inner.executor.execute(&batch)
    }

    fn reset(&self) -> MigrateResult<()> {
        self.inner.versions.reset()
    }

    fn close(&self) -> MigrateResult<()> {
        if self.inner.lock.is_locked() {
            self.inner.logger.warn(format_args!(
                "Closing migration driver for {} while it still holds the advisory lock",
                self.inner.config.database_name
            ));
        }
        Ok(())
    }
}

/// Builder of [DocumentDriver].
///
/// Only the client and the database name are required. Empty collection
/// names fall back to their defaults.
#[derive(Default)]
pub struct DriverBuilder {
    client: Option<DocumentClient>,
    database_name: String,
    migrations_collection: String,
    transaction_mode: bool,
    locking: LockingConfig,
    logger: Option<Arc<dyn Log>>,
    verbose: bool,
}

impl DriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(mut self, client: DocumentClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn database(mut self, name: &str) -> Self {
        self.database_name = name.to_string();
        self
    }

    /// Collection holding the migration state. Defaults to `schema_migrations`.
    pub fn migrations_collection(mut self, name: &str) -> Self {
        self.migrations_collection = name.to_string();
        self
    }

    /// Runs every migration inside a single transaction.
    pub fn transactions(mut self, enabled: bool) -> Self {
        self.transaction_mode = enabled;
        self
    }

    pub fn locking(mut self, config: LockingConfig) -> Self {
        self.locking = config.with_defaults();
        self
    }

    /// Sends driver log records to `logger` instead of the global logger.
    pub fn logger(mut self, logger: Arc<dyn Log>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validates the settings and creates the driver. With locking enabled
    /// the lock index is created here.
    pub fn build(self) -> MigrateResult<DocumentDriver> {
        if self.database_name.is_empty() {
            return Err(MigrateError::no_database_name());
        }
        let client = self
            .client
            .ok_or_else(|| MigrateError::new("no database client", ErrorKind::NoClient))?;

        let migrations_collection = if self.migrations_collection.is_empty() {
            DEFAULT_MIGRATIONS_COLLECTION.to_string()
        } else {
            self.migrations_collection
        };

        let locking = self.locking.with_defaults();
        if locking.enabled && locking.collection_name == migrations_collection {
            return Err(MigrateError::new(
                &format!(
                    "locking collection must differ from the migrations collection {}",
                    migrations_collection
                ),
                ErrorKind::ConfigurationError,
            ));
        }

        let config = DriverConfig {
            database_name: self.database_name,
            migrations_collection,
            transaction_mode: self.transaction_mode,
            locking,
        };
        DocumentDriver::open(client, config, DriverLogger::new(self.logger, self.verbose))
    }
}
