use super::config::InMemoryClientConfig;
use super::fail_point::{FailPoint, FailPoints, Operation};
use super::session::InMemorySession;
use super::state::{DatabaseState, IndexSpec};
use crate::client::{ClientSession, DocumentClient, DocumentClientProvider, IndexModel, OperationOptions};
use crate::common::{Document, Value};
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use dashmap::DashMap;
use indexmap::IndexSet;
use std::sync::Arc;

/// In-memory implementation of a document database client.
///
/// # Purpose
/// `InMemoryClient` behaves like a small document database server: it keeps
/// databases of collections, enforces unique indexes atomically, runs a set of
/// administrative commands and supports sessions with transactions. It is used
/// by tests and demos, and as a reference for bindings to real databases.
///
/// # Characteristics
/// - **Thread-Safe**: clones share state; many drivers can use one client
/// - **Atomic Writes**: each write holds the lock of its database
/// - **Commands**: `ping`, `create`, `drop`, `insert`, `update`, `delete`,
///   `createIndexes`, `dropIndexes`, `renameCollection`
/// - **Fault Injection**: [FailPoint]s and simulated latency
/// - **Introspection**: per-operation counters and data accessors
///
/// # Usage
/// ```text
/// let memory = InMemoryClient::default();
/// let client = memory.clone().into_client();
/// let driver = DocumentDriver::new(client, "app")?;
/// assert_eq!(memory.operation_count(Operation::Insert), 0);
/// ```
#[derive(Clone)]
pub struct InMemoryClient {
    inner: Arc<InMemoryClientInner>,
}

impl InMemoryClient {
    pub fn new(config: InMemoryClientConfig) -> Self {
        InMemoryClient {
            inner: Arc::new(InMemoryClientInner::new(config)),
        }
    }

    /// Wraps a clone of this client into a [DocumentClient] handle.
    pub fn into_client(self) -> DocumentClient {
        DocumentClient::new(self)
    }

    pub fn configure_fail_point(&self, fail_point: FailPoint) {
        self.inner.fail_points.configure(fail_point);
    }

    pub fn clear_fail_points(&self) {
        self.inner.fail_points.clear();
    }

    /// Number of operations of the given type issued so far, failed ones included.
    pub fn operation_count(&self, operation: Operation) -> usize {
        self.inner.fail_points.count(operation)
    }

    pub fn total_operations(&self) -> usize {
        self.inner.fail_points.total()
    }

    pub fn reset_counters(&self) {
        self.inner.fail_points.reset_counters();
    }

    /// Documents of a collection in insertion order.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.inner
            .databases
            .get(database)
            .and_then(|db| db.collection(collection).map(|c| c.documents().to_vec()))
            .unwrap_or_default()
    }

    pub fn collection_names(&self, database: &str) -> Vec<String> {
        self.inner
            .databases
            .get(database)
            .map(|db| db.collection_names())
            .unwrap_or_default()
    }

    pub fn index_names(&self, database: &str, collection: &str) -> Vec<String> {
        self.inner
            .databases
            .get(database)
            .and_then(|db| db.collection(collection).map(|c| c.index_names()))
            .unwrap_or_default()
    }
}

impl Default for InMemoryClient {
    fn default() -> Self {
        Self::new(InMemoryClientConfig::default())
    }
}

impl DocumentClientProvider for InMemoryClient {
    fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Document,
        options: &OperationOptions,
    ) -> MigrateResult<Value> {
        self.inner.check(Operation::Insert, options)?;
        let namespace = format!("{}.{}", database, collection);
        let mut db = self.inner.databases.entry(database.to_string()).or_default();
        db.collection_mut(collection).insert(&namespace, document)
    }

    fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &OperationOptions,
    ) -> MigrateResult<Option<Document>> {
        self.inner.check(Operation::Find, options)?;
        Ok(self
            .inner
            .databases
            .get(database)
            .and_then(|db| db.collection(collection).and_then(|c| c.find_one(filter))))
    }

    fn delete_many(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &OperationOptions,
    ) -> MigrateResult<u64> {
        self.inner.check(Operation::Delete, options)?;
        match self.inner.databases.get_mut(database) {
            Some(mut db) => Ok(db
                .existing_collection_mut(collection)
                .map(|c| c.delete(filter, false))
                .unwrap_or(0)),
            None => Ok(0),
        }
    }

    fn drop_collection(
        &self,
        database: &str,
        collection: &str,
        options: &OperationOptions,
    ) -> MigrateResult<()> {
        self.inner.check(Operation::Drop, options)?;
        if let Some(mut db) = self.inner.databases.get_mut(database) {
            db.drop_collection(collection);
        }
        Ok(())
    }

    fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: IndexModel,
        options: &OperationOptions,
    ) -> MigrateResult<String> {
        self.inner.check(Operation::CreateIndex, options)?;
        if index.keys.is_empty() {
            return Err(MigrateError::new(
                "index keys must not be empty",
                ErrorKind::InvalidCommand,
            ));
        }
        let namespace = format!("{}.{}", database, collection);
        let spec = IndexSpec {
            name: index.resolved_name(),
            keys: index.keys,
            unique: index.options.unique,
        };
        let mut db = self.inner.databases.entry(database.to_string()).or_default();
        db.collection_mut(collection).create_index(&namespace, spec)
    }

    fn run_command(
        &self,
        database: &str,
        command: &Document,
        session: Option<&mut dyn ClientSession>,
    ) -> MigrateResult<Document> {
        if let Some(session) = session {
            let session = session
                .as_any_mut()
                .downcast_mut::<InMemorySession>()
                .filter(|s| s.belongs_to(&self.inner))
                .ok_or_else(|| {
                    MigrateError::new(
                        "session was not started by this client",
                        ErrorKind::InvalidCommand,
                    )
                })?;
            if session.in_transaction() {
                return session.run_in_transaction(database, command);
            }
        }

        self.inner
            .fail_points
            .check(Operation::Command, command.first_key())?;
        let mut db = self.inner.databases.entry(database.to_string()).or_default();
        db.execute(database, command)
    }

    fn start_session(&self) -> MigrateResult<Box<dyn ClientSession>> {
        self.inner.fail_points.check(Operation::StartSession, None)?;
        Ok(Box::new(InMemorySession::new(self.inner.clone())))
    }
}

pub(crate) struct InMemoryClientInner {
    config: InMemoryClientConfig,
    databases: DashMap<String, DatabaseState>,
    fail_points: FailPoints,
}

impl InMemoryClientInner {
    fn new(config: InMemoryClientConfig) -> Self {
        InMemoryClientInner {
            config,
            databases: DashMap::new(),
            fail_points: FailPoints::default(),
        }
    }

    pub(crate) fn fail_points(&self) -> &FailPoints {
        &self.fail_points
    }

    /// Counts the operation, applies fail points, then the caller's deadline.
    fn check(&self, operation: Operation, options: &OperationOptions) -> MigrateResult<()> {
        self.fail_points.check(operation, None)?;
        if let Some(timeout) = options.timeout {
            if self.config.simulated_latency() > timeout {
                return Err(MigrateError::new(
                    &format!("{:?} exceeded time limit of {:?}", operation, timeout),
                    ErrorKind::Timeout,
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn snapshot(&self, database: &str) -> DatabaseState {
        self.databases
            .get(database)
            .map(|db| db.clone())
            .unwrap_or_default()
    }

    /// Applies the collections a transaction wrote to the live database.
    pub(crate) fn merge(&self, database: &str, staged: &DatabaseState, written: &IndexSet<String>) {
        if written.is_empty() {
            return;
        }
        self.databases
            .entry(database.to_string())
            .or_default()
            .merge_collections(staged, written);
    }
}
