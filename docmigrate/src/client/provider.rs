use crate::common::{Document, Value};
use crate::errors::MigrateResult;
use std::time::Duration;

/// Low-level interface of a document database client.
///
/// # Purpose
/// Defines the handful of operations the migration driver needs from a
/// database binding. A binding for a concrete database implements this trait
/// and is wrapped into a [super::DocumentClient]; the driver never talks to a
/// provider directly.
///
/// # Contract
/// - Every operation addresses a collection by database name and collection
///   name. Missing databases and collections are created on first write.
/// - Operations taking [OperationOptions] must fail with
///   [crate::errors::ErrorKind::Timeout] when they cannot complete within
///   `options.timeout`, without applying their effect.
/// - A write rejected by a unique index fails with
///   [crate::errors::ErrorKind::DuplicateKey].
/// - Dropping a collection that does not exist succeeds.
/// - Creating an index that already exists with the same name and keys
///   succeeds and returns the index name.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; one client is typically shared by many
/// drivers.
pub trait DocumentClientProvider: Send + Sync {
    /// Inserts one document and returns its `_id`.
    fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Document,
        options: &OperationOptions,
    ) -> MigrateResult<Value>;

    /// Returns the first document matching `filter`, if any.
    fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &OperationOptions,
    ) -> MigrateResult<Option<Document>>;

    /// Deletes every document matching `filter` and returns how many were removed.
    fn delete_many(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &OperationOptions,
    ) -> MigrateResult<u64>;

    /// Drops a collection together with its indexes.
    fn drop_collection(
        &self,
        database: &str,
        collection: &str,
        options: &OperationOptions,
    ) -> MigrateResult<()>;

    /// Creates an index and returns its name.
    fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: IndexModel,
        options: &OperationOptions,
    ) -> MigrateResult<String>;

    /// Runs an administrative command against `database`.
    ///
    /// When `session` has a transaction in progress the command runs inside it.
    /// Command execution carries no deadline.
    fn run_command(
        &self,
        database: &str,
        command: &Document,
        session: Option<&mut dyn ClientSession>,
    ) -> MigrateResult<Document>;

    /// Starts a new session.
    fn start_session(&self) -> MigrateResult<Box<dyn ClientSession>>;
}

/// A logical session on a client, used to group commands into a transaction.
///
/// Dropping a session that still has a transaction in progress aborts that
/// transaction.
pub trait ClientSession: Send {
    /// Unique identifier of the session.
    fn id(&self) -> &str;

    /// Starts a transaction on this session.
    fn start_transaction(&mut self) -> MigrateResult<()>;

    /// Commits the transaction in progress.
    fn commit_transaction(&mut self) -> MigrateResult<()>;

    /// Aborts the transaction in progress.
    ///
    /// A server may already have aborted the transaction because one of its
    /// commands failed; aborting again is then reported as an error.
    fn abort_transaction(&mut self) -> MigrateResult<()>;

    /// Returns `true` while a transaction is open on this session.
    fn in_transaction(&self) -> bool;

    /// Allows providers to recover their concrete session type.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationOptions {
    /// Deadline of the call. `None` means the call may block for as long as
    /// the database needs.
    pub timeout: Option<Duration>,
}

impl OperationOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        OperationOptions {
            timeout: Some(timeout),
        }
    }

    pub fn unbounded() -> Self {
        OperationOptions { timeout: None }
    }
}

/// Description of an index to create.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexModel {
    /// Indexed fields with their direction (`1` or `-1`), in order.
    pub keys: Document,
    pub options: IndexOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexOptions {
    /// Explicit index name. Defaults to `<field>_<direction>` joined by `_`.
    pub name: Option<String>,
    /// Reject documents that repeat an indexed key.
    pub unique: bool,
}

impl IndexModel {
    pub fn new(keys: Document) -> Self {
        IndexModel {
            keys,
            options: IndexOptions::default(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.options.name = Some(name.to_string());
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.options.unique = unique;
        self
    }

    /// The explicit name, or the conventional name derived from the keys.
    pub fn resolved_name(&self) -> String {
        match &self.options.name {
            Some(name) => name.clone(),
            None => self
                .keys
                .iter()
                .map(|(field, direction)| format!("{}_{}", field, direction))
                .collect::<Vec<_>>()
                .join("_"),
        }
    }

    /// The indexed field names, in order.
    pub fn fields(&self) -> Vec<String> {
        self.keys.keys().map(str::to_string).collect()
    }
}
