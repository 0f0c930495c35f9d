use super::{ClientSession, DocumentClientProvider, IndexModel, OperationOptions};
use crate::common::{Document, Value};
use crate::errors::MigrateResult;
use std::ops::Deref;
use std::sync::Arc;

/// Handle to a document database client.
///
/// # Purpose
/// Wraps a [DocumentClientProvider] behind an `Arc` so that the handle is
/// cheap to clone and can be shared by several drivers. The driver never owns
/// the client's lifecycle: closing a driver leaves the client untouched.
///
/// # Usage
/// ```text
/// let client = DocumentClient::new(my_provider);
/// let db = client.database("app");
/// let versions = db.collection("schema_migrations");
/// let current = versions.find_one(&doc! {}, &OperationOptions::unbounded())?;
/// ```
#[derive(Clone)]
pub struct DocumentClient {
    inner: Arc<dyn DocumentClientProvider>,
}

impl DocumentClient {
    pub fn new<T: DocumentClientProvider + 'static>(provider: T) -> Self {
        DocumentClient {
            inner: Arc::new(provider),
        }
    }

    /// Returns a handle to the named database.
    pub fn database(&self, name: &str) -> Database {
        Database {
            client: self.clone(),
            name: name.to_string(),
        }
    }

    /// Starts a new session on this client.
    pub fn start_session(&self) -> MigrateResult<Box<dyn ClientSession>> {
        self.inner.start_session()
    }
}

impl Deref for DocumentClient {
    type Target = Arc<dyn DocumentClientProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Handle to one database of a [DocumentClient].
#[derive(Clone)]
pub struct Database {
    client: DocumentClient,
    name: String,
}

impl Database {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &DocumentClient {
        &self.client
    }

    /// Returns a handle to the named collection of this database.
    pub fn collection(&self, name: &str) -> Collection {
        Collection {
            database: self.clone(),
            name: name.to_string(),
        }
    }

    /// Runs an administrative command, inside the session's transaction when
    /// one is given.
    pub fn run_command(
        &self,
        command: &Document,
        session: Option<&mut dyn ClientSession>,
    ) -> MigrateResult<Document> {
        self.client.run_command(&self.name, command, session)
    }
}

/// Handle to one collection of a [Database].
#[derive(Clone)]
pub struct Collection {
    database: Database,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database.name, self.name)
    }

    pub fn insert_one(&self, document: Document, options: &OperationOptions) -> MigrateResult<Value> {
        self.database
            .client
            .insert_one(&self.database.name, &self.name, document, options)
    }

    pub fn find_one(
        &self,
        filter: &Document,
        options: &OperationOptions,
    ) -> MigrateResult<Option<Document>> {
        self.database
            .client
            .find_one(&self.database.name, &self.name, filter, options)
    }

    pub fn delete_many(&self, filter: &Document, options: &OperationOptions) -> MigrateResult<u64> {
        self.database
            .client
            .delete_many(&self.database.name, &self.name, filter, options)
    }

    pub fn drop(&self, options: &OperationOptions) -> MigrateResult<()> {
        self.database
            .client
            .drop_collection(&self.database.name, &self.name, options)
    }

    pub fn create_index(&self, index: IndexModel, options: &OperationOptions) -> MigrateResult<String> {
        self.database
            .client
            .create_index(&self.database.name, &self.name, index, options)
    }
}
