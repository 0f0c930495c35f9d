use super::convert::{from_bson, from_bson_document, to_bson_document};
use super::error::{codes, server_code, to_migrate_error};
use super::session::MongoSession;
use crate::client::{ClientSession, DocumentClient, DocumentClientProvider, IndexModel, OperationOptions};
use crate::common::{Document, Value};
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use mongodb::bson;
use mongodb::options::{
    CreateIndexOptions, DeleteOptions, DropCollectionOptions, FindOneOptions, IndexOptions,
    InsertOneOptions, WriteConcern,
};
use mongodb::sync::{Client, Collection};
use mongodb::IndexModel as MongoIndexModel;

/// MongoDB binding of the client seam, built on the synchronous API of the
/// `mongodb` crate.
///
/// # Deadlines
/// `OperationOptions::timeout` is sent as `maxTimeMS` on reads and index
/// builds, and as the write concern's `wtimeout` on writes. Commands run
/// through [DocumentClientProvider::run_command] carry no deadline.
///
/// # Usage
/// ```text
/// let provider = MongoProvider::connect("mongodb://localhost:27017/?replicaSet=rs0")?;
/// let driver = DocumentDriver::builder()
///     .client(provider.into_client())
///     .database("app")
///     .transactions(true)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct MongoProvider {
    client: Client,
}

impl MongoProvider {
    pub fn new(client: Client) -> Self {
        MongoProvider { client }
    }

    /// Creates a client from a connection string.
    pub fn connect(uri: &str) -> MigrateResult<Self> {
        Client::with_uri_str(uri)
            .map(MongoProvider::new)
            .map_err(|e| to_migrate_error("connect", e))
    }

    /// Wraps this provider into a [DocumentClient] handle.
    pub fn into_client(self) -> DocumentClient {
        DocumentClient::new(self)
    }

    /// The underlying `mongodb` client.
    pub fn mongo_client(&self) -> &Client {
        &self.client
    }

    fn collection(&self, database: &str, collection: &str) -> Collection<bson::Document> {
        self.client
            .database(database)
            .collection::<bson::Document>(collection)
    }
}

impl DocumentClientProvider for MongoProvider {
    fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Document,
        options: &OperationOptions,
    ) -> MigrateResult<Value> {
        let mut insert = InsertOneOptions::default();
        insert.write_concern = write_concern(options);

        let result = self
            .collection(database, collection)
            .insert_one(to_bson_document(&document)?, insert)
            .map_err(|e| to_migrate_error(&format!("insert into {}.{}", database, collection), e))?;
        from_bson(result.inserted_id)
    }

    fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &OperationOptions,
    ) -> MigrateResult<Option<Document>> {
        let mut find = FindOneOptions::default();
        find.max_time = options.timeout;

        self.collection(database, collection)
            .find_one(to_bson_document(filter)?, find)
            .map_err(|e| to_migrate_error(&format!("find in {}.{}", database, collection), e))?
            .map(from_bson_document)
            .transpose()
    }

    fn delete_many(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &OperationOptions,
    ) -> MigrateResult<u64> {
        let mut delete = DeleteOptions::default();
        delete.write_concern = write_concern(options);

        let result = self
            .collection(database, collection)
            .delete_many(to_bson_document(filter)?, delete)
            .map_err(|e| to_migrate_error(&format!("delete from {}.{}", database, collection), e))?;
        Ok(result.deleted_count)
    }

    fn drop_collection(
        &self,
        database: &str,
        collection: &str,
        options: &OperationOptions,
    ) -> MigrateResult<()> {
        let mut drop = DropCollectionOptions::default();
        drop.write_concern = write_concern(options);

        match self.collection(database, collection).drop(drop) {
            Ok(()) => Ok(()),
            Err(e) if server_code(&e) == Some(codes::NAMESPACE_NOT_FOUND) => Ok(()),
            Err(e) => Err(to_migrate_error(&format!("drop {}.{}", database, collection), e)),
        }
    }

    fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: IndexModel,
        options: &OperationOptions,
    ) -> MigrateResult<String> {
        if index.keys.is_empty() {
            return Err(MigrateError::new(
                "index keys must not be empty",
                ErrorKind::InvalidCommand,
            ));
        }

        let mut index_options = IndexOptions::default();
        index_options.name = Some(index.resolved_name());
        index_options.unique = Some(index.options.unique);
        let mut model = MongoIndexModel::default();
        model.keys = to_bson_document(&index.keys)?;
        model.options = Some(index_options);

        let mut create = CreateIndexOptions::default();
        create.max_time = options.timeout;

        let result = self
            .collection(database, collection)
            .create_index(model, create)
            .map_err(|e| {
                to_migrate_error(&format!("create index on {}.{}", database, collection), e)
            })?;
        Ok(result.index_name)
    }

    fn run_command(
        &self,
        database: &str,
        command: &Document,
        session: Option<&mut dyn ClientSession>,
    ) -> MigrateResult<Document> {
        let db = self.client.database(database);
        if let Some(session) = session {
            let session = session
                .as_any_mut()
                .downcast_mut::<MongoSession>()
                .ok_or_else(|| {
                    MigrateError::new(
                        "session was not started by a MongoDB client",
                        ErrorKind::InvalidCommand,
                    )
                })?;
            return session.run_command(&db, command);
        }

        let name = command.first_key().unwrap_or_default().to_string();
        let reply = db
            .run_command(to_bson_document(command)?, None)
            .map_err(|e| to_migrate_error(&format!("command {}", name), e))?;
        from_bson_document(reply)
    }

    fn start_session(&self) -> MigrateResult<Box<dyn ClientSession>> {
        let session = self
            .client
            .start_session(None)
            .map_err(|e| to_migrate_error("start session", e))?;
        Ok(Box::new(MongoSession::new(session)))
    }
}

fn write_concern(options: &OperationOptions) -> Option<WriteConcern> {
    options.timeout.map(|timeout| {
        let mut concern = WriteConcern::default();
        concern.w_timeout = Some(timeout);
        concern
    })
}
