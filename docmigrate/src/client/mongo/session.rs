use super::convert::{from_bson_document, to_bson_document};
use super::error::to_migrate_error;
use crate::client::ClientSession;
use crate::common::Document;
use crate::errors::MigrateResult;
use mongodb::sync::{ClientSession as MongoClientSession, Database};
use std::any::Any;

/// Session of a [super::MongoProvider].
///
/// Dropping the session ends it on the server, which aborts an open
/// transaction.
pub struct MongoSession {
    id: String,
    session: MongoClientSession,
    in_transaction: bool,
}

impl MongoSession {
    pub(crate) fn new(session: MongoClientSession) -> Self {
        MongoSession {
            id: session.id().to_string(),
            session,
            in_transaction: false,
        }
    }

    pub(crate) fn run_command(
        &mut self,
        database: &Database,
        command: &Document,
    ) -> MigrateResult<Document> {
        let name = command.first_key().unwrap_or_default().to_string();
        match database.run_command_with_session(to_bson_document(command)?, None, &mut self.session) {
            Ok(reply) => from_bson_document(reply),
            Err(e) => {
                // the server aborts the transaction of a failed command
                self.in_transaction = false;
                Err(to_migrate_error(&format!("command {}", name), e))
            }
        }
    }
}

impl ClientSession for MongoSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn start_transaction(&mut self) -> MigrateResult<()> {
        self.session
            .start_transaction(None)
            .map_err(|e| to_migrate_error("start transaction", e))?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit_transaction(&mut self) -> MigrateResult<()> {
        let result = self.session.commit_transaction();
        self.in_transaction = false;
        result.map_err(|e| to_migrate_error("commit transaction", e))
    }

    fn abort_transaction(&mut self) -> MigrateResult<()> {
        let result = self.session.abort_transaction();
        self.in_transaction = false;
        result.map_err(|e| to_migrate_error("abort transaction", e))
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
