use super::logging::DriverLogger;
use crate::client::{ClientSession, Database, DocumentClient};
use crate::common::ext_json::parse_command_batch;
use crate::common::Document;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use std::io::Read;

/// An ordered list of database commands decoded from a migration payload.
///
/// The payload is a JSON array of command documents in extended JSON, for
/// example:
/// ```text
/// [
///   {"create": "users"},
///   {"createIndexes": "users", "indexes": [{"key": {"email": 1}, "name": "email_1", "unique": true}]}
/// ]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CommandBatch {
    commands: Vec<Document>,
}

impl CommandBatch {
    /// Decodes a payload. Nothing is sent to the database while decoding.
    pub fn parse(payload: &[u8]) -> MigrateResult<Self> {
        let commands = parse_command_batch(payload)?;
        Ok(CommandBatch { commands })
    }

    /// Reads a payload to its end and decodes it.
    pub fn from_reader(reader: &mut dyn Read) -> MigrateResult<Self> {
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        Self::parse(&payload)
    }

    pub fn commands(&self) -> &[Document] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Sends the commands of a batch to the database, one at a time and in order.
pub(crate) struct MigrationExecutor {
    client: DocumentClient,
    database: Database,
    transaction_mode: bool,
    logger: DriverLogger,
}

impl MigrationExecutor {
    pub(crate) fn new(
        client: DocumentClient,
        database: Database,
        transaction_mode: bool,
        logger: DriverLogger,
    ) -> Self {
        MigrationExecutor {
            client,
            database,
            transaction_mode,
            logger,
        }
    }

    pub(crate) fn execute(&self, batch: &CommandBatch) -> MigrateResult<()> {
        if batch.is_empty() {
            self.logger
                .verbose(format_args!("Migration has no commands, nothing to execute"));
            return Ok(());
        }

        if self.transaction_mode {
            self.execute_in_transaction(batch)?;
        } else {
            self.execute_commands(batch, None)?;
        }

        self.logger.info(format_args!(
            "Executed {} migration command(s) on {} ({})",
            batch.len(),
            self.database.name(),
            if self.transaction_mode { "transactional" } else { "sequential" }
        ));
        Ok(())
    }

    fn execute_in_transaction(&self, batch: &CommandBatch) -> MigrateResult<()> {
        let mut session = self.client.start_session().map_err(|e| {
            MigrateError::new_with_cause("failed to start session", ErrorKind::TransactionStartFailed, e)
        })?;

        session.start_transaction().map_err(|e| {
            MigrateError::new_with_cause(
                "failed to start transaction",
                ErrorKind::TransactionStartFailed,
                e,
            )
        })?;
        self.logger.verbose(format_args!(
            "Started transaction in session {} for {} command(s)",
            session.id(),
            batch.len()
        ));

        // a failed command has already aborted the transaction server side,
        // so the error is returned as is without an abort call
        self.execute_commands(batch, Some(session.as_mut()))?;

        session.commit_transaction().map_err(|e| {
            self.logger.error(format_args!(
                "Commit of session {} failed: {}",
                session.id(),
                e
            ));
            MigrateError::new_with_cause(
                "failed to commit transaction",
                ErrorKind::TransactionCommitFailed,
                e,
            )
        })?;

        self.logger
            .verbose(format_args!("Committed transaction in session {}", session.id()));
        Ok(())
    }

    fn execute_commands(
        &self,
        batch: &CommandBatch,
        mut session: Option<&mut dyn ClientSession>,
    ) -> MigrateResult<()> {
        for (position, command) in batch.commands().iter().enumerate() {
            self.logger
                .verbose(format_args!("Executing command {}: {}", position, command));

            let session = session.as_mut().map(|s| &mut **s as &mut dyn ClientSession);
            if let Err(e) = self.database.run_command(command, session) {
                self.logger.error(format_args!(
                    "Command {} failed on database {}: {}",
                    position,
                    self.database.name(),
                    e
                ));
                return Err(MigrateError::new_with_cause(
                    &format!("failed to execute command {}: {}", position, command),
                    ErrorKind::CommandExecutionFailed,
                    e,
                ));
            }
        }
        Ok(())
    }
}
