use super::client::InMemoryClientInner;
use super::fail_point::Operation;
use super::state::{collections_written_by, DatabaseState};
use crate::client::ClientSession;
use crate::common::Document;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use indexmap::IndexSet;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Transaction state of an [InMemorySession].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransactionState {
    /// No transaction was started
    None,
    /// Commands run against a private snapshot
    InProgress,
    /// The collections written by the transaction were applied
    Committed,
    /// The snapshot was discarded, either explicitly or because a command failed
    Aborted,
}

/// Session of an [super::InMemoryClient].
///
/// A transaction works on copies of the databases it touches. Commit applies
/// the collections the transaction wrote to the live databases, leaving
/// concurrent writes to other collections in place; abort discards the copies. A failing command aborts the transaction
/// on the spot, the way a database server does; a later explicit abort then
/// reports that the transaction is already aborted.
pub struct InMemorySession {
    id: String,
    client: Arc<InMemoryClientInner>,
    state: SessionTransactionState,
    staged: HashMap<String, StagedDatabase>,
}

/// Private copy of a database plus the collections written through it.
struct StagedDatabase {
    state: DatabaseState,
    written: IndexSet<String>,
}

impl InMemorySession {
    pub(crate) fn new(client: Arc<InMemoryClientInner>) -> Self {
        InMemorySession {
            id: Uuid::new_v4().to_string(),
            client,
            state: SessionTransactionState::None,
            staged: HashMap::new(),
        }
    }

    pub fn transaction_state(&self) -> SessionTransactionState {
        self.state
    }

    pub(crate) fn belongs_to(&self, client: &Arc<InMemoryClientInner>) -> bool {
        Arc::ptr_eq(&self.client, client)
    }

    /// Runs a command against the transaction snapshot. Any failure aborts
    /// the transaction.
    pub(crate) fn run_in_transaction(
        &mut self,
        database: &str,
        command: &Document,
    ) -> MigrateResult<Document> {
        let result = self.execute_staged(database, command);
        if let Err(e) = &result {
            log::debug!(
                "Command failed in transaction of session {}, aborting: {}",
                self.id,
                e.message()
            );
            self.discard(SessionTransactionState::Aborted);
        }
        result
    }

    fn execute_staged(&mut self, database: &str, command: &Document) -> MigrateResult<Document> {
        self.client
            .fail_points()
            .check(Operation::Command, command.first_key())?;

        let client = &self.client;
        let staged = self
            .staged
            .entry(database.to_string())
            .or_insert_with(|| StagedDatabase {
                state: client.snapshot(database),
                written: IndexSet::new(),
            });
        let reply = staged.state.execute(database, command)?;
        staged.written.extend(collections_written_by(database, command));
        Ok(reply)
    }

    fn discard(&mut self, state: SessionTransactionState) {
        self.staged.clear();
        self.state = state;
    }
}

impl ClientSession for InMemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn start_transaction(&mut self) -> MigrateResult<()> {
        self.client
            .fail_points()
            .check(Operation::StartTransaction, None)?;

        if self.state == SessionTransactionState::InProgress {
            return Err(MigrateError::new(
                "transaction already in progress",
                ErrorKind::TransactionError,
            ));
        }
        self.staged.clear();
        self.state = SessionTransactionState::InProgress;
        Ok(())
    }

    fn commit_transaction(&mut self) -> MigrateResult<()> {
        match self.state {
            SessionTransactionState::InProgress => {
                if let Err(e) = self.client.fail_points().check(Operation::Commit, None) {
                    self.discard(SessionTransactionState::Aborted);
                    return Err(e);
                }
                for (database, staged) in self.staged.drain() {
                    self.client.merge(&database, &staged.state, &staged.written);
                }
                self.state = SessionTransactionState::Committed;
                Ok(())
            }
            SessionTransactionState::Committed => Ok(()),
            SessionTransactionState::Aborted => Err(MigrateError::new(
                "cannot commit: transaction has been aborted",
                ErrorKind::TransactionError,
            )),
            SessionTransactionState::None => Err(MigrateError::new(
                "no transaction started",
                ErrorKind::TransactionError,
            )),
        }
    }

    fn abort_transaction(&mut self) -> MigrateResult<()> {
        self.client.fail_points().check(Operation::Abort, None)?;

        match self.state {
            SessionTransactionState::InProgress => {
                self.discard(SessionTransactionState::Aborted);
                Ok(())
            }
            SessionTransactionState::Aborted => Err(MigrateError::new(
                "transaction already aborted",
                ErrorKind::TransactionError,
            )),
            SessionTransactionState::Committed => Err(MigrateError::new(
                "cannot abort: transaction has been committed",
                ErrorKind::TransactionError,
            )),
            SessionTransactionState::None => Err(MigrateError::new(
                "no transaction started",
                ErrorKind::TransactionError,
            )),
        }
    }

    fn in_transaction(&self) -> bool {
        self.state == SessionTransactionState::InProgress
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        if self.state == SessionTransactionState::InProgress {
            log::debug!("Session {} closed with an open transaction, aborting", self.id);
            self.discard(SessionTransactionState::Aborted);
        }
    }
}
