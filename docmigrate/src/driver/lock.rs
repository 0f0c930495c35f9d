use super::config::{
    LockingConfig, CONTEXT_WAIT_TIMEOUT, LOCK_KEY_FIELD, LOCK_KEY_UNIQUE_VALUE,
};
use super::logging::DriverLogger;
use crate::client::{Collection, Database, IndexModel, OperationOptions};
use crate::common::{Document, Value};
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use sysinfo::System;

/// Advisory lock backed by a unique index.
///
/// Acquiring inserts the single lock record; the unique index on
/// `locking_key` makes every concurrent insert but one fail. Releasing deletes
/// the record. A lock left behind by a crashed holder stays until it is
/// removed by hand.
pub(crate) struct AdvisoryLock {
    collection: Collection,
    config: LockingConfig,
    locked: AtomicBool,
    logger: DriverLogger,
}

impl AdvisoryLock {
    pub(crate) fn new(database: &Database, config: LockingConfig, logger: DriverLogger) -> Self {
        AdvisoryLock {
            collection: database.collection(&config.collection_name),
            config,
            locked: AtomicBool::new(false),
            logger,
        }
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Creates the unique index the lock relies on. Safe to repeat.
    pub(crate) fn prepare(&self) -> MigrateResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let mut keys = Document::new();
        keys.put(LOCK_KEY_FIELD, -1)?;
        let index = IndexModel::new(keys)
            .with_name(&self.config.index_name)
            .with_unique(true);

        match self.collection.create_index(index, &timeout()) {
            Ok(name) => {
                self.logger.debug(format_args!(
                    "Lock index {} ready on {}",
                    name,
                    self.collection.namespace()
                ));
                Ok(())
            }
            Err(e) => {
                self.logger.error(format_args!(
                    "Failed to create lock index {} on {}: {}",
                    self.config.index_name,
                    self.collection.namespace(),
                    e
                ));
                Err(MigrateError::new_with_cause(
                    "failed to prepare advisory lock",
                    ErrorKind::LockPreparationFailed,
                    e,
                ))
            }
        }
    }

    pub(crate) fn lock(&self) -> MigrateResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        if self.is_locked() {
            self.logger.debug(format_args!(
                "Advisory lock in {} already held",
                self.collection.namespace()
            ));
            return Ok(());
        }

        match self.collection.insert_one(lock_record()?, &timeout()) {
            Ok(_) => {
                self.locked.store(true, Ordering::Release);
                self.logger.info(format_args!(
                    "Acquired advisory lock in {}",
                    self.collection.namespace()
                ));
                Ok(())
            }
            Err(e) => {
                self.logger.warn(format_args!(
                    "Could not acquire advisory lock in {}: {}",
                    self.collection.namespace(),
                    e
                ));
                Err(MigrateError::database_locked(e))
            }
        }
    }

    pub(crate) fn unlock(&self) -> MigrateResult<()> {
        if !self.config.enabled || !self.is_locked() {
            return Ok(());
        }

        let mut filter = Document::new();
        filter.put(LOCK_KEY_FIELD, LOCK_KEY_UNIQUE_VALUE)?;

        match self.collection.delete_many(&filter, &timeout()) {
            Ok(removed) => {
                self.locked.store(false, Ordering::Release);
                self.logger.info(format_args!(
                    "Released advisory lock in {} ({} record(s) removed)",
                    self.collection.namespace(),
                    removed
                ));
                Ok(())
            }
            Err(e) => {
                self.logger.error(format_args!(
                    "Failed to release advisory lock in {}: {}",
                    self.collection.namespace(),
                    e
                ));
                Err(MigrateError::new_with_cause(
                    "failed to release advisory lock",
                    ErrorKind::LockReleaseFailed,
                    e,
                ))
            }
        }
    }
}

fn timeout() -> OperationOptions {
    OperationOptions::with_timeout(CONTEXT_WAIT_TIMEOUT)
}

fn lock_record() -> MigrateResult<Document> {
    let pid = std::process::id();
    let hostname = System::host_name()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("unknown-host-{}", pid));

    let mut record = Document::new();
    record.put(LOCK_KEY_FIELD, LOCK_KEY_UNIQUE_VALUE)?;
    record.put("pid", Value::I64(pid as i64))?;
    record.put("hostname", hostname)?;
    record.put("created_at", Utc::now())?;
    Ok(record)
}
