use super::config::{CONTEXT_WAIT_TIMEOUT, DIRTY_FIELD, VERSION_FIELD};
use super::logging::DriverLogger;
use super::migration_driver::NO_MIGRATION_VERSION;
use crate::client::{Collection, Database, OperationOptions};
use crate::common::{Document, Value};
use crate::errors::{ErrorKind, MigrateError, MigrateResult};

/// Keeps the migration state as the only document of a collection.
///
/// Writing drops the collection and inserts a fresh `{version, dirty}`
/// document. The two steps are not atomic: a failure between them leaves no
/// version recorded, which reads back as "no migration applied".
pub(crate) struct VersionStore {
    collection: Collection,
    logger: DriverLogger,
}

impl VersionStore {
    pub(crate) fn new(database: &Database, collection_name: &str, logger: DriverLogger) -> Self {
        VersionStore {
            collection: database.collection(collection_name),
            logger,
        }
    }

    pub(crate) fn get_version(&self) -> MigrateResult<(u64, bool)> {
        let record = self
            .collection
            .find_one(&Document::new(), &timeout())
            .map_err(|e| {
                MigrateError::new_with_cause(
                    "failed to get migration version",
                    ErrorKind::VersionReadFailed,
                    e,
                )
            })?;

        match record {
            Some(record) => decode_version(&record),
            None => Ok((NO_MIGRATION_VERSION, false)),
        }
    }

    pub(crate) fn set_version(&self, version: u64, dirty: bool) -> MigrateResult<()> {
        let stored = i64::try_from(version).map_err(|_| {
            MigrateError::new(
                &format!("version {} is out of the storable range", version),
                ErrorKind::InvalidVersion,
            )
        })?;

        self.collection.drop(&timeout()).map_err(|e| {
            MigrateError::new_with_cause(
                "drop migrations collection failed",
                ErrorKind::VersionDropFailed,
                e,
            )
        })?;

        let mut record = Document::new();
        record.put(VERSION_FIELD, stored)?;
        record.put(DIRTY_FIELD, dirty)?;

        self.collection.insert_one(record, &timeout()).map_err(|e| {
            self.logger.error(format_args!(
                "Failed to save version {} in {}, no version is recorded: {}",
                version,
                self.collection.namespace(),
                e
            ));
            MigrateError::new_with_cause("save version failed", ErrorKind::VersionInsertFailed, e)
        })?;

        self.logger.verbose(format_args!(
            "Recorded version {} (dirty: {}) in {}",
            version,
            dirty,
            self.collection.namespace()
        ));
        Ok(())
    }

    /// Drops the migration state collection.
    pub(crate) fn reset(&self) -> MigrateResult<()> {
        self.collection.drop(&timeout()).map_err(|e| {
            MigrateError::new_with_cause(
                "drop migrations collection failed",
                ErrorKind::VersionDropFailed,
                e,
            )
        })?;
        self.logger.verbose(format_args!(
            "Dropped migration state collection {}",
            self.collection.namespace()
        ));
        Ok(())
    }
}

fn timeout() -> OperationOptions {
    OperationOptions::with_timeout(CONTEXT_WAIT_TIMEOUT)
}

fn decode_version(record: &Document) -> MigrateResult<(u64, bool)> {
    let version = match record.get(VERSION_FIELD) {
        Some(Value::I32(v)) => *v as i64,
        Some(Value::I64(v)) => *v,
        other => {
            return Err(MigrateError::new(
                &format!(
                    "version record has no integer version field, found {}",
                    other.map(|v| v.type_name()).unwrap_or("nothing")
                ),
                ErrorKind::VersionReadFailed,
            ))
        }
    };

    let version = u64::try_from(version).map_err(|_| {
        MigrateError::new(
            &format!("stored version {} is negative", version),
            ErrorKind::VersionReadFailed,
        )
    })?;

    let dirty = match record.get(DIRTY_FIELD) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(dirty)) => *dirty,
        Some(other) => {
            return Err(MigrateError::new(
                &format!("version record has a {} dirty flag", other.type_name()),
                ErrorKind::VersionReadFailed,
            ))
        }
    };

    Ok((version, dirty))
}
