use crate::errors::{ErrorKind, MigrateError};
use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure};

/// Server error codes the driver reacts to.
pub(crate) mod codes {
    pub const BAD_VALUE: i32 = 2;
    pub const FAILED_TO_PARSE: i32 = 9;
    pub const TYPE_MISMATCH: i32 = 14;
    pub const NAMESPACE_NOT_FOUND: i32 = 26;
    pub const INDEX_OPTIONS_CONFLICT: i32 = 85;
    pub const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
    pub const NAMESPACE_EXISTS: i32 = 48;
    pub const MAX_TIME_MS_EXPIRED: i32 = 50;
    pub const COMMAND_NOT_FOUND: i32 = 59;
    pub const WRITE_CONCERN_FAILED: i32 = 64;
    pub const NO_SUCH_TRANSACTION: i32 = 251;
    pub const TRANSACTION_COMMITTED: i32 = 256;
    pub const EXCEEDED_TIME_LIMIT: i32 = 262;
    pub const OPERATION_NOT_SUPPORTED_IN_TRANSACTION: i32 = 263;
    pub const DUPLICATE_KEY: i32 = 11000;
    pub const DUPLICATE_KEY_LEGACY: i32 = 11001;
}

/// Maps a server error code to the kind the driver understands.
pub(crate) fn kind_for_code(code: i32) -> ErrorKind {
    match code {
        codes::DUPLICATE_KEY | codes::DUPLICATE_KEY_LEGACY => ErrorKind::DuplicateKey,
        codes::MAX_TIME_MS_EXPIRED | codes::WRITE_CONCERN_FAILED | codes::EXCEEDED_TIME_LIMIT => {
            ErrorKind::Timeout
        }
        codes::NAMESPACE_NOT_FOUND => ErrorKind::NamespaceNotFound,
        codes::COMMAND_NOT_FOUND => ErrorKind::CommandNotFound,
        codes::BAD_VALUE
        | codes::FAILED_TO_PARSE
        | codes::TYPE_MISMATCH
        | codes::NAMESPACE_EXISTS
        | codes::INDEX_OPTIONS_CONFLICT
        | codes::INDEX_KEY_SPECS_CONFLICT => ErrorKind::InvalidCommand,
        codes::NO_SUCH_TRANSACTION
        | codes::TRANSACTION_COMMITTED
        | codes::OPERATION_NOT_SUPPORTED_IN_TRANSACTION => ErrorKind::TransactionError,
        _ => ErrorKind::BackendError,
    }
}

/// Server error code carried by a driver error, if any.
pub(crate) fn server_code(error: &MongoError) -> Option<i32> {
    match error.kind.as_ref() {
        MongoErrorKind::Command(e) => Some(e.code),
        MongoErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        MongoErrorKind::Write(WriteFailure::WriteConcernError(e)) => Some(e.code),
        _ => None,
    }
}

pub(crate) fn to_migrate_error(context: &str, error: MongoError) -> MigrateError {
    let kind = match server_code(&error) {
        Some(code) => kind_for_code(code),
        None => match error.kind.as_ref() {
            MongoErrorKind::ServerSelection { .. } => ErrorKind::Timeout,
            MongoErrorKind::InvalidArgument { .. } => ErrorKind::InvalidCommand,
            MongoErrorKind::Transaction { .. } => ErrorKind::TransactionError,
            _ => ErrorKind::BackendError,
        },
    };
    log::debug!("MongoDB error during {}: {}", context, error);
    MigrateError::new(&format!("{}: {}", context, error), kind)
}
