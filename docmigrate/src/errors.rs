use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Error kinds for driver operations.
///
/// Kinds are grouped into categories (see [ErrorKind::category]) so that an
/// orchestration layer can tell a locking or version-store failure, which
/// should abort the whole run, apart from a bad migration file.
///
/// # Examples
///
/// ```rust,ignore
/// use docmigrate::errors::{ErrorKind, MigrateError, MigrateResult};
///
/// fn example() -> MigrateResult<()> {
///     Err(MigrateError::new("database is locked", ErrorKind::DatabaseLocked))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorKind {
    // Configuration Errors
    /// The database name is missing or empty
    NoDatabaseName,
    /// No database client was supplied
    NoClient,
    /// Any other invalid driver configuration
    ConfigurationError,

    // Locking Errors
    /// The advisory lock is held by another migration process
    DatabaseLocked,
    /// The advisory lock record could not be removed
    LockReleaseFailed,
    /// The unique index backing the advisory lock could not be created
    LockPreparationFailed,

    // Version Store Errors
    /// The version record could not be read
    VersionReadFailed,
    /// The version collection could not be dropped
    VersionDropFailed,
    /// The new version record could not be inserted
    VersionInsertFailed,
    /// The version cannot be represented in the version record
    InvalidVersion,

    // Migration Errors
    /// The migration payload could not be read
    PayloadReadError,
    /// The migration payload is not a JSON array of command documents
    PayloadParseError,
    /// A command of the migration batch failed
    CommandExecutionFailed,
    /// A session or transaction could not be started
    TransactionStartFailed,
    /// The migration transaction could not be committed
    TransactionCommitFailed,

    // Client Errors - reported by the database client
    /// A unique index rejected the write
    DuplicateKey,
    /// The operation exceeded its deadline
    Timeout,
    /// The database does not know the command
    CommandNotFound,
    /// The collection does not exist
    NamespaceNotFound,
    /// The command document is malformed
    InvalidCommand,
    /// The document is malformed
    InvalidDocument,
    /// The session or transaction is in a state that forbids the operation
    TransactionError,
    /// Generic failure of the database backend
    BackendError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

/// Coarse grouping of [ErrorKind] values.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorCategory {
    Configuration,
    Locking,
    VersionStore,
    Migration,
    Client,
}

impl ErrorKind {
    /// Returns the category this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::NoDatabaseName | ErrorKind::NoClient | ErrorKind::ConfigurationError => {
                ErrorCategory::Configuration
            }
            ErrorKind::DatabaseLocked
            | ErrorKind::LockReleaseFailed
            | ErrorKind::LockPreparationFailed => ErrorCategory::Locking,
            ErrorKind::VersionReadFailed
            | ErrorKind::VersionDropFailed
            | ErrorKind::VersionInsertFailed
            | ErrorKind::InvalidVersion => ErrorCategory::VersionStore,
            ErrorKind::PayloadReadError
            | ErrorKind::PayloadParseError
            | ErrorKind::CommandExecutionFailed
            | ErrorKind::TransactionStartFailed
            | ErrorKind::TransactionCommitFailed => ErrorCategory::Migration,
            ErrorKind::DuplicateKey
            | ErrorKind::Timeout
            | ErrorKind::CommandNotFound
            | ErrorKind::NamespaceNotFound
            | ErrorKind::InvalidCommand
            | ErrorKind::InvalidDocument
            | ErrorKind::TransactionError
            | ErrorKind::BackendError
            | ErrorKind::InternalError => ErrorCategory::Client,
        }
    }

    /// Returns `true` if repeating the call later may succeed.
    ///
    /// The driver itself never retries; this only informs the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::DatabaseLocked)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NoDatabaseName => write!(f, "No database name"),
            ErrorKind::NoClient => write!(f, "No database client"),
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::DatabaseLocked => write!(f, "Database locked"),
            ErrorKind::LockReleaseFailed => write!(f, "Lock release failed"),
            ErrorKind::LockPreparationFailed => write!(f, "Lock preparation failed"),
            ErrorKind::VersionReadFailed => write!(f, "Version read failed"),
            ErrorKind::VersionDropFailed => write!(f, "Version drop failed"),
            ErrorKind::VersionInsertFailed => write!(f, "Version insert failed"),
            ErrorKind::InvalidVersion => write!(f, "Invalid version"),
            ErrorKind::PayloadReadError => write!(f, "Payload read error"),
            ErrorKind::PayloadParseError => write!(f, "Payload parse error"),
            ErrorKind::CommandExecutionFailed => write!(f, "Command execution failed"),
            ErrorKind::TransactionStartFailed => write!(f, "Transaction start failed"),
            ErrorKind::TransactionCommitFailed => write!(f, "Transaction commit failed"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::CommandNotFound => write!(f, "Command not found"),
            ErrorKind::NamespaceNotFound => write!(f, "Namespace not found"),
            ErrorKind::InvalidCommand => write!(f, "Invalid command"),
            ErrorKind::InvalidDocument => write!(f, "Invalid document"),
            ErrorKind::TransactionError => write!(f, "Transaction error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type of the driver.
///
/// `MigrateError` carries a message, a kind and an optional cause. Database
/// failures are never swallowed: they are wrapped as the cause of the
/// driver-level error that describes which step failed.
///
/// # Examples
///
/// ```rust,ignore
/// use docmigrate::errors::{ErrorKind, MigrateError};
///
/// let cause = MigrateError::new("E11000 duplicate key", ErrorKind::DuplicateKey);
/// let err = MigrateError::new_with_cause("save version failed", ErrorKind::VersionInsertFailed, cause);
/// assert_eq!(err.kind(), &ErrorKind::VersionInsertFailed);
/// ```
#[derive(Clone)]
pub struct MigrateError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<MigrateError>>,
    backtrace: Arc<Backtrace>,
}

impl MigrateError {
    /// Creates a new `MigrateError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        MigrateError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `MigrateError` that wraps `cause`.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: MigrateError) -> Self {
        MigrateError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// The error returned when a driver is built without a database name.
    pub fn no_database_name() -> Self {
        MigrateError::new("no database name", ErrorKind::NoDatabaseName)
    }

    /// The error returned when the advisory lock cannot be acquired.
    pub fn database_locked(cause: MigrateError) -> Self {
        MigrateError::new_with_cause("database is locked", ErrorKind::DatabaseLocked, cause)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&MigrateError> {
        self.cause.as_deref()
    }

    /// Walks the cause chain and returns the innermost error.
    pub fn root_cause(&self) -> &MigrateError {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }
}

impl Display for MigrateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Debug for MigrateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "[{}] {}\nCaused by: {:?}", self.error_kind, self.message, cause),
            None => write!(f, "[{}] {}\n{:?}", self.error_kind, self.message, self.backtrace),
        }
    }
}

impl Error for MigrateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for driver operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        MigrateError::new(
            &format!("failed to read migration: {}", err),
            ErrorKind::PayloadReadError,
        )
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::new(
            &format!("unmarshaling json error: {}", err),
            ErrorKind::PayloadParseError,
        )
    }
}
