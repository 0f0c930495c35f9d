use crate::errors::MigrateResult;
use std::io::Read;

/// Version reported when no migration has been recorded yet.
pub const NO_MIGRATION_VERSION: u64 = u64::MAX;

/// Contract between a migration engine and a database backend.
///
/// A migration engine calls these operations in a fixed pattern: `lock`,
/// `get_version`, then for each pending migration `set_version(v, true)`,
/// `run_migration`, `set_version(v, false)`, and finally `unlock`.
///
/// # Thread Safety
/// Implementations are `Send + Sync`. The operations of one driver are
/// expected to be called sequentially; different drivers, in the same or in
/// different processes, coordinate through the advisory lock.
pub trait MigrationDriver: Send + Sync {
    /// Acquires the advisory lock.
    ///
    /// A no-op when locking is disabled or when this driver already holds the
    /// lock. Fails with [crate::errors::ErrorKind::DatabaseLocked] when
    /// another holder has it.
    fn lock(&self) -> MigrateResult<()>;

    /// Releases the advisory lock. A no-op when this driver does not hold it.
    fn unlock(&self) -> MigrateResult<()>;

    /// Returns the current version and dirty flag, or
    /// `(NO_MIGRATION_VERSION, false)` when nothing is recorded.
    fn get_version(&self) -> MigrateResult<(u64, bool)>;

    /// Replaces the recorded version and dirty flag.
    fn set_version(&self, version: u64, dirty: bool) -> MigrateResult<()>;

    /// Reads a migration payload to its end and executes its commands.
    fn run_migration(&self, migration: &mut dyn Read) -> MigrateResult<()>;

    /// Removes all recorded migration state.
    fn reset(&self) -> MigrateResult<()>;

    /// Releases driver resources. The database client is left open.
    fn close(&self) -> MigrateResult<()>;
}
