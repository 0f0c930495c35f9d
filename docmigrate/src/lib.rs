//! # docmigrate - Migration State Driver for Document Databases
//!
//! `docmigrate` is the database side of a schema migration engine for
//! document databases. The engine decides which migrations are pending; the
//! driver records the applied version, keeps concurrent runs apart and
//! executes migrations written as JSON arrays of database commands.
//!
//! ## Key Features
//!
//! - **Version Store**: one `{version, dirty}` document in a dedicated collection
//! - **Advisory Lock**: a single record guarded by a unique index
//! - **Command Migrations**: extended JSON command batches, run in order
//! - **Transactions**: a whole migration can run inside one transaction
//! - **Pluggable Clients**: the driver talks to a [client::DocumentClientProvider];
//!   [client::memory::InMemoryClient] is bundled for tests and demos
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docmigrate::client::memory::InMemoryClient;
//! use docmigrate::driver::{DocumentDriver, LockingConfig, MigrationDriver};
//!
//! let client = InMemoryClient::default().into_client();
//! let driver = DocumentDriver::builder()
//!     .client(client)
//!     .database("app")
//!     .locking(LockingConfig::enabled())
//!     .build()?;
//!
//! driver.lock()?;
//! driver.set_version(1, true)?;
//! let mut migration: &[u8] = br#"[{"create": "users"}]"#;
//! driver.run_migration(&mut migration)?;
//! driver.set_version(1, false)?;
//! driver.unlock()?;
//! ```
//!
//! ## Modules
//!
//! - [client]: the client seam and the in-memory client
//! - [common]: documents, values and extended JSON decoding
//! - [driver]: the migration driver
//! - [errors]: error type and error kinds

pub mod client;
pub mod common;
pub mod driver;
pub mod errors;

pub use driver::{DocumentDriver, DriverBuilder, MigrationDriver, NO_MIGRATION_VERSION};
pub use errors::{ErrorKind, MigrateError, MigrateResult};
