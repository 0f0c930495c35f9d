mod config;
mod document_driver;
mod executor;
mod lock;
mod logging;
mod migration_driver;
mod version;

pub use config::*;
pub use document_driver::*;
pub use executor::CommandBatch;
pub use migration_driver::*;
