//! Client seam between the driver and a document database.
//!
//! The driver is written against [DocumentClientProvider]. A binding for a
//! concrete database implements the trait. [memory::InMemoryClient] is always
//! available; `mongo::MongoProvider` binds a MongoDB deployment when the
//! `mongodb` feature is enabled.

mod document_client;
pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
mod provider;

pub use document_client::*;
pub use provider::*;
