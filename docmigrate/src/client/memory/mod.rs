//! In-memory document database client.

mod client;
mod config;
mod fail_point;
mod session;
mod state;

pub use client::*;
pub use config::*;
pub use fail_point::*;
pub use session::*;
