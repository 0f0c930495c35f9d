//! MongoDB client, available with the `mongodb` feature.

mod client;
mod convert;
mod error;
mod session;

pub use client::*;
pub use convert::*;
pub use session::*;
