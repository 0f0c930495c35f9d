//! Document model shared by the client seam and the driver.

mod document;
pub mod ext_json;
mod object_id;
mod value;

pub use document::*;
pub use object_id::*;
pub use value::*;
