//! Layer records, their persistence and the administrative operations on them.

mod service;
mod store;
mod types;

pub use service::*;
pub use store::*;
pub use types::*;
