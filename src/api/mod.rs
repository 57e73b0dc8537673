//! REST backend access: typed records, the resource client and the
//! cache-aware hooks built on top of it.

pub mod client;
pub mod error;
pub mod hooks;
pub mod resources;
pub mod types;

#[cfg(test)]
pub mod test_server;

pub use client::ApiClient;
pub use error::ApiError;
pub use hooks::Hooks;
pub use types::{Page, PageRequest, Record, RecordId, Resource, ResourceKind};
