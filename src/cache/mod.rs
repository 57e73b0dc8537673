//! Shared, keyed cache of backend query results.
//!
//! This module provides a resource-agnostic cache that:
//! - Maps a `QueryKey` to the latest settled result of fetching it
//! - Shares a single in-flight request between identical keys
//! - Invalidates by key prefix, refetching only what is still observed
//! - Signals changes so the UI can redraw

mod key;
mod store;

pub use key::QueryKey;
pub use store::{Fetcher, Observer, QueryCache, QueryError};
