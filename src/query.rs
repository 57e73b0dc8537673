//! Query handles for views.
//!
//! Inspired by TanStack Query, a `Query<T>` binds one cache key and its
//! fetcher to the shared [`QueryCache`]. The handle observes its key for as
//! long as it lives, so invalidations refresh it in the background and the
//! entry is dropped once no view holds it.
//!
//! # Example
//!
//! ```ignore
//! let mut query = hooks.use_list::<Lead>(PageRequest::first(10, "id")?);
//!
//! // Start fetching (again on every mount)
//! query.fetch();
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(page) => render_page(&page),
//!     QueryState::Error(e) => render_error(&e),
//!     QueryState::Idle => {}
//! }
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::api::ApiError;
use crate::cache::{Fetcher, Observer, QueryCache, QueryError, QueryKey};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is fetching and has no data yet
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(QueryError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  #[cfg(test)]
  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A view's subscription to one cached query.
pub struct Query<T> {
  cache: QueryCache,
  key: QueryKey,
  fetcher: Fetcher<T>,
  _observer: Observer,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Bind `key` to `fetcher` and start observing it. Nothing is fetched
  /// until `fetch()` is called.
  pub fn new(cache: QueryCache, key: QueryKey, fetcher: Fetcher<T>) -> Self {
    let observer = cache.observe(key.clone());
    Self {
      cache,
      key,
      fetcher,
      _observer: observer,
    }
  }

  #[cfg(test)]
  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  /// Request the key; joins a request already in flight.
  pub fn fetch(&mut self) {
    self.cache.fetch(&self.key, &self.fetcher);
  }

  /// Force a new request, superseding any in flight.
  pub fn refetch(&mut self) {
    if !self.cache.refetch(&self.key) {
      self.fetch();
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> QueryState<Arc<T>> {
    self.cache.state(&self.key)
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<Arc<T>> {
    match self.state() {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  /// Check if the query is loading with nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.state().is_loading()
  }

  /// True while any request for the key is outstanding, including background refreshes
  pub fn is_fetching(&self) -> bool {
    self.cache.is_fetching(&self.key)
  }

  pub fn is_error(&self) -> bool {
    self.state().is_error()
  }

  /// When the last response for the key arrived
  pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
    self.cache.fetched_at(&self.key)
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<String> {
    self.state().error().map(|e| e.to_string())
  }
}

impl<T> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .finish_non_exhaustive()
  }
}
