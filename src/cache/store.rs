//! Process-wide query cache with in-flight dedupe and prefix invalidation.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;

use super::key::QueryKey;
use crate::api::ApiError;
use crate::query::QueryState;

/// Errors are shared between every reader of an entry
pub type QueryError = Arc<ApiError>;

type Data = Arc<dyn Any + Send + Sync>;
type Outcome = Result<Data, QueryError>;
type ErasedFetcher = Arc<dyn Fn() -> BoxFuture<'static, Outcome> + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, Outcome>>;

/// A typed factory of fetch futures for one cache key.
pub struct Fetcher<T> {
  erased: ErasedFetcher,
  _data: PhantomData<fn() -> T>,
}

impl<T> Clone for Fetcher<T> {
  fn clone(&self) -> Self {
    Self {
      erased: Arc::clone(&self.erased),
      _data: PhantomData,
    }
  }
}

impl<T: Send + Sync + 'static> Fetcher<T> {
  /// Wrap a closure that is called once per backend request.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      erased: Arc::new(move || {
        let request = fetcher();
        async move {
          request
            .await
            .map(|value| Arc::new(value) as Data)
            .map_err(Arc::new)
        }
        .boxed()
      }),
      _data: PhantomData,
    }
  }
}

struct Entry {
  state: QueryState<Data>,
  fetcher: ErasedFetcher,
  /// Generation of the request whose response will be accepted
  in_flight: Option<(u64, InFlight)>,
  fetched_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Inner {
  entries: HashMap<QueryKey, Entry>,
  observers: HashMap<QueryKey, usize>,
  next_generation: u64,
}

struct Core {
  inner: Mutex<Inner>,
  changes: watch::Sender<u64>,
}

impl Core {
  fn lock(&self) -> MutexGuard<'_, Inner> {
    // State is only mutated in short, non-panicking sections
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn bump(&self) {
    self.changes.send_modify(|version| *version = version.wrapping_add(1));
  }

  /// Store a response unless the entry was dropped or a newer request replaced it.
  fn settle(&self, key: &QueryKey, generation: u64, outcome: &Outcome) {
    let mut inner = self.lock();
    match inner.entries.get_mut(key) {
      Some(entry) if entry.in_flight.as_ref().is_some_and(|(g, _)| *g == generation) => {
        entry.in_flight = None;
        entry.fetched_at = Some(Utc::now());
        entry.state = match outcome {
          Ok(data) => QueryState::Success(Arc::clone(data)),
          Err(e) => {
            tracing::debug!(%key, error = %e, "query failed");
            QueryState::Error(Arc::clone(e))
          }
        };
        drop(inner);
        self.bump();
      }
      _ => tracing::debug!(%key, generation, "discarding superseded response"),
    }
  }
}

/// Outcome of an invalidation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidation {
  /// Observed entries that started a background refetch
  pub refetched: usize,
  /// Unobserved entries removed from the cache
  pub dropped: usize,
}

impl Invalidation {
  pub fn is_empty(&self) -> bool {
    self.refetched == 0 && self.dropped == 0
  }
}

/// Keeps a key "observed" while alive; invalidation refetches observed keys.
///
/// When the last observer of a key goes away the entry is evicted, so paging
/// through a long collection keeps only the pages on screen. A response still
/// in flight for an evicted key is discarded.
pub struct Observer {
  core: Weak<Core>,
  key: QueryKey,
}

impl Drop for Observer {
  fn drop(&mut self) {
    let Some(core) = self.core.upgrade() else {
      return;
    };
    let mut inner = core.lock();
    if let Some(count) = inner.observers.get_mut(&self.key) {
      *count -= 1;
      if *count == 0 {
        inner.observers.remove(&self.key);
        inner.entries.remove(&self.key);
        tracing::trace!(key = %self.key, "evicted unobserved entry");
      }
    }
  }
}

/// Keyed cache of backend query results.
///
/// Create one per process and hand clones to whoever needs it; all clones
/// share the same entries. Each entry moves through
/// idle → loading → success/error, and back to a background refresh when
/// invalidated while observed.
#[derive(Clone)]
pub struct QueryCache {
  core: Arc<Core>,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryCache {
  pub fn new() -> Self {
    let (changes, _) = watch::channel(0);
    Self {
      core: Arc::new(Core {
        inner: Mutex::new(Inner::default()),
        changes,
      }),
    }
  }

  /// Request `key`: returns the current state right away and starts a fetch
  /// unless one for the same key is already in flight.
  ///
  /// Cached data stays visible while the new request runs.
  pub fn fetch<T: Send + Sync + 'static>(
    &self,
    key: &QueryKey,
    fetcher: &Fetcher<T>,
  ) -> QueryState<Arc<T>> {
    self.ensure_fetch(key, &fetcher.erased);
    self.state(key)
  }

  /// Request `key` and wait for the result, sharing any in-flight request.
  #[cfg(test)]
  pub async fn query<T: Send + Sync + 'static>(
    &self,
    key: &QueryKey,
    fetcher: &Fetcher<T>,
  ) -> Result<Arc<T>, QueryError> {
    let in_flight = self.ensure_fetch(key, &fetcher.erased);
    let data = in_flight.await?;
    data.downcast::<T>().map_err(|_| {
      Arc::new(ApiError::CacheType {
        key: key.to_string(),
      })
    })
  }

  /// Current state of `key` without triggering anything.
  pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<Arc<T>> {
    let inner = self.core.lock();
    let Some(entry) = inner.entries.get(key) else {
      return QueryState::Idle;
    };
    match &entry.state {
      QueryState::Idle => QueryState::Idle,
      QueryState::Loading => QueryState::Loading,
      QueryState::Error(e) => QueryState::Error(Arc::clone(e)),
      QueryState::Success(data) => match Arc::clone(data).downcast::<T>() {
        Ok(value) => QueryState::Success(value),
        Err(_) => {
          tracing::warn!(%key, "cache entry read with a mismatched type");
          QueryState::Error(Arc::new(ApiError::CacheType {
            key: key.to_string(),
          }))
        }
      },
    }
  }

  /// Force a new request for an existing entry, superseding one in flight.
  ///
  /// Returns false when the key has never been requested.
  pub fn refetch(&self, key: &QueryKey) -> bool {
    let mut inner = self.core.lock();
    let started = self.start(&mut inner, key).is_some();
    drop(inner);
    if started {
      self.core.bump();
    }
    started
  }

  /// Register interest in `key` until the returned guard is dropped.
  pub fn observe(&self, key: QueryKey) -> Observer {
    let mut inner = self.core.lock();
    *inner.observers.entry(key.clone()).or_default() += 1;
    Observer {
      core: Arc::downgrade(&self.core),
      key,
    }
  }

  /// Mark every entry under `prefix` stale.
  ///
  /// Observed entries refetch in the background; unobserved ones are dropped
  /// and will be fetched again when next requested.
  pub fn invalidate(&self, prefix: &QueryKey) -> Invalidation {
    let mut inner = self.core.lock();
    let matching: Vec<QueryKey> = inner
      .entries
      .keys()
      .filter(|key| key.starts_with(prefix))
      .cloned()
      .collect();

    let mut result = Invalidation::default();
    for key in matching {
      if inner.observers.get(&key).is_some_and(|count| *count > 0) {
        self.start(&mut inner, &key);
        result.refetched += 1;
      } else {
        inner.entries.remove(&key);
        result.dropped += 1;
      }
    }
    drop(inner);

    tracing::debug!(
      %prefix,
      refetched = result.refetched,
      dropped = result.dropped,
      "invalidated cache entries"
    );
    if !result.is_empty() {
      self.core.bump();
    }
    result
  }

  #[cfg(test)]
  pub fn contains(&self, key: &QueryKey) -> bool {
    self.core.lock().entries.contains_key(key)
  }

  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    self
      .core
      .lock()
      .entries
      .get(key)
      .is_some_and(|entry| entry.in_flight.is_some())
  }

  /// When the entry last settled (success or error)
  pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
    self.core.lock().entries.get(key).and_then(|e| e.fetched_at)
  }

  #[cfg(test)]
  pub fn observer_count(&self, key: &QueryKey) -> usize {
    self.core.lock().observers.get(key).copied().unwrap_or(0)
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.core.lock().entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// A receiver whose value changes whenever an entry settles or is invalidated.
  pub fn changes(&self) -> watch::Receiver<u64> {
    self.core.changes.subscribe()
  }

  fn ensure_fetch(&self, key: &QueryKey, fetcher: &ErasedFetcher) -> InFlight {
    let mut inner = self.core.lock();
    let entry = inner.entries.entry(key.clone()).or_insert_with(|| Entry {
      state: QueryState::Idle,
      fetcher: Arc::clone(fetcher),
      in_flight: None,
      fetched_at: None,
    });
    entry.fetcher = Arc::clone(fetcher);

    if let Some((_, in_flight)) = &entry.in_flight {
      tracing::trace!(%key, "joining in-flight request");
      return in_flight.clone();
    }

    // The entry was inserted above, so start() always finds it
    let in_flight = self.start(&mut inner, key);
    drop(inner);
    self.core.bump();
    in_flight.unwrap_or_else(|| futures::future::pending().boxed().shared())
  }

  /// Issue a new request for an existing entry and make it the accepted one.
  fn start(&self, inner: &mut Inner, key: &QueryKey) -> Option<InFlight> {
    inner.next_generation += 1;
    let generation = inner.next_generation;
    let entry = inner.entries.get_mut(key)?;

    let request = (entry.fetcher)();
    let core = Arc::downgrade(&self.core);
    let settle_key = key.clone();
    let in_flight = async move {
      let outcome = request.await;
      if let Some(core) = core.upgrade() {
        core.settle(&settle_key, generation, &outcome);
      }
      outcome
    }
    .boxed()
    .shared();

    entry.in_flight = Some((generation, in_flight.clone()));
    if !matches!(entry.state, QueryState::Success(_)) {
      entry.state = QueryState::Loading;
    }
    tracing::debug!(%key, generation, "starting request");

    // Drive the request even when nobody awaits it
    tokio::spawn(in_flight.clone());
    Some(in_flight)
  }
}
