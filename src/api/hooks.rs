//! Cache-aware access to the backend: query hooks for reads, mutation hooks
//! for writes.

use crate::cache::{Fetcher, QueryCache, QueryKey};
use crate::notify::Notifier;
use crate::query::Query;

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{Page, PageRequest, Record, RecordId, Resource};

/// Cache key of one list query: `[collection, page, size, sortField, direction]`
pub fn list_key<R: Resource>(request: &PageRequest) -> QueryKey {
  list_prefix::<R>()
    .with(request.page_number)
    .with(request.page_size)
    .with(request.sort_field.as_str())
    .with(request.direction.as_str())
}

/// Prefix shared by every list query of a resource
pub fn list_prefix<R: Resource>() -> QueryKey {
  QueryKey::new(R::KIND.collection())
}

/// Cache key of a single record: `[singular, id]`
pub fn record_key<R: Resource>(id: RecordId) -> QueryKey {
  QueryKey::new(R::KIND.singular()).with(id)
}

/// Entry point for views and controllers.
///
/// Reads go through the shared [`QueryCache`]; writes go straight to the
/// backend and invalidate the affected keys once the backend confirms them.
/// Nothing is written to the cache speculatively.
#[derive(Clone)]
pub struct Hooks {
  client: ApiClient,
  cache: QueryCache,
  notifier: Notifier,
}

impl Hooks {
  pub fn new(client: ApiClient, cache: QueryCache, notifier: Notifier) -> Self {
    Self {
      client,
      cache,
      notifier,
    }
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  fn list_fetcher<R: Resource>(&self, request: PageRequest) -> Fetcher<Page<Record<R>>> {
    let resource = self.client.resource::<R>();
    Fetcher::new(move || {
      let resource = resource.clone();
      let request = request.clone();
      async move { resource.list(&request).await }
    })
  }

  fn record_fetcher<R: Resource>(&self, id: RecordId) -> Fetcher<Record<R>> {
    let resource = self.client.resource::<R>();
    Fetcher::new(move || {
      let resource = resource.clone();
      async move { resource.get(id).await }
    })
  }

  /// Observe one page of `R`. Call `fetch()` on the handle to load it.
  pub fn use_list<R: Resource>(&self, request: PageRequest) -> Query<Page<Record<R>>> {
    let key = list_key::<R>(&request);
    Query::new(self.cache.clone(), key, self.list_fetcher::<R>(request))
  }

  /// Observe a single record of `R`.
  pub fn use_record<R: Resource>(&self, id: RecordId) -> Query<Record<R>> {
    Query::new(
      self.cache.clone(),
      record_key::<R>(id),
      self.record_fetcher::<R>(id),
    )
  }

  pub async fn create<R: Resource>(&self, fields: R) -> Result<Record<R>, ApiError> {
    let result = self.client.resource::<R>().create(&fields).await;
    match &result {
      Ok(record) => {
        self.cache.invalidate(&list_prefix::<R>());
        self.notifier.success(format!(
          "Created {} '{}'",
          R::KIND.singular(),
          record.fields.title()
        ));
      }
      Err(e) => self.report_failure::<R>("create", e),
    }
    result
  }

  pub async fn update<R: Resource>(
    &self,
    id: RecordId,
    patch: R::Patch,
  ) -> Result<Record<R>, ApiError> {
    let result = self.client.resource::<R>().update(id, &patch).await;
    match &result {
      Ok(record) => {
        self.cache.invalidate(&list_prefix::<R>());
        self.cache.invalidate(&record_key::<R>(id));
        self.notifier.success(format!(
          "Updated {} '{}'",
          R::KIND.singular(),
          record.fields.title()
        ));
      }
      Err(e) => self.report_failure::<R>("update", e),
    }
    result
  }

  pub async fn delete<R: Resource>(&self, id: RecordId) -> Result<(), ApiError> {
    let result = self.client.resource::<R>().delete(id).await;
    match &result {
      Ok(()) => {
        self.cache.invalidate(&list_prefix::<R>());
        // An open detail view refetches and shows the record as gone
        self.cache.invalidate(&record_key::<R>(id));
        self
          .notifier
          .success(format!("Deleted {} {}", R::KIND.singular(), id));
      }
      Err(e) => self.report_failure::<R>("delete", e),
    }
    result
  }

  fn report_failure<R: Resource>(&self, action: &str, error: &ApiError) {
    let status = error.status().map(|s| s.as_u16());
    if error.is_validation() {
      tracing::info!(resource = %R::KIND, action, ?status, error = %error, "payload rejected");
    } else {
      tracing::warn!(resource = %R::KIND, action, ?status, error = %error, "mutation failed");
    }
    let message = match error {
      ApiError::Validation { message, .. } => {
        format!("Invalid {}: {}", R::KIND.singular(), message)
      }
      _ => format!("Could not {} {}: {}", action, R::KIND.singular(), error),
    };
    self.notifier.error(message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::resources::{ContactInfo, Lead, LeadPatch};
  use crate::api::test_server::TestServer;
  use crate::notify::{Level, Notification};
  use crate::cache::QueryError;
  use std::sync::Arc;
  use std::time::Duration;
  use tokio::sync::mpsc::UnboundedReceiver;

  /// Awaiting reads through the cache, for driving the backend directly
  impl Hooks {
    /// Fetch one page through the cache; identical concurrent calls share a request.
    pub async fn list<R: Resource>(
      &self,
      request: &PageRequest,
    ) -> Result<Arc<Page<Record<R>>>, QueryError> {
      let key = list_key::<R>(request);
      self
        .cache
        .query(&key, &self.list_fetcher::<R>(request.clone()))
        .await
    }

    /// Fetch one record through the cache.
    pub async fn get<R: Resource>(&self, id: RecordId) -> Result<Arc<Record<R>>, QueryError> {
      self
        .cache
        .query(&record_key::<R>(id), &self.record_fetcher::<R>(id))
        .await
    }
  }

  fn acme() -> Lead {
    Lead {
      lead_name: "Acme".to_string(),
      lead_source: "Web".to_string(),
      contact_info: ContactInfo {
        phone: "555-0100".to_string(),
        email: "a@acme.com".to_string(),
      },
      lead_status: "New".to_string(),
      lead_owner: "Jane".to_string(),
      territory: "West".to_string(),
      lead_rating: 3,
    }
  }

  fn hooks_for(server: &TestServer) -> (Hooks, UnboundedReceiver<Notification>) {
    let (notifier, rx) = Notifier::channel();
    (Hooks::new(server.api(), QueryCache::new(), notifier), rx)
  }

  fn first_page() -> PageRequest {
    PageRequest::first(10, "id").unwrap()
  }

  async fn wait_idle(cache: &QueryCache, key: &QueryKey) {
    for _ in 0..100 {
      if !cache.is_fetching(key) {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("request for {} never settled", key);
  }

  #[test]
  fn test_keys() {
    let key = list_key::<Lead>(&first_page());
    assert_eq!(key.to_string(), r#"["leads", 0, 10, "id", "ASC"]"#);
    assert!(key.starts_with(&list_prefix::<Lead>()));
    assert_eq!(record_key::<Lead>(7).to_string(), r#"["lead", 7]"#);
  }

  #[tokio::test]
  async fn test_create_lead_appears_in_list() {
    let server = TestServer::start().await;
    let (hooks, mut notes) = hooks_for(&server);

    let created = hooks.create(acme()).await.unwrap();
    assert!(created.id > 0);

    let page = hooks
      .list::<Lead>(&PageRequest::first(10, "id").unwrap())
      .await
      .unwrap();
    assert!(page.contains(created.id));

    let fetched = hooks.get::<Lead>(created.id).await.unwrap();
    assert_eq!(fetched.fields, acme());

    let note = notes.try_recv().unwrap();
    assert_eq!(note.level, Level::Success);
    assert!(note.message.contains("Acme"));
  }

  #[tokio::test]
  async fn test_update_refreshes_observed_record() {
    let server = TestServer::start().await;
    let (hooks, _notes) = hooks_for(&server);
    let created = hooks.create(acme()).await.unwrap();

    let mut detail = hooks.use_record::<Lead>(created.id);
    detail.fetch();
    wait_idle(hooks.cache(), detail.key()).await;
    assert_eq!(detail.data().unwrap().fields.lead_status, "New");

    let patch = LeadPatch {
      lead_status: Some("Qualified".to_string()),
      ..Default::default()
    };
    hooks.update::<Lead>(created.id, patch).await.unwrap();

    wait_idle(hooks.cache(), detail.key()).await;
    let refreshed = detail.data().unwrap();
    assert_eq!(refreshed.fields.lead_status, "Qualified");
    assert_eq!(
      refreshed.fields,
      Lead {
        lead_status: "Qualified".to_string(),
        ..acme()
      }
    );
    assert_eq!(server.hits("GET leads/{id}"), 2);
  }

  #[tokio::test]
  async fn test_create_invalidates_list_pages() {
    let server = TestServer::start().await;
    let (hooks, _notes) = hooks_for(&server);

    let mut list = hooks.use_list::<Lead>(first_page());
    list.fetch();
    wait_idle(hooks.cache(), list.key()).await;
    assert!(list.data().unwrap().is_empty());

    let created = hooks.create(acme()).await.unwrap();
    wait_idle(hooks.cache(), list.key()).await;
    assert!(list.data().unwrap().contains(created.id));
  }

  #[tokio::test]
  async fn test_delete_removes_from_list() {
    let server = TestServer::start().await;
    let (hooks, _notes) = hooks_for(&server);
    let created = hooks.create(acme()).await.unwrap();

    hooks.delete::<Lead>(created.id).await.unwrap();

    let page = hooks.list::<Lead>(&first_page()).await.unwrap();
    assert!(!page.contains(created.id));
    assert!(hooks.get::<Lead>(created.id).await.unwrap_err().is_not_found());
  }

  #[tokio::test]
  async fn test_delete_missing_leaves_cache_untouched() {
    let server = TestServer::start().await;
    let (hooks, mut notes) = hooks_for(&server);

    let mut list = hooks.use_list::<Lead>(first_page());
    list.fetch();
    wait_idle(hooks.cache(), list.key()).await;
    let entries = hooks.cache().len();
    let list_fetches = server.hits("GET leads");

    let err = hooks.delete::<Lead>(4242).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(hooks.cache().len(), entries);
    assert!(!hooks.cache().is_fetching(list.key()));
    assert_eq!(server.hits("GET leads"), list_fetches);

    let note = notes.try_recv().unwrap();
    assert_eq!(note.level, Level::Error);
  }

  #[tokio::test]
  async fn test_rejected_create_propagates_validation() {
    let server = TestServer::start().await;
    let (hooks, mut notes) = hooks_for(&server);
    let entries_before = hooks.cache().len();

    let err = hooks
      .create(Lead {
        lead_name: String::new(),
        ..acme()
      })
      .await
      .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(hooks.cache().len(), entries_before);
    let note = notes.try_recv().unwrap();
    assert_eq!(note.level, Level::Error);
    assert!(note.message.starts_with("Invalid lead: "), "{}", note.message);
  }

  #[tokio::test]
  async fn test_update_clears_optional_text() {
    let server = TestServer::start().await;
    let (hooks, _notes) = hooks_for(&server);
    let created = hooks.create(acme()).await.unwrap();

    let patch = LeadPatch {
      territory: Some(String::new()),
      ..Default::default()
    };
    let updated = hooks.update::<Lead>(created.id, patch).await.unwrap();
    assert_eq!(updated.fields.territory, "");

    let fetched = hooks.get::<Lead>(created.id).await.unwrap();
    assert_eq!(
      fetched.fields,
      Lead {
        territory: String::new(),
        ..acme()
      }
    );
  }

  #[tokio::test]
  async fn test_concurrent_identical_lists_issue_one_request() {
    let server = TestServer::start().await;
    let (hooks, _notes) = hooks_for(&server);
    let request = PageRequest::first(10, "id").unwrap();

    let (a, b) = tokio::join!(
      hooks.list::<Lead>(&request),
      hooks.list::<Lead>(&request)
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(server.hits("GET leads"), 1);
  }

  #[tokio::test]
  async fn test_unobserved_lists_are_dropped_not_refetched() {
    let server = TestServer::start().await;
    let (hooks, _notes) = hooks_for(&server);

    hooks.list::<Lead>(&first_page()).await.unwrap();
    assert_eq!(server.hits("GET leads"), 1);

    hooks.create(acme()).await.unwrap();
    assert!(!hooks.cache().contains(&list_key::<Lead>(&first_page())));
    assert_eq!(server.total_hits(), 2);
  }
}
