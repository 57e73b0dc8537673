//! In-process backend used by the client and hook tests.
//!
//! Implements the REST surface over a JSON document store: paging and sorting
//! on list, 404 for unknown ids, 422 for empty string fields on create, and a
//! counter of requests per route. Updates merge whatever is sent, so an empty
//! string clears a field.

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::api::client::ApiClient;
use crate::config::ApiConfig;

#[derive(Default)]
struct Store {
  collections: HashMap<String, BTreeMap<i64, Value>>,
  next_id: i64,
  hits: HashMap<String, usize>,
  fail_with: Option<StatusCode>,
}

type Shared = Arc<Mutex<Store>>;

pub struct TestServer {
  base_url: String,
  store: Shared,
}

impl TestServer {
  pub async fn start() -> Self {
    let store: Shared = Arc::default();
    let app = Router::new()
      .route("/api/v1/{collection}", get(list).post(create))
      .route(
        "/api/v1/{collection}/{id}",
        get(fetch_one).patch(update).delete(remove),
      )
      .with_state(store.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });

    Self {
      base_url: format!("http://{}/api/v1", addr),
      store,
    }
  }

  /// A client pointed at a port nobody listens on.
  pub async fn unreachable() -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    client_for(format!("http://{}/api/v1", addr))
  }

  pub fn api(&self) -> ApiClient {
    client_for(self.base_url.clone())
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Number of requests received for e.g. `"GET leads"` or `"DELETE leads/{id}"`.
  pub fn hits(&self, route: &str) -> usize {
    let store = self.store.lock().unwrap();
    store.hits.get(route).copied().unwrap_or(0)
  }

  /// Total requests received across every route
  pub fn total_hits(&self) -> usize {
    let store = self.store.lock().unwrap();
    store.hits.values().sum()
  }

  /// Answer every request with `status` until reset with `None`.
  pub fn fail_with(&self, status: Option<StatusCode>) {
    self.store.lock().unwrap().fail_with = status;
  }
}

fn client_for(base_url: String) -> ApiClient {
  ApiClient::new(&ApiConfig {
    base_url,
    timeout_secs: Some(5),
  })
  .unwrap()
}

fn record_hit(store: &mut Store, method: Method, route: String) -> Option<Response> {
  *store.hits.entry(format!("{} {}", method, route)).or_default() += 1;
  store
    .fail_with
    .map(|status| (status, Json(json!({"message": "injected failure"}))).into_response())
}

fn not_found() -> Response {
  (StatusCode::NOT_FOUND, Json(json!({"message": "not found"}))).into_response()
}

/// Reject empty top-level string fields, mimicking bean validation.
fn validate(body: &Map<String, Value>) -> Result<(), Response> {
  match body
    .iter()
    .find(|(_, v)| v.as_str().is_some_and(|s| s.is_empty()))
  {
    Some((field, _)) => Err(
      (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"message": format!("{} must not be empty", field)})),
      )
        .into_response(),
    ),
    None => Ok(()),
  }
}

fn compare(a: &Value, b: &Value, field: &str) -> Ordering {
  match (&a[field], &b[field]) {
    (Value::Number(x), Value::Number(y)) => x
      .as_f64()
      .unwrap_or_default()
      .total_cmp(&y.as_f64().unwrap_or_default()),
    (Value::String(x), Value::String(y)) => x.cmp(y),
    _ => Ordering::Equal,
  }
  .then_with(|| a["id"].as_i64().cmp(&b["id"].as_i64()))
}

async fn list(
  State(store): State<Shared>,
  Path(collection): Path<String>,
  Query(params): Query<HashMap<String, String>>,
) -> Response {
  let mut store = store.lock().unwrap();
  if let Some(failure) = record_hit(&mut store, Method::GET, collection.clone()) {
    return failure;
  }

  let number: usize = params.get("pageNumber").and_then(|v| v.parse().ok()).unwrap_or(0);
  let size: usize = params.get("pageSize").and_then(|v| v.parse().ok()).unwrap_or(10);
  if size == 0 {
    return (StatusCode::BAD_REQUEST, "pageSize must be positive").into_response();
  }
  let field = params.get("sortField").cloned().unwrap_or_else(|| "id".to_string());
  let descending = params.get("direction").is_some_and(|d| d == "DESC");

  let mut rows: Vec<Value> = store
    .collections
    .get(&collection)
    .map(|c| c.values().cloned().collect())
    .unwrap_or_default();
  rows.sort_by(|a, b| {
    let ord = compare(a, b, &field);
    if descending {
      ord.reverse()
    } else {
      ord
    }
  });

  let total = rows.len();
  let content: Vec<Value> = rows.into_iter().skip(number * size).take(size).collect();
  Json(json!({
    "content": content,
    "totalElements": total,
    "totalPages": total.div_ceil(size),
    "size": size,
    "number": number,
  }))
  .into_response()
}

async fn fetch_one(
  State(store): State<Shared>,
  Path((collection, id)): Path<(String, i64)>,
) -> Response {
  let mut store = store.lock().unwrap();
  if let Some(failure) = record_hit(&mut store, Method::GET, format!("{}/{{id}}", collection)) {
    return failure;
  }
  match store.collections.get(&collection).and_then(|c| c.get(&id)) {
    Some(record) => Json(record.clone()).into_response(),
    None => not_found(),
  }
}

async fn create(
  State(store): State<Shared>,
  Path(collection): Path<String>,
  Json(body): Json<Map<String, Value>>,
) -> Response {
  let mut store = store.lock().unwrap();
  if let Some(failure) = record_hit(&mut store, Method::POST, collection.clone()) {
    return failure;
  }
  if let Err(rejection) = validate(&body) {
    return rejection;
  }

  store.next_id += 1;
  let id = store.next_id;
  let now = chrono::Utc::now().to_rfc3339();
  let mut record = body;
  record.insert("id".to_string(), json!(id));
  record.insert("createdAt".to_string(), json!(now));
  record.insert("updatedAt".to_string(), json!(now));
  let record = Value::Object(record);

  store
    .collections
    .entry(collection)
    .or_default()
    .insert(id, record.clone());
  (StatusCode::CREATED, Json(record)).into_response()
}

async fn update(
  State(store): State<Shared>,
  Path((collection, id)): Path<(String, i64)>,
  Json(body): Json<Map<String, Value>>,
) -> Response {
  let mut store = store.lock().unwrap();
  if let Some(failure) = record_hit(&mut store, Method::PATCH, format!("{}/{{id}}", collection)) {
    return failure;
  }
  let Some(Value::Object(record)) = store
    .collections
    .get_mut(&collection)
    .and_then(|c| c.get_mut(&id))
  else {
    return not_found();
  };

  for (key, value) in body {
    if key != "id" {
      record.insert(key, value);
    }
  }
  record.insert(
    "updatedAt".to_string(),
    json!(chrono::Utc::now().to_rfc3339()),
  );
  Json(Value::Object(record.clone())).into_response()
}

async fn remove(
  State(store): State<Shared>,
  Path((collection, id)): Path<(String, i64)>,
) -> Response {
  let mut store = store.lock().unwrap();
  if let Some(failure) = record_hit(&mut store, Method::DELETE, format!("{}/{{id}}", collection)) {
    return failure;
  }
  match store.collections.get_mut(&collection).and_then(|c| c.remove(&id)) {
    Some(_) => StatusCode::NO_CONTENT.into_response(),
    None => not_found(),
  }
}
