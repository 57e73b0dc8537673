use crate::api::error::ApiError;
use crate::api::types::{Page, PageRequest, Record, RecordId, Resource};
use crate::config::ApiConfig;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;
use url::Url;

/// HTTP client for the business-administration REST backend.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let mut builder =
      reqwest::Client::builder().user_agent(concat!("bizdesk/", env!("CARGO_PKG_VERSION")));
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base: parse_base_url(&config.base_url)?,
    })
  }

  /// Typed access to one resource collection
  pub fn resource<R: Resource>(&self) -> ResourceClient<R> {
    ResourceClient {
      api: self.clone(),
      _resource: PhantomData,
    }
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self.http.request(method, url)
  }
}

/// Parse the configured base URL, making sure relative joins keep its path.
fn parse_base_url(raw: &str) -> Result<Url> {
  let mut raw = raw.trim().to_string();
  if !raw.ends_with('/') {
    raw.push('/');
  }
  let url = Url::parse(&raw).map_err(|e| eyre!("Invalid API base url '{}': {}", raw, e))?;
  if url.cannot_be_a_base() {
    return Err(eyre!("API base url '{}' cannot be used as a base", raw));
  }
  Ok(url)
}

/// REST operations for a single resource type.
pub struct ResourceClient<R> {
  api: ApiClient,
  _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
  fn clone(&self) -> Self {
    Self {
      api: self.api.clone(),
      _resource: PhantomData,
    }
  }
}

impl<R: Resource> ResourceClient<R> {
  /// Fetch one page of the collection.
  pub async fn list(&self, request: &PageRequest) -> Result<Page<Record<R>>, ApiError> {
    let mut url = self.collection_url()?;
    url
      .query_pairs_mut()
      .extend_pairs(request.query_pairs().iter().map(|(k, v)| (*k, v.as_str())));

    let response = self.send(self.api.request(Method::GET, url)).await?;
    if !response.status().is_success() {
      return Err(self.failure(response, None, false).await);
    }
    let page: Page<Record<R>> = decode(response).await?;
    if !page.is_consistent() {
      tracing::warn!(
        resource = %R::KIND,
        number = page.number,
        total_pages = page.total_pages,
        rows = page.content.len(),
        "backend returned an inconsistent page"
      );
    }
    Ok(page)
  }

  /// Fetch a single record.
  pub async fn get(&self, id: RecordId) -> Result<Record<R>, ApiError> {
    let url = self.record_url(id)?;
    let response = self.send(self.api.request(Method::GET, url)).await?;
    if !response.status().is_success() {
      return Err(self.failure(response, Some(id), false).await);
    }
    decode(response).await
  }

  /// Create a record; the backend assigns id and timestamps.
  pub async fn create(&self, fields: &R) -> Result<Record<R>, ApiError> {
    let url = self.collection_url()?;
    let response = self
      .send(self.api.request(Method::POST, url).json(fields))
      .await?;
    if !response.status().is_success() {
      return Err(self.failure(response, None, true).await);
    }
    decode(response).await
  }

  /// Apply a partial update, merged server-side.
  pub async fn update(&self, id: RecordId, patch: &R::Patch) -> Result<Record<R>, ApiError> {
    let url = self.record_url(id)?;
    let response = self
      .send(self.api.request(Method::PATCH, url).json(patch))
      .await?;
    if !response.status().is_success() {
      return Err(self.failure(response, Some(id), true).await);
    }
    decode(response).await
  }

  pub async fn delete(&self, id: RecordId) -> Result<(), ApiError> {
    let url = self.record_url(id)?;
    let response = self.send(self.api.request(Method::DELETE, url)).await?;
    if !response.status().is_success() {
      return Err(self.failure(response, Some(id), false).await);
    }
    Ok(())
  }

  fn collection_url(&self) -> Result<Url, ApiError> {
    Ok(self.api.base.join(R::KIND.collection())?)
  }

  fn record_url(&self, id: RecordId) -> Result<Url, ApiError> {
    Ok(
      self
        .api
        .base
        .join(&format!("{}/{}", R::KIND.collection(), id))?,
    )
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await.map_err(|e| {
      tracing::warn!(resource = %R::KIND, error = %e, "request failed without response");
      ApiError::Network(e)
    })?;
    tracing::debug!(
      resource = %R::KIND,
      url = %response.url(),
      status = response.status().as_u16(),
      "backend response"
    );
    Ok(response)
  }

  /// Map a non-success response onto the error taxonomy.
  ///
  /// A 404 addressed at a specific record means it is absent. Client errors on
  /// writes are payload rejections; everything else is a plain HTTP failure.
  async fn failure(&self, response: Response, id: Option<RecordId>, write: bool) -> ApiError {
    let status = response.status();
    if let Some(id) = id.filter(|_| status == StatusCode::NOT_FOUND) {
      return ApiError::NotFound {
        resource: R::KIND.singular(),
        id,
      };
    }

    if write && status.is_client_error() {
      let body = response.text().await.unwrap_or_default();
      return ApiError::Validation {
        status,
        message: rejection_message(status, &body),
      };
    }

    ApiError::Http { status }
  }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
  let bytes = response.bytes().await.map_err(ApiError::Network)?;
  serde_json::from_slice(&bytes).map_err(ApiError::Decode)
}

/// Extract a readable message from a rejection body.
///
/// Accepts `{"message": ...}` / `{"error": ...}` JSON, falls back to the raw
/// text and finally to the status reason.
fn rejection_message(status: StatusCode, body: &str) -> String {
  if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
    for field in ["message", "error", "detail"] {
      if let Some(message) = value.get(field).and_then(|v| v.as_str()) {
        return message.to_string();
      }
    }
  }

  let body = body.trim();
  if !body.is_empty() {
    return body.to_string();
  }

  status
    .canonical_reason()
    .unwrap_or("request rejected")
    .to_string()
}
