//! Error taxonomy for backend calls.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend operation.
///
/// Every variant is scoped to the request that produced it; nothing here is
/// fatal to the process.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No response was received (connection refused, DNS, reset, timeout).
  #[error("network error: {0}")]
  Network(#[source] reqwest::Error),

  /// A response arrived with a status outside the success range.
  #[error("request failed with HTTP {status}")]
  Http { status: StatusCode },

  /// The backend reported the record as absent.
  #[error("{resource} {id} not found")]
  NotFound { resource: &'static str, id: i64 },

  /// The backend rejected a create/update payload.
  #[error("rejected by backend ({status}): {message}")]
  Validation { status: StatusCode, message: String },

  /// A success response whose body did not match the expected shape.
  #[error("unexpected response body: {0}")]
  Decode(#[source] serde_json::Error),

  /// The request URL could not be built from the configured base.
  #[error("invalid request url: {0}")]
  Url(#[from] url::ParseError),

  /// A cache entry holds a value of another type than the reader expects.
  #[error("cache entry {key} holds an unexpected type")]
  CacheType { key: String },
}

impl ApiError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, ApiError::NotFound { .. })
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, ApiError::Validation { .. })
  }

  /// HTTP status for errors that carry one.
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      ApiError::Http { status } | ApiError::Validation { status, .. } => Some(*status),
      ApiError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
      _ => None,
    }
  }
}
