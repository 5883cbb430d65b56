//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("consistency violation: {0}")]
  Consistency(#[from] knot_core::ConsistencyViolation),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<knot_core::Error> for ApiError {
  fn from(err: knot_core::Error) -> Self {
    match err {
      knot_core::Error::Validation(e) => ApiError::BadRequest(e.to_string()),
      knot_core::Error::Consistency(v) => ApiError::Consistency(v),
      knot_core::Error::Store(e) => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Consistency(_) | ApiError::Store(_) => {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
