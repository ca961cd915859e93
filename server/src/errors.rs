// server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  // The availability gate said no; the storefront shows its own closed banner.
  #[error("Orders are not being accepted right now")]
  Closed,

  #[error("Upstream service failure: {detail}")]
  Upstream {
    status: Option<u16>, // None when the request never got an HTTP status
    detail: String,
  },

  #[error("Upstream service timed out: {0}")]
  UpstreamTimeout(String),

  #[error("Chat delivery failed: {0}")]
  Transport(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience
// in handlers that call `?` on functions returning anyhow::Result.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    AppError::Internal(err.to_string())
  }
}

// Outbound HTTP failures split into "took too long" and "everything else";
// callers that care about the distinction match on the variant.
impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      AppError::UpstreamTimeout(err.to_string())
    } else {
      AppError::Upstream {
        status: err.status().map(|s| s.as_u16()),
        detail: err.to_string(),
      }
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"success": false, "message": m})),
      AppError::Unauthorized(m) => HttpResponse::Unauthorized().json(json!({"success": false, "message": m})),
      AppError::Closed => HttpResponse::Forbidden().json(json!({
        "success": false,
        "message": "Sorry, we are closed right now. Please order during business hours."
      })),
      AppError::Upstream { status, detail } => {
        tracing::error!(upstream_status = ?status, "Upstream failure details");
        HttpResponse::BadGateway().json(json!({"success": false, "message": "Order service is unavailable", "detail": detail}))
      }
      AppError::UpstreamTimeout(m) => {
        HttpResponse::GatewayTimeout().json(json!({"success": false, "message": "Order service timed out", "detail": m}))
      }
      AppError::Transport(m) => {
        HttpResponse::BadGateway().json(json!({"success": false, "message": "Message delivery failed", "detail": m}))
      }
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"success": false, "message": "Configuration issue", "detail": m}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"success": false, "message": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
