// server/src/web/handlers/broadcast_handlers.rs

use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::services::telegram::ParseMode;
use crate::state::AppState;
use tandir::ChatId;

// --- Shared API-key extractor ---
// Both endpoints here are for the external admin system, never the public
// storefront, so they require the shared key in the `x-api-key` header.
#[derive(Debug)]
pub struct ApiKeyGuard;

impl FromRequest for ApiKeyGuard {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let expected = req
      .app_data::<web::Data<AppState>>()
      .map(|state| state.config.admin_api_key.clone());

    let presented = req.headers().get("x-api-key").and_then(|v| v.to_str().ok());
    match (expected, presented) {
      (Some(expected), Some(presented)) if presented == expected => {
        futures_util::future::ready(Ok(ApiKeyGuard))
      }
      _ => {
        warn!("Rejected a request with a missing or wrong x-api-key header");
        futures_util::future::ready(Err(AppError::Unauthorized(
          "A valid x-api-key header is required.".to_string(),
        )))
      }
    }
  }
}

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
pub struct BroadcastRequestPayload {
  pub title: String,
  pub message: String,
  #[serde(rename = "imageUrl", default)]
  pub image_url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SendMessageRequestPayload {
  #[serde(rename = "chatId")]
  pub chat_id: ChatId,
  pub message: String,
  #[serde(rename = "parseMode", default)]
  pub parse_mode: Option<String>,
}

fn parse_mode_from(raw: &str) -> Result<ParseMode, AppError> {
  match raw.to_ascii_lowercase().as_str() {
    "markdown" => Ok(ParseMode::Markdown),
    "markdownv2" => Ok(ParseMode::MarkdownV2),
    "html" => Ok(ParseMode::Html),
    other => Err(AppError::Validation(format!("Unknown parseMode: {}", other))),
  }
}

// --- Handler Implementations ---

#[instrument(name = "handler::broadcast", skip(app_state, payload, _guard), fields(title = %payload.title))]
pub async fn broadcast_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<BroadcastRequestPayload>,
  _guard: ApiKeyGuard,
) -> Result<HttpResponse, AppError> {
  let report = app_state
    .flow
    .broadcast(&payload.title, &payload.message, payload.image_url.as_deref())
    .await?;

  info!(sent = report.sent, failed = report.failed, "Broadcast dispatched");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "sent": report.sent,
    "failed": report.failed
  })))
}

#[instrument(name = "handler::send_message", skip(app_state, payload, _guard), fields(chat = %payload.chat_id))]
pub async fn send_message_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SendMessageRequestPayload>,
  _guard: ApiKeyGuard,
) -> Result<HttpResponse, AppError> {
  let parse_mode = payload
    .parse_mode
    .as_deref()
    .map(parse_mode_from)
    .transpose()?;

  // Unlike the broadcast fan-out, a single relay failure matters to the
  // caller, so transport errors propagate here (surfacing as 502).
  let message_id = app_state
    .flow
    .relay_message(payload.chat_id, &payload.message, parse_mode)
    .await?;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "messageId": message_id
  })))
}
