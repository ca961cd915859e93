// server/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{debug, instrument, warn};

use crate::flow::CallbackCtx;
use crate::services::telegram::Update;
use crate::state::AppState;
use tandir::callback::CallbackPayload;
use tandir::ChatId;

// --- Handler Implementation ---

/// Chat-transport update intake.
///
/// Always answers 200: the transport re-delivers on anything else, and
/// there is no caller to report a bad update to. Unparseable bodies,
/// unknown callback tokens, and uninteresting messages are all logged
/// and swallowed here.
#[instrument(name = "handler::chat_webhook", skip(app_state, body), fields(payload_bytes = body.len()))]
pub async fn chat_webhook_handler(app_state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
  let update: Update = match serde_json::from_slice(&body) {
    Ok(update) => update,
    Err(e) => {
      warn!(error = %e, "Discarding an unparseable webhook body");
      return HttpResponse::Ok().finish();
    }
  };

  if let Some(query) = update.callback_query {
    // Prefer the chat that hosts the pressed message; fall back to the
    // presser's own chat for detached callbacks.
    let chat = query
      .message
      .as_ref()
      .map(|m| ChatId(m.chat.id))
      .unwrap_or(ChatId(query.from.id));
    let ctx = CallbackCtx {
      callback_id: query.id.clone(),
      chat,
      message_id: query.message.as_ref().map(|m| m.message_id),
    };

    match query.data.as_deref().map(CallbackPayload::parse) {
      Some(Ok(payload)) => {
        if let Err(e) = app_state.flow.handle_callback(ctx, payload).await {
          warn!(error = %e, "Callback handling failed");
        }
      }
      Some(Err(e)) => {
        // Stale or hand-crafted token: acknowledge so the client UI
        // stops waiting, then drop it.
        warn!(error = %e, "Ignoring a malformed callback token");
        if let Err(e) = app_state.bot.answer_callback(&query.id, None).await {
          debug!(error = %e, "Could not acknowledge the malformed callback");
        }
      }
      None => {
        debug!("Callback query carried no data");
        if let Err(e) = app_state.bot.answer_callback(&query.id, None).await {
          debug!(error = %e, "Could not acknowledge the empty callback");
        }
      }
    }
    return HttpResponse::Ok().finish();
  }

  if let Some(message) = update.message {
    let chat = ChatId(message.chat.id);
    if let Some(contact) = &message.contact {
      let username = message.from.as_ref().and_then(|u| u.username.as_deref());
      if let Err(e) = app_state.flow.capture_contact(chat, username, contact).await {
        warn!(chat = %chat, error = %e, "Contact capture failed");
      }
    } else if message
      .text
      .as_deref()
      .map(|t| t.trim().starts_with("/start"))
      .unwrap_or(false)
    {
      if let Err(e) = app_state.flow.start_session(chat).await {
        warn!(chat = %chat, error = %e, "Session greeting failed");
      }
    } else {
      debug!(chat = %chat, "Ignoring a chat update with no actionable content");
    }
  }

  HttpResponse::Ok().finish()
}
