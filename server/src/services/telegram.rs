// server/src/services/telegram.rs

//! Chat transport: wire DTOs for the Bot HTTP API plus the `ChatTransport`
//! seam the coordinator talks through.
//!
//! Only the handful of methods this bridge actually uses are modelled
//! (sendMessage, sendPhoto, editMessageReplyMarkup, answerCallbackQuery,
//! and the webhook pair used at startup). Everything rides the uniform
//! `{ ok, description?, result? }` response envelope.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::errors::{AppError, Result};
use tandir::ChatId;

pub type MessageId = i64;

// --- Outbound wire shapes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
  Markdown,
  MarkdownV2,
  #[serde(rename = "HTML")]
  Html,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebAppInfo {
  pub url: String,
}

/// One inline button. Exactly one of the action fields should be set;
/// the API rejects buttons with zero or several.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
  pub text: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub callback_data: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub web_app: Option<WebAppInfo>,
}

impl InlineKeyboardButton {
  pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      callback_data: Some(data.into()),
      ..Self::default()
    }
  }

  pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      web_app: Some(WebAppInfo { url: url.into() }),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
  pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
  /// One button per row.
  pub fn column(buttons: Vec<InlineKeyboardButton>) -> Self {
    Self {
      inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
    }
  }

  /// All buttons on a single row.
  pub fn row(buttons: Vec<InlineKeyboardButton>) -> Self {
    Self {
      inline_keyboard: vec![buttons],
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
  pub text: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_contact: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardMarkup {
  pub keyboard: Vec<Vec<KeyboardButton>>,
  pub resize_keyboard: bool,
  pub one_time_keyboard: bool,
}

impl ReplyKeyboardMarkup {
  /// The single-button "share my phone number" keyboard.
  pub fn contact_request(label: impl Into<String>) -> Self {
    Self {
      keyboard: vec![vec![KeyboardButton {
        text: label.into(),
        request_contact: Some(true),
      }]],
      resize_keyboard: true,
      one_time_keyboard: true,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardRemove {
  pub remove_keyboard: bool,
}

/// The `reply_markup` field accepts several distinct object shapes.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
  Inline(InlineKeyboardMarkup),
  Keyboard(ReplyKeyboardMarkup),
  Remove(ReplyKeyboardRemove),
}

impl From<InlineKeyboardMarkup> for ReplyMarkup {
  fn from(markup: InlineKeyboardMarkup) -> Self {
    ReplyMarkup::Inline(markup)
  }
}

impl From<ReplyKeyboardMarkup> for ReplyMarkup {
  fn from(markup: ReplyKeyboardMarkup) -> Self {
    ReplyMarkup::Keyboard(markup)
  }
}

// --- Inbound wire shapes (webhook updates) ---

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
  pub update_id: i64,
  #[serde(default)]
  pub message: Option<Message>,
  #[serde(default)]
  pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
  pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
  pub id: i64,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
  pub phone_number: String,
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
  pub message_id: MessageId,
  pub chat: Chat,
  #[serde(default)]
  pub from: Option<User>,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub contact: Option<Contact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
  pub id: String,
  pub from: User,
  #[serde(default)]
  pub message: Option<Message>,
  #[serde(default)]
  pub data: Option<String>,
}

/// Uniform Bot API response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
  pub ok: bool,
  #[serde(default)]
  pub description: Option<String>,
  pub result: Option<T>,
}

// --- The coordinator-facing seam ---

/// Everything the order flow needs from the chat side. Implemented by
/// [`BotApi`] in production and by recording fakes in tests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
  async fn send_message(
    &self,
    chat: ChatId,
    text: &str,
    parse_mode: Option<ParseMode>,
    reply_markup: Option<ReplyMarkup>,
  ) -> Result<MessageId>;

  async fn send_photo(&self, chat: ChatId, photo_url: &str, caption: &str) -> Result<MessageId>;

  /// Replaces (or with `None` clears) the inline keyboard under an
  /// already-sent message.
  async fn edit_reply_markup(
    &self,
    chat: ChatId,
    message_id: MessageId,
    markup: Option<InlineKeyboardMarkup>,
  ) -> Result<()>;

  /// Acknowledges a callback so the client stops its spinner; `text`
  /// shows as a toast.
  async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

// --- Production implementation ---

#[derive(Serialize)]
struct SendMessageBody<'a> {
  chat_id: i64,
  text: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  parse_mode: Option<ParseMode>,
  #[serde(skip_serializing_if = "Option::is_none")]
  reply_markup: Option<&'a ReplyMarkup>,
}

pub struct BotApi {
  client: Client,
  base_url: String, // {api_base}/bot{token}
}

impl BotApi {
  pub fn new(api_base: &str, token: &str) -> Result<Self> {
    let client = Client::builder()
      .timeout(std::time::Duration::from_secs(30))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
    })
  }

  /// Deletes any existing webhook registration. Startup-only.
  pub async fn delete_webhook(&self) -> Result<()> {
    let _: bool = self.call("deleteWebhook", &json!({})).await?;
    Ok(())
  }

  /// Points the Bot API at our webhook endpoint. Startup-only.
  pub async fn set_webhook(&self, url: &str) -> Result<()> {
    let _: bool = self.call("setWebhook", &json!({ "url": url })).await?;
    Ok(())
  }

  #[instrument(name = "bot_api::call", skip(self, body))]
  async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
    let url = format!("{}/{}", self.base_url, method);
    let response = self
      .client
      .post(&url)
      .json(body)
      .send()
      .await
      .map_err(|e| AppError::Transport(format!("'{}' request failed: {}", method, e)))?;
    let envelope: ApiResponse<T> = response
      .json()
      .await
      .map_err(|e| AppError::Transport(format!("'{}' returned an unreadable body: {}", method, e)))?;

    if envelope.ok {
      debug!(method, "Bot API call succeeded");
      envelope
        .result
        .ok_or_else(|| AppError::Transport(format!("'{}' replied ok without a result", method)))
    } else {
      Err(AppError::Transport(format!(
        "'{}' rejected: {}",
        method,
        envelope.description.unwrap_or_else(|| "no description".to_string())
      )))
    }
  }
}

#[async_trait]
impl ChatTransport for BotApi {
  async fn send_message(
    &self,
    chat: ChatId,
    text: &str,
    parse_mode: Option<ParseMode>,
    reply_markup: Option<ReplyMarkup>,
  ) -> Result<MessageId> {
    let message: Message = self
      .call(
        "sendMessage",
        &SendMessageBody {
          chat_id: chat.0,
          text,
          parse_mode,
          reply_markup: reply_markup.as_ref(),
        },
      )
      .await?;
    Ok(message.message_id)
  }

  async fn send_photo(&self, chat: ChatId, photo_url: &str, caption: &str) -> Result<MessageId> {
    let message: Message = self
      .call(
        "sendPhoto",
        &json!({ "chat_id": chat.0, "photo": photo_url, "caption": caption }),
      )
      .await?;
    Ok(message.message_id)
  }

  async fn edit_reply_markup(
    &self,
    chat: ChatId,
    message_id: MessageId,
    markup: Option<InlineKeyboardMarkup>,
  ) -> Result<()> {
    // Clearing a keyboard means sending an empty markup object.
    let markup = markup.unwrap_or(InlineKeyboardMarkup { inline_keyboard: vec![] });
    let _: serde_json::Value = self
      .call(
        "editMessageReplyMarkup",
        &json!({ "chat_id": chat.0, "message_id": message_id, "reply_markup": markup }),
      )
      .await?;
    Ok(())
  }

  async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
    let mut body = json!({ "callback_query_id": callback_id });
    if let Some(text) = text {
      body["text"] = json!(text);
    }
    let _: bool = self.call("answerCallbackQuery", &body).await?;
    Ok(())
  }
}
