// server/src/config.rs

use crate::errors::{AppError, Result}; // Use AppError specific Result
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;
use tandir::ChatId;

#[derive(Debug, Clone)] // Clone is useful if parts of config are passed around
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  // Chat transport
  pub bot_token: String,
  pub telegram_api_base: String,
  pub webhook_url: Option<String>,

  // External admin/order-management service
  pub admin_base_url: String,
  pub admin_api_key: String, // Also the shared key required on guarded inbound routes

  // Staff recipients for new-order fan-out
  pub staff_chat_ids: Vec<ChatId>,

  // Business-local timezone for the availability gate
  pub utc_offset: FixedOffset,

  // Pause between consecutive broadcast sends
  pub broadcast_delay_ms: u64,

  // Storefront URL shown on the /start keyboard
  pub web_app_url: Option<String>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let bot_token = get_env("TELEGRAM_BOT_TOKEN")?;
    let telegram_api_base =
      get_env("TELEGRAM_API_BASE").unwrap_or_else(|_| "https://api.telegram.org".to_string());
    let webhook_url = get_env("WEBHOOK_URL").ok().filter(|v| !v.is_empty());

    let admin_base_url = get_env("ADMIN_BASE_URL")?;
    let admin_api_key = get_env("ADMIN_API_KEY")?;

    let staff_chat_ids = get_env("STAFF_CHAT_IDS")?
      .split(',')
      .map(str::trim)
      .filter(|part| !part.is_empty())
      .map(|part| {
        part
          .parse::<ChatId>()
          .map_err(|e| AppError::Config(format!("Invalid chat id '{}' in STAFF_CHAT_IDS: {}", part, e)))
      })
      .collect::<Result<Vec<_>>>()?;
    if staff_chat_ids.is_empty() {
      return Err(AppError::Config(
        "STAFF_CHAT_IDS must name at least one recipient".to_string(),
      ));
    }

    // Business timezone, minutes east of UTC. Default is UTC+5.
    let offset_minutes = get_env("UTC_OFFSET_MINUTES")
      .unwrap_or_else(|_| "300".to_string())
      .parse::<i32>()
      .map_err(|e| AppError::Config(format!("Invalid UTC_OFFSET_MINUTES: {}", e)))?;
    let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
      .ok_or_else(|| AppError::Config(format!("UTC_OFFSET_MINUTES out of range: {}", offset_minutes)))?;

    let broadcast_delay_ms = get_env("BROADCAST_DELAY_MS")
      .unwrap_or_else(|_| "100".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid BROADCAST_DELAY_MS: {}", e)))?;

    let web_app_url = get_env("WEB_APP_URL").ok().filter(|v| !v.is_empty());

    tracing::info!(
      staff = staff_chat_ids.len(),
      webhook = webhook_url.is_some(),
      "Application configuration loaded successfully."
    );
    // Avoid logging secrets in production directly, or use redacted logging.

    Ok(Self {
      server_host,
      server_port,
      bot_token,
      telegram_api_base,
      webhook_url,
      admin_base_url,
      admin_api_key,
      staff_chat_ids,
      utc_offset,
      broadcast_delay_ms,
      web_app_url,
    })
  }
}
