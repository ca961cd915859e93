// server/src/main.rs

use tandir_server::config::AppConfig;
use tandir_server::flow::OrderFlow;
use tandir_server::services::admin::{AdminApi, AdminClient};
use tandir_server::services::telegram::{BotApi, ChatTransport};
use tandir_server::state::AppState;
use tandir_server::web;

use actix_web::{web as actix_data, App, HttpServer}; // Renamed web to actix_data
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

// Main function
#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // Initialize tracing subscriber for logging
  // (Customize as needed, e.g., with JSON output, OpenTelemetry)
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO) // Default level
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .init();

  tracing::info!("Starting order notification bridge...");

  // Load application configuration
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg), // Arc the config for sharing
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  // Chat transport client
  let bot_api = match BotApi::new(&app_config.telegram_api_base, &app_config.bot_token) {
    Ok(bot) => Arc::new(bot),
    Err(e) => {
      tracing::error!(error = %e, "Failed to build the chat transport client.");
      panic!("Chat transport error: {}", e);
    }
  };

  // Re-point the webhook at ourselves. Failures are logged but not fatal:
  // the HTTP surface still works, and a previously registered webhook may
  // still be valid.
  if let Some(webhook_url) = &app_config.webhook_url {
    if let Err(e) = bot_api.delete_webhook().await {
      tracing::warn!(error = %e, "Could not delete the previous webhook registration.");
    }
    match bot_api.set_webhook(webhook_url).await {
      Ok(()) => tracing::info!(url = %webhook_url, "Webhook registered."),
      Err(e) => tracing::warn!(error = %e, "Could not register the webhook."),
    }
  } else {
    tracing::info!("WEBHOOK_URL not set; skipping webhook registration.");
  }

  // Admin/order-management service client
  let admin_client = match AdminClient::new(&app_config.admin_base_url, &app_config.admin_api_key) {
    Ok(client) => Arc::new(client),
    Err(e) => {
      tracing::error!(error = %e, "Failed to build the admin service client.");
      panic!("Admin client error: {}", e);
    }
  };

  let bot: Arc<dyn ChatTransport> = bot_api.clone();
  let admin: Arc<dyn AdminApi> = admin_client.clone();

  // The coordinator that ties transport, store, and gate together
  let flow = Arc::new(OrderFlow::new(
    bot.clone(),
    admin.clone(),
    app_config.staff_chat_ids.clone(),
    app_config.utc_offset,
    app_config.web_app_url.clone(),
    app_config.broadcast_delay_ms,
  ));

  // Create AppState
  let app_state = AppState {
    config: app_config.clone(),
    bot,
    admin,
    flow,
  };

  // Configure and Start Actix Web Server
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
