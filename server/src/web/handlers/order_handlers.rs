// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::flow::OrderRequest;
use crate::state::AppState;

// --- Handler Implementation ---

#[instrument(name = "handler::submit_order", skip(app_state, payload))]
pub async fn submit_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
  // Validation, the availability gate, persistence, and the staff fan-out
  // all live in the flow; this handler only shapes the HTTP envelope.
  let order_id = app_state.flow.submit_order(payload.into_inner()).await?;

  info!(order_id = %order_id, "Order submission accepted");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Order received and forwarded to staff.",
    "orderId": order_id
  })))
}
