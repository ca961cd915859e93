// server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  // Straight passthrough: the admin service owns the catalog, the
  // storefront just needs a same-origin place to fetch it from.
  let products = app_state.admin.list_products().await?;

  info!("Product catalog fetched from the admin service");
  Ok(HttpResponse::Ok().json(products))
}
