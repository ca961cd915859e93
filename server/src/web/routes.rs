// server/src/web/routes.rs

use actix_web::web;

// Liveness probe; deliberately does not touch the admin service or the
// chat transport, so it stays green while upstreams flap.
async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// This function is called in `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    // Health Check Route
    .route("/health", web::get().to(health_check_handler))
    // Storefront + admin API surface
    .service(
      web::scope("/api")
        // Order submission (public storefront)
        .route(
          "/orders",
          web::post().to(crate::web::handlers::order_handlers::submit_order_handler),
        )
        // Menu passthrough (public storefront)
        .route(
          "/products",
          web::get().to(crate::web::handlers::product_handlers::list_products_handler),
        )
        // Admin-only endpoints, guarded by the shared x-api-key header
        .route(
          "/broadcast",
          web::post().to(crate::web::handlers::broadcast_handlers::broadcast_handler),
        )
        .route(
          "/send-message",
          web::post().to(crate::web::handlers::broadcast_handlers::send_message_handler),
        ),
    )
    // Chat-transport update intake
    .route(
      "/webhook",
      web::post().to(crate::web::handlers::webhook_handlers::chat_webhook_handler),
    );
}
