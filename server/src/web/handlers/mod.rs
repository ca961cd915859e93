// server/src/web/handlers/mod.rs

// Declare handler modules
pub mod broadcast_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod webhook_handlers;
