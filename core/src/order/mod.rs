pub mod status;
pub mod types;

// Re-export key types for easier access from other Tandir modules (and lib.rs)
pub use status::{OrderStatus, StaffAction};
pub use types::{ChatId, Coordinates, DeliveryMode, Order, OrderId, OrderItem};
