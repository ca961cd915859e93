// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every fixture

use tandir::{BusinessSchedule, ChatId, DayWindow, Order, OrderId, OrderItem, WeekSchedule};
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Order fixtures ---

pub fn item(name: &str, quantity: u32, price: f64) -> OrderItem {
  OrderItem {
    name: name.to_string(),
    quantity,
    price,
    size: None,
    toppings: Vec::new(),
  }
}

/// A two-line pickup order totalling 100, matching the canonical
/// formatting scenario (Margherita 2 x 50 plus a free extra).
pub fn margherita_order() -> Order {
  let mut first = item("Margherita", 2, 50.0);
  first.toppings = vec!["cheese".to_string(), "olives".to_string()];
  Order {
    id: OrderId::from("ord-a1b2c3"),
    customer: ChatId(1001),
    customer_name: "Maria".to_string(),
    phone: Some("+998901234567".to_string()),
    delivery_type: tandir::DeliveryMode::Pickup,
    location: None,
    coordinates: None,
    delivery_distance: None,
    delivery_price: None,
    comment: None,
    items: vec![first, item("Water", 1, 0.0)],
    total: 100.0,
  }
}

// --- Schedule fixtures ---

pub fn window(start_hour: u32, end_hour: u32) -> DayWindow {
  DayWindow {
    start_hour,
    end_hour,
    is_open: true,
  }
}

/// A schedule with the same window every day of the week.
pub fn week_of(day: DayWindow) -> BusinessSchedule {
  BusinessSchedule {
    is_emergency_off: false,
    week: WeekSchedule {
      monday: Some(day),
      tuesday: Some(day),
      wednesday: Some(day),
      thursday: Some(day),
      friday: Some(day),
      saturday: Some(day),
      sunday: Some(day),
    },
    updated_at: None,
  }
}

/// Local wall-clock helper. 2025-06-02 is a Monday.
pub fn monday_at(hour: u32, minute: u32) -> chrono::NaiveDateTime {
  chrono::NaiveDate::from_ymd_opt(2025, 6, 2)
    .unwrap()
    .and_hms_opt(hour, minute, 0)
    .unwrap()
}
