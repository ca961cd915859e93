// core/src/format.rs

//! Chat message formatting.
//!
//! Builds the staff order summary and the short customer-facing lifecycle
//! texts. Messages are sent with legacy-Markdown parsing, so user-supplied
//! fields get the characters that mode treats as formatting escaped before
//! interpolation; the template's own `*bold*` markers stay live.

use std::fmt::Write as _;

use crate::order::{Coordinates, DeliveryMode, Order, OrderId, OrderStatus};

/// Characters escaped in user-supplied text before it is interpolated
/// into a chat message. Legacy Markdown recognizes exactly these four;
/// escaping anything more leaves literal backslashes in the rendered
/// text.
const RESERVED: &[char] = &['_', '*', '`', '['];

/// Backslash-escapes every markup-significant character.
pub fn escape_markup(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for ch in text.chars() {
    if RESERVED.contains(&ch) {
      out.push('\\');
    }
    out.push(ch);
  }
  out
}

/// Map-query URL for a delivery point.
pub fn map_link(coordinates: Coordinates) -> String {
  format!(
    "https://maps.google.com/?q={},{}",
    coordinates.lat, coordinates.lon
  )
}

/// Prints a price without a trailing `.0` for whole values.
fn money(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{value:.0}")
  } else {
    format!("{value}")
  }
}

/// The staff-facing summary of a freshly submitted order.
///
/// Optional fields (phone, address, coordinates, comment) only produce a
/// line when present; a delivery order whose coordinates failed the lenient
/// parse simply has no map line. The total is always the last line.
pub fn order_summary(order: &Order) -> String {
  let mut text = String::new();
  let _ = writeln!(text, "🔔 *New order* #{}", order.id.short());
  let _ = writeln!(text, "👤 {}", escape_markup(&order.customer_name));
  if let Some(phone) = &order.phone {
    let _ = writeln!(text, "📞 {}", escape_markup(phone));
  }
  let _ = writeln!(text, "🚚 Type: {}", order.delivery_type);
  if order.delivery_type == DeliveryMode::Delivery {
    if let Some(location) = &order.location {
      let _ = writeln!(text, "📍 Address: {}", escape_markup(location));
    }
    if let Some(coordinates) = order.coordinates {
      let _ = writeln!(text, "🗺 Map: {}", map_link(coordinates));
    }
    if let Some(distance) = order.delivery_distance {
      let _ = writeln!(text, "📏 Distance: {} km", money(distance));
    }
    if let Some(price) = order.delivery_price {
      let _ = writeln!(text, "💵 Delivery: {}₽", money(price));
    }
  }
  let _ = writeln!(text, "\n🛒 Items:");
  for (i, item) in order.items.iter().enumerate() {
    let _ = write!(text, "{}. {}", i + 1, escape_markup(&item.name));
    if let Some(size) = &item.size {
      let _ = write!(text, " ({})", escape_markup(size));
    }
    let _ = writeln!(text, " - {} x {}₽", item.quantity, money(item.price));
    if !item.toppings.is_empty() {
      let joined = item
        .toppings
        .iter()
        .map(|t| escape_markup(t))
        .collect::<Vec<_>>()
        .join(", ");
      let _ = writeln!(text, "   ➕ {joined}");
    }
  }
  if let Some(comment) = &order.comment {
    let _ = writeln!(text, "\n💬 Comment: {}", escape_markup(comment));
  }
  let _ = write!(text, "\n💰 Total: {}₽", money(order.total));
  text
}

/// What the customer hears when staff move their order.
pub fn customer_status_message(status: OrderStatus, mode: DeliveryMode) -> &'static str {
  match (status, mode) {
    (OrderStatus::Pending, _) => "⏳ Your order has been received and is awaiting confirmation.",
    (OrderStatus::Accepted, _) => "✅ Your order has been accepted! We are preparing it now.",
    (OrderStatus::Denied, _) => {
      "❌ Unfortunately we cannot take your order right now. Please contact us for details."
    }
    (OrderStatus::Ready, DeliveryMode::Pickup) => "🎉 Your order is ready! You can pick it up now.",
    (OrderStatus::Ready, DeliveryMode::Delivery) => {
      "🎉 Your order is ready! The courier will be on the way shortly."
    }
    (OrderStatus::Completed, DeliveryMode::Pickup) => "🛍 Your order has been handed over. Enjoy!",
    (OrderStatus::Completed, DeliveryMode::Delivery) => "🚚 Your order has been delivered. Enjoy!",
  }
}

/// Asks the customer for a 1..=5 star rating after completion.
pub fn review_prompt() -> &'static str {
  "⭐ How was your order? Please rate us from 1 to 5."
}

pub fn review_thanks(rating: u8) -> String {
  format!("🙏 Thank you for your {rating}-star rating!")
}

pub fn review_failed() -> &'static str {
  "😔 We could not record your rating. Please try again later."
}

/// Tells the staff member who completed the order how it was rated.
pub fn staff_review_note(order: &OrderId, rating: u8) -> String {
  format!("⭐ Order #{} was rated {rating}/5 by the customer.", order.short())
}
