// core/src/order/types.rs

//! The normalized order model carried through the bridge.
//!
//! Orders are created by the storefront and persisted by the external
//! order-record store; this crate never generates identifiers and never
//! recomputes totals. The serde shapes here mirror the storefront payload
//! vocabulary (camelCase field names, `topping` item lists, coordinates as
//! a pair or a comma string) so the server can deserialize inbound JSON
//! straight into them.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Opaque order identifier, assigned by the external order-record store.
///
/// Identifiers must not contain `_`: the callback wire format uses it as the
/// field delimiter (see [`crate::callback`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
  /// Trailing short form for human-facing headers (last 6 characters).
  ///
  /// Ids are opaque, so the suffix is taken on char boundaries rather
  /// than byte offsets.
  pub fn short(&self) -> &str {
    let start = self.0.char_indices().rev().nth(5).map_or(0, |(i, _)| i);
    &self.0[start..]
  }
}

impl Display for OrderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for OrderId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

/// Chat identifier for a customer or staff recipient.
///
/// Storefronts hand these over as either a JSON number or a numeric string
/// (both shapes exist in the wild), so deserialization accepts both. The
/// canonical payload location is the flat `user.userID` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl Display for ChatId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<i64> for ChatId {
  fn from(id: i64) -> Self {
    Self(id)
  }
}

impl FromStr for ChatId {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.trim().parse::<i64>().map(Self)
  }
}

impl Serialize for ChatId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(self.0)
  }
}

impl<'de> Deserialize<'de> for ChatId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Num(i64),
      Text(String),
    }

    match Raw::deserialize(deserializer)? {
      Raw::Num(n) => Ok(ChatId(n)),
      Raw::Text(s) => s
        .parse()
        .map_err(|_| serde::de::Error::custom(format!("invalid chat id: {s:?}"))),
    }
  }
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
  Pickup,
  Delivery,
}

impl DeliveryMode {
  pub fn as_str(self) -> &'static str {
    match self {
      DeliveryMode::Pickup => "pickup",
      DeliveryMode::Delivery => "delivery",
    }
  }

  /// Case-insensitive parse of the storefront `deliveryType` string.
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pickup" => Some(DeliveryMode::Pickup),
      "delivery" => Some(DeliveryMode::Delivery),
      _ => None,
    }
  }
}

impl Display for DeliveryMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Geographic point attached to delivery orders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lon: f64,
}

impl Coordinates {
  fn checked(lat: f64, lon: f64) -> Option<Self> {
    if lat.is_finite() && lon.is_finite() {
      Some(Self { lat, lon })
    } else {
      None
    }
  }

  /// Parses the comma-delimited text form (`"41.31,69.24"`).
  pub fn parse_text(s: &str) -> Option<Self> {
    let mut parts = s.split(',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lon = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() {
      return None;
    }
    Self::checked(lat, lon)
  }
}

/// Lenient coordinate deserializer: a two-element number pair or a comma
/// string parse to `Some`; any other shape (wrong arity, non-numeric text,
/// non-finite values, objects) is treated as absent, with the omission
/// logged, never as an error.
pub fn de_coordinates<'de, D>(deserializer: D) -> Result<Option<Coordinates>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Pair([f64; 2]),
    Text(String),
    Other(IgnoredAny),
  }

  let parsed = match Option::<Raw>::deserialize(deserializer)? {
    None => None,
    Some(Raw::Pair([lat, lon])) => {
      let c = Coordinates::checked(lat, lon);
      if c.is_none() {
        tracing::warn!(lat, lon, "dropping non-finite coordinates");
      }
      c
    }
    Some(Raw::Text(s)) => {
      let c = Coordinates::parse_text(&s);
      if c.is_none() {
        tracing::warn!(raw = %s, "dropping unparseable coordinate text");
      }
      c
    }
    Some(Raw::Other(_)) => {
      tracing::warn!("dropping coordinates with unsupported shape");
      None
    }
  };
  Ok(parsed)
}

/// One ordered line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
  pub name: String,
  pub quantity: u32,
  pub price: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub size: Option<String>,
  #[serde(rename = "topping", default, skip_serializing_if = "Vec::is_empty")]
  pub toppings: Vec<String>,
}

/// A normalized customer order.
///
/// The `total` is supplied by the caller and trusted as-is; the store owns
/// all money arithmetic. `items` may not be empty for a valid order — the
/// server rejects empty carts before one of these is ever built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: OrderId,
  pub customer: ChatId,
  pub customer_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  pub delivery_type: DeliveryMode,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(
    default,
    deserialize_with = "de_coordinates",
    skip_serializing_if = "Option::is_none"
  )]
  pub coordinates: Option<Coordinates>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub delivery_distance: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub delivery_price: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  pub items: Vec<OrderItem>,
  pub total: f64,
}
