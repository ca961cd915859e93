// core/src/callback.rs

//! Typed chat-button callback tokens.
//!
//! Every inline button the bot attaches carries one of these payloads over
//! the wire as an underscore-delimited token (`accept_12345_a1b2c3_delivery`).
//! Order ids therefore must never contain `_`. Tokens are parsed exactly
//! once, at the webhook boundary, into [`CallbackPayload`]; everything past
//! that point works with the typed form.
//!
//! The contact-request token `share_contact` is a fixed literal and is
//! matched before any splitting, since it contains the delimiter itself.

use std::fmt::{self, Display};

use crate::error::CallbackError;
use crate::order::{ChatId, DeliveryMode, OrderId, StaffAction};

/// A parsed callback token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
  /// Staff accepted a pending order.
  Accept {
    customer: ChatId,
    order: OrderId,
    mode: DeliveryMode,
  },
  /// Staff denied a pending order.
  Deny {
    customer: ChatId,
    order: OrderId,
    mode: DeliveryMode,
  },
  /// Staff marked an accepted order ready for pickup/handoff.
  MarkReady {
    customer: ChatId,
    order: OrderId,
    mode: DeliveryMode,
  },
  /// Staff marked a ready order delivered (or picked up).
  MarkDelivered {
    customer: ChatId,
    order: OrderId,
    mode: DeliveryMode,
  },
  /// Customer rated a completed order.
  Review {
    rating: u8,
    customer: ChatId,
    order: OrderId,
    staff: ChatId,
  },
  /// Customer tapped the "share my phone number" button.
  RequestContact,
}

const CONTACT_TOKEN: &str = "share_contact";

impl CallbackPayload {
  /// Builds a review token for the given star rating.
  pub fn review(rating: u8, customer: ChatId, order: OrderId, staff: ChatId) -> Self {
    CallbackPayload::Review {
      rating,
      customer,
      order,
      staff,
    }
  }

  /// The wire action name this payload encodes under.
  pub fn action_name(&self) -> &'static str {
    match self {
      CallbackPayload::Accept { .. } => "accept",
      CallbackPayload::Deny { .. } => "deny",
      CallbackPayload::MarkReady { .. } => "done",
      CallbackPayload::MarkDelivered { .. } => "deliver",
      CallbackPayload::Review { .. } => "review",
      CallbackPayload::RequestContact => CONTACT_TOKEN,
    }
  }

  /// Collapses the four staff variants into their lifecycle action.
  /// `None` for review and contact payloads.
  pub fn staff_decision(&self) -> Option<(StaffAction, ChatId, &OrderId, DeliveryMode)> {
    match self {
      CallbackPayload::Accept {
        customer,
        order,
        mode,
      } => Some((StaffAction::Accept, *customer, order, *mode)),
      CallbackPayload::Deny {
        customer,
        order,
        mode,
      } => Some((StaffAction::Deny, *customer, order, *mode)),
      CallbackPayload::MarkReady {
        customer,
        order,
        mode,
      } => Some((StaffAction::MarkReady, *customer, order, *mode)),
      CallbackPayload::MarkDelivered {
        customer,
        order,
        mode,
      } => Some((StaffAction::MarkDelivered, *customer, order, *mode)),
      _ => None,
    }
  }

  /// Serializes to the wire token. Inverse of [`CallbackPayload::parse`].
  pub fn encode(&self) -> String {
    match self {
      CallbackPayload::Accept {
        customer,
        order,
        mode,
      }
      | CallbackPayload::Deny {
        customer,
        order,
        mode,
      }
      | CallbackPayload::MarkReady {
        customer,
        order,
        mode,
      }
      | CallbackPayload::MarkDelivered {
        customer,
        order,
        mode,
      } => format!(
        "{}_{customer}_{order}_{}",
        self.action_name(),
        mode.as_str()
      ),
      CallbackPayload::Review {
        rating,
        customer,
        order,
        staff,
      } => format!("review_{rating}_{customer}_{order}_{staff}"),
      CallbackPayload::RequestContact => CONTACT_TOKEN.to_string(),
    }
  }

  /// Parses a raw wire token.
  ///
  /// Never panics: malformed input of any shape comes back as a
  /// [`CallbackError`] so the webhook can acknowledge and drop it.
  pub fn parse(raw: &str) -> Result<CallbackPayload, CallbackError> {
    if raw == CONTACT_TOKEN {
      return Ok(CallbackPayload::RequestContact);
    }
    let fields: Vec<&str> = raw.split('_').collect();
    let action = fields[0];
    match action {
      "accept" | "deny" | "done" | "deliver" => {
        expect_fields(action, &fields, 4)?;
        let customer = parse_chat(action, "customer", fields[1])?;
        let order = parse_order(action, fields[2])?;
        let mode = DeliveryMode::parse(fields[3])
          .ok_or_else(|| CallbackError::bad_field(action, "mode"))?;
        Ok(match action {
          "accept" => CallbackPayload::Accept {
            customer,
            order,
            mode,
          },
          "deny" => CallbackPayload::Deny {
            customer,
            order,
            mode,
          },
          "done" => CallbackPayload::MarkReady {
            customer,
            order,
            mode,
          },
          _ => CallbackPayload::MarkDelivered {
            customer,
            order,
            mode,
          },
        })
      }
      "review" => {
        expect_fields(action, &fields, 5)?;
        let rating: u8 = fields[1]
          .parse()
          .map_err(|_| CallbackError::bad_field(action, "rating"))?;
        if !(1..=5).contains(&rating) {
          return Err(CallbackError::RatingOutOfRange(rating));
        }
        let customer = parse_chat(action, "customer", fields[2])?;
        let order = parse_order(action, fields[3])?;
        let staff = parse_chat(action, "staff", fields[4])?;
        Ok(CallbackPayload::Review {
          rating,
          customer,
          order,
          staff,
        })
      }
      other => Err(CallbackError::UnknownAction(other.to_string())),
    }
  }
}

impl Display for CallbackPayload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.encode())
  }
}

fn expect_fields(action: &str, fields: &[&str], expected: usize) -> Result<(), CallbackError> {
  if fields.len() == expected {
    Ok(())
  } else {
    Err(CallbackError::FieldCount {
      action: action.to_string(),
      expected,
      found: fields.len(),
    })
  }
}

fn parse_chat(action: &str, field: &'static str, raw: &str) -> Result<ChatId, CallbackError> {
  raw
    .parse()
    .map_err(|_| CallbackError::bad_field(action, field))
}

fn parse_order(action: &str, raw: &str) -> Result<OrderId, CallbackError> {
  if raw.is_empty() {
    Err(CallbackError::bad_field(action, "order"))
  } else {
    Ok(OrderId(raw.to_string()))
  }
}
