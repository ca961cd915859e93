// core/src/error.rs
use thiserror::Error;

use crate::order::{OrderStatus, StaffAction};

/// Violations of the staff-driven order status machine.
///
/// The bridge is a stateless relay: the authoritative status lives in the
/// external order-record store. This error therefore signals a *locally
/// detectable* misuse (e.g. a replayed button for a stage the order already
/// left), not a storage conflict.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
  #[error("action {action:?} is not valid for an order in status {from:?}")]
  InvalidTransition { from: OrderStatus, action: StaffAction },
}

/// Failures while decoding a callback wire token into a typed payload.
///
/// Tokens arrive from chat clients that may hold stale or hand-crafted
/// buttons, so every variant here is expected traffic: callers log the
/// failure and acknowledge the callback, they never propagate it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallbackError {
  #[error("unknown callback action: {0}")]
  UnknownAction(String),

  #[error("callback '{action}' carries {found} fields, expected {expected}")]
  FieldCount {
    action: String,
    expected: usize,
    found: usize,
  },

  #[error("callback '{action}' has an unparseable '{field}' field")]
  BadField {
    action: String,
    field: &'static str,
  },

  #[error("review rating {0} is outside 1..=5")]
  RatingOutOfRange(u8),
}

impl CallbackError {
  pub(crate) fn bad_field(action: &str, field: &'static str) -> Self {
    CallbackError::BadField {
      action: action.to_string(),
      field,
    }
  }
}
