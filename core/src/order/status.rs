// core/src/order/status.rs

//! Order lifecycle state machine.
//!
//! Status only ever advances through staff decisions; there is no customer-
//! or storefront-driven transition. The machine is deliberately small:
//!
//! ```text
//! pending --accept--> accepted --done--> ready --deliver--> completed
//!    \--deny--> denied
//! ```
//!
//! `denied` and `completed` are terminal. Every other combination of status
//! and action is rejected with [`LifecycleError::InvalidTransition`], which
//! is what makes stale chat-button replays harmless.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::error::LifecycleError;

/// Where an order currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Accepted,
  Denied,
  Ready,
  Completed,
}

impl OrderStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Accepted => "accepted",
      OrderStatus::Denied => "denied",
      OrderStatus::Ready => "ready",
      OrderStatus::Completed => "completed",
    }
  }

  /// Terminal statuses accept no further action.
  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Denied | OrderStatus::Completed)
  }

  /// Applies a staff action, producing the next status.
  ///
  /// The action must match the current status exactly; anything else (a
  /// replayed button, an out-of-order tap) is an [`InvalidTransition`]
  /// and leaves the order untouched.
  ///
  /// [`InvalidTransition`]: LifecycleError::InvalidTransition
  pub fn apply(self, action: StaffAction) -> Result<OrderStatus, LifecycleError> {
    if self == action.expected_prior() {
      Ok(action.resulting_status())
    } else {
      Err(LifecycleError::InvalidTransition { from: self, action })
    }
  }
}

impl Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A staff decision taken from the chat buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaffAction {
  Accept,
  Deny,
  MarkReady,
  MarkDelivered,
}

impl StaffAction {
  /// The only status this action is valid from.
  pub fn expected_prior(self) -> OrderStatus {
    match self {
      StaffAction::Accept | StaffAction::Deny => OrderStatus::Pending,
      StaffAction::MarkReady => OrderStatus::Accepted,
      StaffAction::MarkDelivered => OrderStatus::Ready,
    }
  }

  /// The status the order moves to when this action lands.
  pub fn resulting_status(self) -> OrderStatus {
    match self {
      StaffAction::Accept => OrderStatus::Accepted,
      StaffAction::Deny => OrderStatus::Denied,
      StaffAction::MarkReady => OrderStatus::Ready,
      StaffAction::MarkDelivered => OrderStatus::Completed,
    }
  }
}
