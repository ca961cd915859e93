// src/lib.rs

//! Tandir core: the domain heart of a food-ordering notification bridge.
//!
//! A storefront submits orders, restaurant staff drive each order through a
//! short button-driven lifecycle, and customers get status updates plus a
//! final rating prompt. This crate holds the parts of that flow that are
//! pure logic:
//!  - The order data model and its staff-driven status machine.
//!  - The weekly availability schedule and the open/closed gate.
//!  - Typed callback payloads and their underscore wire tokens.
//!  - Staff/customer message formatting with markup escaping.
//!
//! Everything that talks to the outside world (HTTP surface, chat transport,
//! the order-record store) lives in the server crate; nothing here performs
//! I/O, so every rule is checkable with plain values.

// Declare modules according to the planned structure
pub mod callback;
pub mod error;
pub mod format;
pub mod order;
pub mod schedule;

// --- Re-exports for the Public API ---

// Core types that users will interact with frequently
pub use crate::order::{ChatId, Coordinates, DeliveryMode, Order, OrderId, OrderItem};
pub use crate::order::{OrderStatus, StaffAction};

pub use crate::schedule::{BusinessSchedule, DayWindow, WeekSchedule};

pub use crate::callback::CallbackPayload;

pub use crate::error::{CallbackError, LifecycleError};
