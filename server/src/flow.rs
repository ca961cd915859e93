// server/src/flow.rs

//! The order lifecycle coordinator.
//!
//! Every storefront submission and every chat interaction lands here. The
//! coordinator is a stateless relay: the authoritative order status lives in
//! the admin service, and each staff button press asks that service to move
//! the order before any user-visible effect happens. When the store refuses
//! (for example a stale button pressed after the order already advanced),
//! the press degrades to a failure toast and nothing else changes.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::services::admin::{AdminApi, NewOrderRecord};
use crate::services::telegram::{
  ChatTransport, Contact, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode,
  ReplyKeyboardMarkup, ReplyKeyboardRemove, ReplyMarkup,
};
use tandir::callback::CallbackPayload;
use tandir::format;
use tandir::{ChatId, Coordinates, DeliveryMode, OrderId, OrderItem, OrderStatus, StaffAction};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// --- Inbound storefront payload ---

/// The submission body as the storefront posts it. Field-level problems are
/// reported by `submit_order` as validation errors, so everything inside is
/// optional at the serde layer.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
  pub user: UserBlock,
  #[serde(default)]
  pub cart: Vec<OrderItem>,
  #[serde(rename = "orderID")]
  pub order: Option<OrderRef>,
}

/// Customer block. The canonical identifier shape is the flat
/// `user.userID`, as a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBlock {
  #[serde(rename = "userID", default)]
  pub user_id: Option<ChatId>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub delivery_type: Option<String>,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default, deserialize_with = "tandir::order::types::de_coordinates")]
  pub coordinates: Option<Coordinates>,
  #[serde(default)]
  pub delivery_distance: Option<f64>,
  #[serde(default)]
  pub delivery_price: Option<f64>,
  #[serde(default)]
  pub comment: Option<String>,
}

/// The storefront's own order reference: its transaction id plus the total
/// it charged. The total is trusted as-is, never recomputed.
#[derive(Debug, Deserialize)]
pub struct OrderRef {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub price: Option<f64>,
}

/// Locates the message whose button was pressed.
#[derive(Debug, Clone)]
pub struct CallbackCtx {
  pub callback_id: String,
  pub chat: ChatId,
  /// Absent for presses on messages the transport no longer exposes;
  /// keyboard edits are skipped in that case.
  pub message_id: Option<MessageId>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BroadcastReport {
  pub sent: usize,
  pub failed: usize,
}

// --- Fixed chat texts ---

const GREETING: &str =
  "👋 Welcome! Tap the menu button below to order, or share your phone number so we can reach you about your order.";
const CLOSED_NOTICE: &str = "🌙 We are closed right now. Please come back during business hours.";
const CONTACT_PROMPT: &str = "📱 Tap the button below to share your phone number.";
const CONTACT_SAVED: &str = "✅ Thank you! Your phone number has been saved.";
const CONTACT_FAILED: &str = "😔 We could not save your phone number. Please try again later.";
const UPDATE_FAILED_TOAST: &str = "Order update failed. Please try again.";

const MENU_BUTTON: &str = "🛒 Open menu";
const SHARE_CONTACT_BUTTON: &str = "📱 Share phone number";

pub struct OrderFlow {
  bot: Arc<dyn ChatTransport>,
  admin: Arc<dyn AdminApi>,
  staff: Vec<ChatId>,
  tz: FixedOffset,
  web_app_url: Option<String>,
  broadcast_delay_ms: u64,
  now: Clock,
}

impl OrderFlow {
  pub fn new(
    bot: Arc<dyn ChatTransport>,
    admin: Arc<dyn AdminApi>,
    staff: Vec<ChatId>,
    tz: FixedOffset,
    web_app_url: Option<String>,
    broadcast_delay_ms: u64,
  ) -> Self {
    Self {
      bot,
      admin,
      staff,
      tz,
      web_app_url,
      broadcast_delay_ms,
      now: Arc::new(Utc::now),
    }
  }

  /// Swaps the wall clock, letting tests pin the gate to a known instant.
  pub fn with_clock(mut self, now: Clock) -> Self {
    self.now = now;
    self
  }

  /// Evaluates the availability gate against a fresh schedule fetch.
  ///
  /// Never errors: a missing record, a fetch failure, or a malformed window
  /// all read as closed, with the cause in the logs.
  pub async fn is_open_now(&self) -> bool {
    let schedule = match self.admin.fetch_schedule().await {
      Ok(Some(schedule)) => schedule,
      Ok(None) => {
        warn!("No business schedule record exists, treating as closed");
        return false;
      }
      Err(e) => {
        warn!(error = %e, "Failed to read the business schedule, treating as closed");
        return false;
      }
    };
    let local = (self.now)().with_timezone(&self.tz).naive_local();
    schedule.is_open_at(local)
  }

  /// Takes a storefront submission end to end: validate, gate, persist,
  /// fan out to staff. Returns the store-assigned order id.
  ///
  /// Failures before the store call have no side effects at all; a store
  /// failure means nothing was sent to anyone.
  #[instrument(name = "flow::submit_order", skip(self, request))]
  pub async fn submit_order(&self, request: OrderRequest) -> Result<OrderId> {
    let record = normalize(request)?;

    // The gate is consulted exactly once, before any external notification.
    if !self.is_open_now().await {
      info!(customer = %record.customer, "Order rejected: business is closed");
      return Err(AppError::Closed);
    }

    let order_id = self.admin.create_order(&record).await?;
    if order_id.0.contains('_') {
      // Button tokens use '_' as their field delimiter, so such an id could
      // never round-trip through a callback.
      return Err(AppError::Upstream {
        status: None,
        detail: format!("store assigned an order id containing '_': {}", order_id),
      });
    }

    let order = record.into_order(order_id.clone());
    let summary = format::order_summary(&order);
    let markup = InlineKeyboardMarkup::row(vec![
      InlineKeyboardButton::callback(
        "✅ Accept",
        CallbackPayload::Accept {
          customer: order.customer,
          order: order_id.clone(),
          mode: order.delivery_type,
        }
        .encode(),
      ),
      InlineKeyboardButton::callback(
        "❌ Deny",
        CallbackPayload::Deny {
          customer: order.customer,
          order: order_id.clone(),
          mode: order.delivery_type,
        }
        .encode(),
      ),
    ]);

    let mut failed = 0usize;
    for staff in &self.staff {
      if let Err(e) = self
        .bot
        .send_message(
          *staff,
          &summary,
          Some(ParseMode::Markdown),
          Some(markup.clone().into()),
        )
        .await
      {
        warn!(staff = %staff, error = %e, "Failed to notify a staff recipient");
        failed += 1;
      }
    }
    info!(
      order_id = %order_id,
      notified = self.staff.len() - failed,
      failed,
      "Order persisted and staff notified"
    );

    Ok(order_id)
  }

  /// Dispatches one parsed button press.
  #[instrument(name = "flow::handle_callback", skip(self, ctx, payload), fields(chat = %ctx.chat))]
  pub async fn handle_callback(&self, ctx: CallbackCtx, payload: CallbackPayload) -> Result<()> {
    if let Some((action, customer, order, mode)) = payload.staff_decision() {
      let order = order.clone();
      return self.apply_staff_action(ctx, action, customer, order, mode).await;
    }
    match payload {
      CallbackPayload::Review {
        rating,
        customer,
        order,
        staff,
      } => self.record_review(ctx, rating, customer, order, staff).await,
      CallbackPayload::RequestContact => {
        self.bot.answer_callback(&ctx.callback_id, None).await?;
        self
          .bot
          .send_message(
            ctx.chat,
            CONTACT_PROMPT,
            None,
            Some(ReplyKeyboardMarkup::contact_request(SHARE_CONTACT_BUTTON).into()),
          )
          .await?;
        Ok(())
      }
      // Staff variants were dispatched above.
      _ => Ok(()),
    }
  }

  /// One staff decision: ask the store to advance the order, then (only on
  /// acknowledged success) update the button set and tell the customer.
  async fn apply_staff_action(
    &self,
    ctx: CallbackCtx,
    action: StaffAction,
    customer: ChatId,
    order: OrderId,
    mode: DeliveryMode,
  ) -> Result<()> {
    let next = action.resulting_status();

    if let Err(e) = self.admin.update_status(&order, next).await {
      // The store said no (stale button, upstream outage). The pressed
      // message keeps its buttons and the customer hears nothing.
      warn!(order_id = %order, ?action, error = %e, "Status update refused by the store");
      self
        .bot
        .answer_callback(&ctx.callback_id, Some(UPDATE_FAILED_TOAST))
        .await
        .unwrap_or_else(|e| debug!(error = %e, "Could not answer the callback"));
      return Ok(());
    }

    self
      .bot
      .answer_callback(&ctx.callback_id, Some(staff_toast(action)))
      .await
      .unwrap_or_else(|e| debug!(error = %e, "Could not answer the callback"));

    if let Some(message_id) = ctx.message_id {
      let markup = next_stage_markup(action, customer, &order, mode);
      if let Err(e) = self.bot.edit_reply_markup(ctx.chat, message_id, markup).await {
        warn!(order_id = %order, error = %e, "Failed to swap the staff keyboard");
      }
    }

    if let Err(e) = self
      .bot
      .send_message(customer, format::customer_status_message(next, mode), None, None)
      .await
    {
      warn!(order_id = %order, customer = %customer, error = %e, "Failed to notify the customer");
    }

    if next == OrderStatus::Completed {
      // The acting staff chat rides in the review token so the eventual
      // rating can be reported back to whoever closed the order.
      let markup = rating_markup(customer, &order, ctx.chat);
      if let Err(e) = self
        .bot
        .send_message(customer, format::review_prompt(), None, Some(markup.into()))
        .await
      {
        warn!(order_id = %order, customer = %customer, error = %e, "Failed to send the review prompt");
      }
    }

    info!(order_id = %order, status = %next, "Order advanced");
    Ok(())
  }

  /// A customer rating: forward to the store, thank or apologize, and tell
  /// the staff member who completed the order.
  async fn record_review(
    &self,
    ctx: CallbackCtx,
    rating: u8,
    customer: ChatId,
    order: OrderId,
    staff: ChatId,
  ) -> Result<()> {
    self
      .bot
      .answer_callback(&ctx.callback_id, None)
      .await
      .unwrap_or_else(|e| debug!(error = %e, "Could not answer the callback"));

    if let Err(e) = self.admin.submit_review(&order, rating).await {
      warn!(order_id = %order, rating, error = %e, "Review submission refused by the store");
      if let Err(e) = self
        .bot
        .send_message(customer, format::review_failed(), None, None)
        .await
      {
        warn!(customer = %customer, error = %e, "Failed to deliver the review-failed notice");
      }
      return Ok(());
    }

    // Retire the star buttons so a second tap has nothing to press.
    if let Some(message_id) = ctx.message_id {
      if let Err(e) = self.bot.edit_reply_markup(ctx.chat, message_id, None).await {
        warn!(order_id = %order, error = %e, "Failed to clear the rating keyboard");
      }
    }
    if let Err(e) = self
      .bot
      .send_message(customer, &format::review_thanks(rating), None, None)
      .await
    {
      warn!(customer = %customer, error = %e, "Failed to thank the customer");
    }
    if let Err(e) = self
      .bot
      .send_message(staff, &format::staff_review_note(&order, rating), None, None)
      .await
    {
      warn!(staff = %staff, error = %e, "Failed to deliver the review note to staff");
    }

    info!(order_id = %order, rating, "Review recorded");
    Ok(())
  }

  /// `/start`: greet when open, otherwise say so. The greeting keyboard
  /// offers the storefront web app (when configured) and contact sharing.
  #[instrument(name = "flow::start_session", skip(self))]
  pub async fn start_session(&self, chat: ChatId) -> Result<()> {
    if !self.is_open_now().await {
      self.bot.send_message(chat, CLOSED_NOTICE, None, None).await?;
      return Ok(());
    }

    let mut buttons = Vec::new();
    if let Some(url) = &self.web_app_url {
      buttons.push(InlineKeyboardButton::web_app(MENU_BUTTON, url.clone()));
    }
    buttons.push(InlineKeyboardButton::callback(
      SHARE_CONTACT_BUTTON,
      CallbackPayload::RequestContact.encode(),
    ));

    self
      .bot
      .send_message(
        chat,
        GREETING,
        None,
        Some(InlineKeyboardMarkup::column(buttons).into()),
      )
      .await?;
    Ok(())
  }

  /// A shared contact arrived: persist it in the admin directory and
  /// confirm, dropping the one-time reply keyboard either way.
  #[instrument(name = "flow::capture_contact", skip(self, contact))]
  pub async fn capture_contact(
    &self,
    chat: ChatId,
    username: Option<&str>,
    contact: &Contact,
  ) -> Result<()> {
    let text = match self
      .admin
      .upsert_contact(chat, username, &contact.phone_number)
      .await
    {
      Ok(()) => CONTACT_SAVED,
      Err(e) => {
        warn!(chat = %chat, error = %e, "Failed to store a shared contact");
        CONTACT_FAILED
      }
    };
    self
      .bot
      .send_message(
        chat,
        text,
        None,
        Some(ReplyMarkup::Remove(ReplyKeyboardRemove { remove_keyboard: true })),
      )
      .await?;
    Ok(())
  }

  /// Fans a notice out to every registered chat, pausing between sends.
  /// Per-recipient failures are counted, never retried.
  #[instrument(name = "flow::broadcast", skip(self, title, message, image_url))]
  pub async fn broadcast(
    &self,
    title: &str,
    message: &str,
    image_url: Option<&str>,
  ) -> Result<BroadcastReport> {
    let recipients = self.admin.list_recipients().await?;
    info!(recipients = recipients.len(), "Starting broadcast fan-out");

    // The title rides inside a bold span, so admin text is escaped too.
    let text = format!(
      "*{}*\n\n{}",
      format::escape_markup(title),
      format::escape_markup(message)
    );
    let mut report = BroadcastReport::default();
    for (i, chat) in recipients.iter().enumerate() {
      if i > 0 && self.broadcast_delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(self.broadcast_delay_ms)).await;
      }
      let outcome = match image_url {
        Some(url) => self.bot.send_photo(*chat, url, &text).await,
        None => {
          self
            .bot
            .send_message(*chat, &text, Some(ParseMode::Markdown), None)
            .await
        }
      };
      match outcome {
        Ok(_) => report.sent += 1,
        Err(e) => {
          warn!(chat = %chat, error = %e, "Broadcast delivery failed for a recipient");
          report.failed += 1;
        }
      }
    }

    info!(sent = report.sent, failed = report.failed, "Broadcast finished");
    Ok(report)
  }

  /// Direct relay for the admin system: deliver one message to one chat.
  /// Unlike the fan-outs, a delivery failure here surfaces to the caller.
  pub async fn relay_message(
    &self,
    chat: ChatId,
    text: &str,
    parse_mode: Option<ParseMode>,
  ) -> Result<MessageId> {
    self.bot.send_message(chat, text, parse_mode, None).await
  }
}

/// Checks the submission and shapes it into a store record. Violations
/// come back as validation errors before anything external is touched.
fn normalize(request: OrderRequest) -> Result<NewOrderRecord> {
  if request.cart.is_empty() {
    return Err(AppError::Validation("cart must contain at least one item".to_string()));
  }

  let user = request.user;
  let customer = user
    .user_id
    .ok_or_else(|| AppError::Validation("user.userID is required".to_string()))?;
  let name = user
    .name
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| AppError::Validation("user.name is required".to_string()))?
    .to_string();
  let phone = user
    .phone
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| AppError::Validation("user.phone is required".to_string()))?
    .to_string();
  let delivery_type = user
    .delivery_type
    .as_deref()
    .and_then(DeliveryMode::parse)
    .ok_or_else(|| {
      AppError::Validation("user.deliveryType must be 'pickup' or 'delivery'".to_string())
    })?;

  let order_ref = request
    .order
    .ok_or_else(|| AppError::Validation("orderID block is required".to_string()))?;
  let reference = order_ref
    .id
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| AppError::Validation("orderID.id is required".to_string()))?
    .to_string();
  let total = order_ref
    .price
    .filter(|p| p.is_finite() && *p > 0.0)
    .ok_or_else(|| AppError::Validation("orderID.price must be a positive number".to_string()))?;

  Ok(NewOrderRecord {
    customer,
    customer_name: name,
    phone: Some(phone),
    delivery_type,
    location: user.location,
    coordinates: user.coordinates,
    delivery_distance: user.delivery_distance,
    delivery_price: user.delivery_price,
    comment: user.comment,
    items: request.cart,
    total,
    status: OrderStatus::Pending,
    reference: Some(reference),
  })
}

fn staff_toast(action: StaffAction) -> &'static str {
  match action {
    StaffAction::Accept => "Order accepted",
    StaffAction::Deny => "Order denied",
    StaffAction::MarkReady => "Order marked ready",
    StaffAction::MarkDelivered => "Order completed",
  }
}

/// The single follow-up button offered after a successful transition, or
/// `None` when the new status is terminal and the keyboard just clears.
fn next_stage_markup(
  action: StaffAction,
  customer: ChatId,
  order: &OrderId,
  mode: DeliveryMode,
) -> Option<InlineKeyboardMarkup> {
  match action {
    StaffAction::Accept => Some(InlineKeyboardMarkup::row(vec![InlineKeyboardButton::callback(
      "🍳 Mark Ready",
      CallbackPayload::MarkReady {
        customer,
        order: order.clone(),
        mode,
      }
      .encode(),
    )])),
    StaffAction::MarkReady => {
      let label = match mode {
        DeliveryMode::Delivery => "🚚 Mark Delivered",
        DeliveryMode::Pickup => "🛍 Mark Picked up",
      };
      Some(InlineKeyboardMarkup::row(vec![InlineKeyboardButton::callback(
        label,
        CallbackPayload::MarkDelivered {
          customer,
          order: order.clone(),
          mode,
        }
        .encode(),
      )]))
    }
    StaffAction::Deny | StaffAction::MarkDelivered => None,
  }
}

fn rating_markup(customer: ChatId, order: &OrderId, staff: ChatId) -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::row(
    (1..=5)
      .map(|rating| {
        InlineKeyboardButton::callback(
          format!("⭐ {}", rating),
          CallbackPayload::review(rating, customer, order.clone(), staff).encode(),
        )
      })
      .collect(),
  )
}
