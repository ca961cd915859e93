// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every fixture

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::json;
use tracing::Level;

use tandir::{BusinessSchedule, ChatId, DayWindow, OrderId, OrderStatus, WeekSchedule};
use tandir_server::config::AppConfig;
use tandir_server::errors::{AppError, Result};
use tandir_server::flow::{Clock, OrderFlow, OrderRequest};
use tandir_server::services::admin::{AdminApi, NewOrderRecord};
use tandir_server::services::telegram::{
  ChatTransport, InlineKeyboardMarkup, MessageId, ParseMode, ReplyMarkup,
};
use tandir_server::state::AppState;

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

// --- Well-known chats used across the tests ---

pub const STAFF_A: ChatId = ChatId(7001);
pub const STAFF_B: ChatId = ChatId(7002);
pub const CUSTOMER: ChatId = ChatId(555001);

// --- Recording chat transport ---

#[derive(Debug, Clone)]
pub struct SentMessage {
  pub chat: ChatId,
  pub text: String,
  pub parse_mode: Option<ParseMode>,
  pub markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone)]
pub struct SentPhoto {
  pub chat: ChatId,
  pub photo_url: String,
  pub caption: String,
}

#[derive(Debug, Clone)]
pub struct MarkupEdit {
  pub chat: ChatId,
  pub message_id: MessageId,
  pub markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone)]
pub struct CallbackAnswer {
  pub callback_id: String,
  pub text: Option<String>,
}

/// In-memory chat transport. Every call is recorded; chats listed in
/// `failing` refuse delivery with a transport error.
#[derive(Default)]
pub struct MockTransport {
  pub sent: Mutex<Vec<SentMessage>>,
  pub photos: Mutex<Vec<SentPhoto>>,
  pub edits: Mutex<Vec<MarkupEdit>>,
  pub answers: Mutex<Vec<CallbackAnswer>>,
  failing: Mutex<Vec<ChatId>>,
  next_message_id: Mutex<MessageId>,
}

impl MockTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Makes every future delivery to `chat` fail.
  pub fn fail_chat(&self, chat: ChatId) {
    self.failing.lock().unwrap().push(chat);
  }

  fn refuses(&self, chat: ChatId) -> bool {
    self.failing.lock().unwrap().contains(&chat)
  }

  pub fn messages_to(&self, chat: ChatId) -> Vec<SentMessage> {
    self
      .sent
      .lock()
      .unwrap()
      .iter()
      .filter(|m| m.chat == chat)
      .cloned()
      .collect()
  }

  pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
    self.messages_to(chat).into_iter().map(|m| m.text).collect()
  }

  pub fn sent_count(&self) -> usize {
    self.sent.lock().unwrap().len()
  }

  pub fn last_answer(&self) -> Option<CallbackAnswer> {
    self.answers.lock().unwrap().last().cloned()
  }
}

#[async_trait]
impl ChatTransport for MockTransport {
  async fn send_message(
    &self,
    chat: ChatId,
    text: &str,
    parse_mode: Option<ParseMode>,
    reply_markup: Option<ReplyMarkup>,
  ) -> Result<MessageId> {
    if self.refuses(chat) {
      return Err(AppError::Transport(format!("mock refused chat {}", chat)));
    }
    self.sent.lock().unwrap().push(SentMessage {
      chat,
      text: text.to_string(),
      parse_mode,
      markup: reply_markup,
    });
    let mut next = self.next_message_id.lock().unwrap();
    *next += 1;
    Ok(*next)
  }

  async fn send_photo(&self, chat: ChatId, photo_url: &str, caption: &str) -> Result<MessageId> {
    if self.refuses(chat) {
      return Err(AppError::Transport(format!("mock refused chat {}", chat)));
    }
    self.photos.lock().unwrap().push(SentPhoto {
      chat,
      photo_url: photo_url.to_string(),
      caption: caption.to_string(),
    });
    let mut next = self.next_message_id.lock().unwrap();
    *next += 1;
    Ok(*next)
  }

  async fn edit_reply_markup(
    &self,
    chat: ChatId,
    message_id: MessageId,
    markup: Option<InlineKeyboardMarkup>,
  ) -> Result<()> {
    self.edits.lock().unwrap().push(MarkupEdit {
      chat,
      message_id,
      markup,
    });
    Ok(())
  }

  async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
    self.answers.lock().unwrap().push(CallbackAnswer {
      callback_id: callback_id.to_string(),
      text: text.map(str::to_string),
    });
    Ok(())
  }
}

// --- In-memory admin/order-management service ---

pub enum ScheduleFixture {
  Present(BusinessSchedule),
  Missing,
  Unavailable,
}

/// Stand-in for the external store. It keeps order statuses and enforces
/// the same transition precondition the real store does, so a stale or
/// out-of-order update is refused here too.
pub struct MockAdmin {
  pub statuses: Mutex<HashMap<String, OrderStatus>>,
  pub created: Mutex<Vec<NewOrderRecord>>,
  pub reviews: Mutex<Vec<(String, u8)>>,
  pub contacts: Mutex<Vec<(ChatId, Option<String>, String)>>,
  pub recipients: Mutex<Vec<ChatId>>,
  pub schedule: Mutex<ScheduleFixture>,
  /// The id handed out by the next `create_order` call.
  pub assigned_id: Mutex<String>,
  pub fail_create: Mutex<bool>,
  pub fail_reviews: Mutex<bool>,
  pub fail_contacts: Mutex<bool>,
  pub fail_recipients: Mutex<bool>,
}

impl MockAdmin {
  pub fn with_schedule(schedule: ScheduleFixture) -> Arc<Self> {
    Arc::new(Self {
      statuses: Mutex::new(HashMap::new()),
      created: Mutex::new(Vec::new()),
      reviews: Mutex::new(Vec::new()),
      contacts: Mutex::new(Vec::new()),
      recipients: Mutex::new(vec![CUSTOMER, ChatId(555002), ChatId(555003)]),
      schedule: Mutex::new(schedule),
      assigned_id: Mutex::new("store-1001".to_string()),
      fail_create: Mutex::new(false),
      fail_reviews: Mutex::new(false),
      fail_contacts: Mutex::new(false),
      fail_recipients: Mutex::new(false),
    })
  }

  /// A store whose schedule says "open" at the pinned test clock.
  pub fn open() -> Arc<Self> {
    Self::with_schedule(ScheduleFixture::Present(every_day(8, 22)))
  }

  /// A store whose schedule window has already ended at the pinned clock.
  pub fn closed() -> Arc<Self> {
    Self::with_schedule(ScheduleFixture::Present(every_day(8, 10)))
  }

  pub fn seed_order(&self, id: &str, status: OrderStatus) {
    self.statuses.lock().unwrap().insert(id.to_string(), status);
  }

  pub fn status_of(&self, id: &str) -> Option<OrderStatus> {
    self.statuses.lock().unwrap().get(id).copied()
  }
}

#[async_trait]
impl AdminApi for MockAdmin {
  async fn create_order(&self, record: &NewOrderRecord) -> Result<OrderId> {
    if *self.fail_create.lock().unwrap() {
      return Err(AppError::Upstream {
        status: Some(500),
        detail: "mock store rejected the order".to_string(),
      });
    }
    self.created.lock().unwrap().push(record.clone());
    let id = self.assigned_id.lock().unwrap().clone();
    self.statuses.lock().unwrap().insert(id.clone(), record.status);
    Ok(OrderId(id))
  }

  async fn update_status(&self, order: &OrderId, status: OrderStatus) -> Result<()> {
    let mut statuses = self.statuses.lock().unwrap();
    let current = *statuses.get(&order.0).ok_or_else(|| AppError::Upstream {
      status: Some(404),
      detail: format!("unknown order {}", order),
    })?;
    let allowed = matches!(
      (current, status),
      (OrderStatus::Pending, OrderStatus::Accepted)
        | (OrderStatus::Pending, OrderStatus::Denied)
        | (OrderStatus::Accepted, OrderStatus::Ready)
        | (OrderStatus::Ready, OrderStatus::Completed)
    );
    if !allowed {
      return Err(AppError::Upstream {
        status: Some(409),
        detail: format!("order {} is {}, cannot become {}", order, current, status),
      });
    }
    statuses.insert(order.0.clone(), status);
    Ok(())
  }

  async fn submit_review(&self, order: &OrderId, rating: u8) -> Result<()> {
    if *self.fail_reviews.lock().unwrap() {
      return Err(AppError::Upstream {
        status: Some(500),
        detail: "mock store rejected the review".to_string(),
      });
    }
    self.reviews.lock().unwrap().push((order.0.clone(), rating));
    Ok(())
  }

  async fn fetch_schedule(&self) -> Result<Option<BusinessSchedule>> {
    match &*self.schedule.lock().unwrap() {
      ScheduleFixture::Present(schedule) => Ok(Some(schedule.clone())),
      ScheduleFixture::Missing => Ok(None),
      ScheduleFixture::Unavailable => Err(AppError::Upstream {
        status: Some(503),
        detail: "mock schedule endpoint down".to_string(),
      }),
    }
  }

  async fn list_recipients(&self) -> Result<Vec<ChatId>> {
    if *self.fail_recipients.lock().unwrap() {
      return Err(AppError::Upstream {
        status: Some(500),
        detail: "mock recipient listing failed".to_string(),
      });
    }
    Ok(self.recipients.lock().unwrap().clone())
  }

  async fn upsert_contact(&self, chat: ChatId, username: Option<&str>, phone: &str) -> Result<()> {
    if *self.fail_contacts.lock().unwrap() {
      return Err(AppError::Upstream {
        status: Some(500),
        detail: "mock contact upsert failed".to_string(),
      });
    }
    self
      .contacts
      .lock()
      .unwrap()
      .push((chat, username.map(str::to_string), phone.to_string()));
    Ok(())
  }

  async fn list_products(&self) -> Result<serde_json::Value> {
    Ok(json!([{ "name": "Margherita", "price": 50.0 }]))
  }
}

/// All callback tokens in an inline keyboard, reading order.
pub fn inline_tokens(markup: &ReplyMarkup) -> Vec<String> {
  match markup {
    ReplyMarkup::Inline(inline) => inline
      .inline_keyboard
      .iter()
      .flatten()
      .filter_map(|b| b.callback_data.clone())
      .collect(),
    _ => Vec::new(),
  }
}

/// All button labels in an inline keyboard, reading order.
pub fn inline_texts(markup: &ReplyMarkup) -> Vec<String> {
  match markup {
    ReplyMarkup::Inline(inline) => inline
      .inline_keyboard
      .iter()
      .flatten()
      .map(|b| b.text.clone())
      .collect(),
    _ => Vec::new(),
  }
}

// --- Schedule fixtures ---

/// The same window on all seven days.
pub fn every_day(start_hour: u32, end_hour: u32) -> BusinessSchedule {
  let window = DayWindow {
    start_hour,
    end_hour,
    is_open: true,
  };
  BusinessSchedule {
    is_emergency_off: false,
    week: WeekSchedule {
      monday: Some(window),
      tuesday: Some(window),
      wednesday: Some(window),
      thursday: Some(window),
      friday: Some(window),
      saturday: Some(window),
      sunday: Some(window),
    },
    updated_at: None,
  }
}

// --- Clock fixtures ---

/// 2025-06-02 is a Monday; tests pin the gate to some time on that day.
pub fn monday_clock(hour: u32, min: u32) -> Clock {
  let instant: DateTime<Utc> = Utc
    .with_ymd_and_hms(2025, 6, 2, hour, min, 0)
    .single()
    .expect("valid test instant");
  Arc::new(move || instant)
}

// --- Coordinator harness ---

pub struct Harness {
  pub bot: Arc<MockTransport>,
  pub admin: Arc<MockAdmin>,
  pub flow: OrderFlow,
}

pub fn harness() -> Harness {
  harness_with(MockAdmin::open())
}

pub fn harness_with(admin: Arc<MockAdmin>) -> Harness {
  let bot = MockTransport::new();
  let flow = OrderFlow::new(
    bot.clone(),
    admin.clone(),
    vec![STAFF_A, STAFF_B],
    FixedOffset::east_opt(0).unwrap(),
    Some("https://shop.example/menu".to_string()),
    0, // No inter-send pause in tests
  )
  .with_clock(monday_clock(12, 0));
  Harness { bot, admin, flow }
}

// --- Storefront payload fixtures ---

pub fn pickup_order_json() -> serde_json::Value {
  json!({
    "user": {
      "userID": CUSTOMER.0,
      "name": "Maria",
      "phone": "+998901112233",
      "deliveryType": "pickup"
    },
    "cart": [
      { "name": "Margherita", "quantity": 2, "price": 50.0 },
      { "name": "Cola", "quantity": 1, "price": 10.0 }
    ],
    "orderID": { "id": "web-777", "price": 110.0 }
  })
}

pub fn delivery_order_json() -> serde_json::Value {
  json!({
    "user": {
      "userID": CUSTOMER.0,
      "name": "Maria",
      "phone": "+998901112233",
      "deliveryType": "delivery",
      "location": "12 Tashkent street",
      "coordinates": [41.2995, 69.2401],
      "deliveryDistance": 3.4,
      "deliveryPrice": 15.0,
      "comment": "Ring twice"
    },
    "cart": [
      { "name": "Margherita", "quantity": 1, "price": 50.0 }
    ],
    "orderID": { "id": "web-778", "price": 65.0 }
  })
}

pub fn pickup_order_request() -> OrderRequest {
  serde_json::from_value(pickup_order_json()).expect("fixture deserializes")
}

pub fn delivery_order_request() -> OrderRequest {
  serde_json::from_value(delivery_order_json()).expect("fixture deserializes")
}

// --- HTTP-layer fixtures ---

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    bot_token: "test-token".to_string(),
    telegram_api_base: "https://chat.invalid".to_string(),
    webhook_url: None,
    admin_base_url: "https://admin.invalid".to_string(),
    admin_api_key: "secret-key".to_string(),
    staff_chat_ids: vec![STAFF_A, STAFF_B],
    utc_offset: FixedOffset::east_opt(0).unwrap(),
    broadcast_delay_ms: 0,
    web_app_url: Some("https://shop.example/menu".to_string()),
  }
}

/// AppState wired to the mocks, for driving handlers through actix.
pub fn test_state_with(admin: Arc<MockAdmin>) -> (AppState, Arc<MockTransport>, Arc<MockAdmin>) {
  let h = harness_with(admin);
  let state = AppState {
    config: Arc::new(test_config()),
    bot: h.bot.clone(),
    admin: h.admin.clone(),
    flow: Arc::new(h.flow),
  };
  (state, h.bot, h.admin)
}

pub fn test_state() -> (AppState, Arc<MockTransport>, Arc<MockAdmin>) {
  test_state_with(MockAdmin::open())
}
