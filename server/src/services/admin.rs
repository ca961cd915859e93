// server/src/services/admin.rs

//! Client for the external admin/order-management service.
//!
//! That service owns every durable record this bridge touches: order
//! documents and their status, the weekly schedule, the bot-user directory,
//! and the product catalog. The bridge holds no copies and performs no
//! retries; a failed call surfaces as an upstream error and the caller
//! decides what that means for the request in flight.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::errors::{AppError, Result};
use tandir::{
  BusinessSchedule, ChatId, Coordinates, DeliveryMode, Order, OrderId, OrderItem, OrderStatus,
};

/// An order document as the store expects it at creation time; the store
/// assigns the id and echoes it back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRecord {
  pub customer: ChatId,
  pub customer_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  pub delivery_type: DeliveryMode,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub coordinates: Option<Coordinates>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delivery_distance: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delivery_price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  pub items: Vec<OrderItem>,
  pub total: f64,
  pub status: OrderStatus,
  /// The storefront's own transaction reference, kept for reconciliation.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reference: Option<String>,
}

impl NewOrderRecord {
  /// Completes the record with the store-assigned id.
  pub fn into_order(self, id: OrderId) -> Order {
    Order {
      id,
      customer: self.customer,
      customer_name: self.customer_name,
      phone: self.phone,
      delivery_type: self.delivery_type,
      location: self.location,
      coordinates: self.coordinates,
      delivery_distance: self.delivery_distance,
      delivery_price: self.delivery_price,
      comment: self.comment,
      items: self.items,
      total: self.total,
    }
  }
}

#[derive(Debug, Deserialize)]
struct CreatedOrder {
  #[serde(alias = "orderId")]
  id: OrderId,
}

/// One row of the bot-user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotUserRecord {
  pub chat_id: ChatId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub username: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
}

/// The single external admin collaborator, as the coordinator sees it.
#[async_trait]
pub trait AdminApi: Send + Sync {
  /// Persists a new pending order; returns the store-assigned id.
  async fn create_order(&self, record: &NewOrderRecord) -> Result<OrderId>;

  /// Moves an order to `status`. The store enforces its own precondition
  /// and answers non-2xx when the order already left the prior stage.
  async fn update_status(&self, order: &OrderId, status: OrderStatus) -> Result<()>;

  async fn submit_review(&self, order: &OrderId, rating: u8) -> Result<()>;

  /// Fetches the weekly schedule record. `None` when the store has none.
  async fn fetch_schedule(&self) -> Result<Option<BusinessSchedule>>;

  /// Registered chat ids for broadcast fan-out.
  async fn list_recipients(&self) -> Result<Vec<ChatId>>;

  async fn upsert_contact(&self, chat: ChatId, username: Option<&str>, phone: &str) -> Result<()>;

  /// Menu passthrough for the storefront; the body is opaque here.
  async fn list_products(&self) -> Result<serde_json::Value>;
}

pub struct AdminClient {
  client: Client,
  base_url: String,
}

impl AdminClient {
  pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
    let mut headers = HeaderMap::new();
    let key_value = HeaderValue::from_str(api_key)
      .map_err(|e| AppError::Config(format!("ADMIN_API_KEY is not a valid header value: {}", e)))?;
    headers.insert("x-api-key", key_value);

    let client = Client::builder()
      .timeout(std::time::Duration::from_secs(30))
      .default_headers(headers)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let url = format!("{}{}", self.base_url, path);
    let response = self.client.get(&url).send().await?;
    handle_response(response).await
  }

  async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
    let url = format!("{}{}", self.base_url, path);
    let response = self.client.post(&url).json(body).send().await?;
    handle_response(response).await
  }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
  let status = response.status();
  if status.is_success() {
    response.json().await.map_err(|e| AppError::Upstream {
      status: Some(status.as_u16()),
      detail: format!("unreadable response body: {}", e),
    })
  } else {
    let detail = response.text().await.unwrap_or_default();
    Err(AppError::Upstream {
      status: Some(status.as_u16()),
      detail,
    })
  }
}

#[async_trait]
impl AdminApi for AdminClient {
  #[instrument(name = "admin::create_order", skip(self, record), fields(customer = %record.customer))]
  async fn create_order(&self, record: &NewOrderRecord) -> Result<OrderId> {
    let created: CreatedOrder = self.post("/api/orders", record).await?;
    debug!(order_id = %created.id, "Order record created");
    Ok(created.id)
  }

  #[instrument(name = "admin::update_status", skip(self))]
  async fn update_status(&self, order: &OrderId, status: OrderStatus) -> Result<()> {
    let _: serde_json::Value = self
      .post(
        &format!("/api/orders/{}/status", order),
        &json!({ "status": status.as_str() }),
      )
      .await?;
    Ok(())
  }

  #[instrument(name = "admin::submit_review", skip(self))]
  async fn submit_review(&self, order: &OrderId, rating: u8) -> Result<()> {
    let _: serde_json::Value = self
      .post(&format!("/api/orders/{}/review", order), &json!({ "rating": rating }))
      .await?;
    Ok(())
  }

  async fn fetch_schedule(&self) -> Result<Option<BusinessSchedule>> {
    let url = format!("{}/api/schedule", self.base_url);
    let response = self.client.get(&url).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let schedule: BusinessSchedule = handle_response(response).await?;
    Ok(Some(schedule))
  }

  async fn list_recipients(&self) -> Result<Vec<ChatId>> {
    let records: Vec<BotUserRecord> = self.get("/api/bot-users").await?;
    Ok(records.into_iter().map(|r| r.chat_id).collect())
  }

  #[instrument(name = "admin::upsert_contact", skip(self, phone))]
  async fn upsert_contact(&self, chat: ChatId, username: Option<&str>, phone: &str) -> Result<()> {
    let record = BotUserRecord {
      chat_id: chat,
      username: username.map(String::from),
      phone: Some(phone.to_string()),
    };
    let _: serde_json::Value = self.post("/api/bot-users", &record).await?;
    Ok(())
  }

  async fn list_products(&self) -> Result<serde_json::Value> {
    self.get("/api/products").await
  }
}
