// server/src/state.rs
use crate::config::AppConfig;
use crate::flow::OrderFlow;
use crate::services::admin::AdminApi;
use crate::services::telegram::ChatTransport;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub bot: Arc<dyn ChatTransport>,
  pub admin: Arc<dyn AdminApi>,
  pub flow: Arc<OrderFlow>,
}
