mod error;
mod form;
pub mod outbound;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::catalog::CatalogStore;
use crate::config::BridgeConfig;
use crate::dispatch::TaskQueue;
use crate::provider::ProviderClient;

pub use error::ApiError;
pub use form::{FormInput, UploadedFile};

/// Largest accepted request body, uploads included.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub provider: ProviderClient,
    pub catalog: CatalogStore,
    pub tasks: TaskQueue,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(webhook::verify).post(webhook::receive))
        .route("/webhook", get(webhook::verify).post(webhook::receive))
        .route("/catalog", get(outbound::catalog_pdf))
        .route("/send-initial-message", post(outbound::send_initial_message))
        .route("/send-message", post(outbound::send_message))
        .route("/send-bulk", post(outbound::send_bulk))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
