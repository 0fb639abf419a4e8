use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::AppState;
use crate::dispatch::CatalogTask;
use crate::events::{catalog_requests, extract_events};

pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Returns the challenge to echo when the handshake is accepted.
pub fn verify_subscription<'a>(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&'a str>,
    expected_token: &str,
) -> Option<&'a str> {
    let token = token.filter(|token| !token.is_empty())?;
    if mode == Some(SUBSCRIBE_MODE) && token == expected_token {
        Some(challenge.unwrap_or_default())
    } else {
        None
    }
}

pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let accepted = verify_subscription(
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
        &state.config.verify_token,
    );
    match accepted {
        Some(challenge) => {
            info!("webhook verification accepted");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        None => {
            warn!("webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Always acknowledges; catalog sends run on the dispatcher afterwards.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let events = extract_events(&payload);
    debug!(events = events.len(), "webhook received");
    for recipient in catalog_requests(&events) {
        info!(%recipient, "catalog button clicked");
        state.tasks.submit(CatalogTask { recipient });
    }
    StatusCode::OK
}
