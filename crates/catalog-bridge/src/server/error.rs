use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::provider::ProviderError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("provider returned status {status}")]
    Upstream { status: u16, body: Value },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn missing_credentials(missing: &[&str]) -> Self {
        ApiError::Configuration(format!(
            "incomplete configuration: set {} in config.ini or the environment",
            missing.join(" and ")
        ))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Upstream { status, body } => ApiError::Upstream { status, body },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::NotFound(message) => (status, message).into_response(),
            // Provider error bodies pass through untouched.
            ApiError::Upstream { body, .. } => {
                let body = match body {
                    Value::Object(_) => body,
                    Value::Null => json!({ "error": format!("provider returned status {}", status.as_u16()) }),
                    other => json!({ "error": other }),
                };
                (status, Json(body)).into_response()
            }
            ApiError::Validation(message)
            | ApiError::Configuration(message)
            | ApiError::Internal(message) => {
                (status, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}
