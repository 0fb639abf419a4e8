use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::http_mock::{
    Header, HttpCall, HttpHistory, HttpMode, HttpRequest, HttpResponseQueue, HttpResponseRecord,
    body_to_value, new_history, new_response_queue, next_mock_response, record,
};
use crate::message::{DocumentSource, MESSAGING_PRODUCT, OutboundMessage};

const MOCK_UPLOAD_BODY: &[u8] = br#"{"id":"mock-media-id"}"#;
const MOCK_MESSAGE_BODY: &[u8] =
    br#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.mock"}]}"#;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("provider returned status {status}")]
    Upstream { status: u16, body: Value },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Human readable reason, preferring the provider's own error message.
    pub fn summary(&self) -> String {
        if let ProviderError::Upstream { body, .. } = self {
            let error = body.get("error");
            if let Some(message) = error
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .or_else(|| {
                    error
                        .and_then(|e| e.get("error_user_msg"))
                        .and_then(Value::as_str)
                })
            {
                return message.to_string();
            }
        }
        self.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
    pub response: Value,
}

impl DeliveryReceipt {
    fn from_response(response: Value) -> Self {
        let message_id = response
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|messages| messages.first())
            .and_then(|message| message.get("id"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        Self {
            message_id,
            response,
        }
    }
}

enum RequestBody {
    Json(Value),
    Multipart {
        fields: Vec<(&'static str, String)>,
        file: MediaUpload,
    },
}

/// Stateless wrapper over the provider's media and messages endpoints. No retries.
#[derive(Clone)]
pub struct ProviderClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    messages_url: String,
    media_url: String,
    token: String,
    mode: HttpMode,
    history: HttpHistory,
    responses: HttpResponseQueue,
}

impl ProviderClient {
    pub fn new(config: &BridgeConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let base = format!(
            "{}/{}/{}",
            config.graph_api_base, config.api_version, config.phone_number_id
        );
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                messages_url: format!("{base}/messages"),
                media_url: format!("{base}/media"),
                token: config.whatsapp_token.clone(),
                mode: config.http_mode,
                history: new_history(),
                responses: new_response_queue(),
            }),
        })
    }

    pub fn mode(&self) -> HttpMode {
        self.inner.mode
    }

    /// Calls recorded in mock mode.
    pub fn history(&self) -> &HttpHistory {
        &self.inner.history
    }

    /// Responses served, in order, to calls made in mock mode.
    pub fn responses(&self) -> &HttpResponseQueue {
        &self.inner.responses
    }

    pub fn messages_url(&self) -> &str {
        &self.inner.messages_url
    }

    pub fn media_url(&self) -> &str {
        &self.inner.media_url
    }

    /// Uploads binary content and returns the provider's media handle.
    pub async fn upload_media(&self, upload: MediaUpload) -> Result<String, ProviderError> {
        let fields = vec![
            ("messaging_product", MESSAGING_PRODUCT.to_string()),
            ("type", upload.mime_type.clone()),
        ];
        let url = self.inner.media_url.clone();
        let response = self
            .execute(
                &url,
                RequestBody::Multipart {
                    fields,
                    file: upload,
                },
                MOCK_UPLOAD_BODY,
            )
            .await?;
        response
            .get("id")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| ProviderError::InvalidResponse("media upload returned no id".into()))
    }

    pub async fn send(
        &self,
        to: &str,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, ProviderError> {
        let payload = message.to_payload(to);
        debug!(to, kind = message.kind(), "sending message to provider");
        let url = self.inner.messages_url.clone();
        let response = self
            .execute(&url, RequestBody::Json(payload), MOCK_MESSAGE_BODY)
            .await?;
        Ok(DeliveryReceipt::from_response(response))
    }

    pub async fn send_document(
        &self,
        to: &str,
        source: DocumentSource,
        caption: Option<String>,
    ) -> Result<DeliveryReceipt, ProviderError> {
        self.send(to, &OutboundMessage::document(source, caption))
            .await
    }

    pub async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReceipt, ProviderError> {
        self.send(to, &OutboundMessage::text(text)).await
    }

    async fn execute(
        &self,
        url: &str,
        body: RequestBody,
        mock_body: &[u8],
    ) -> Result<Value, ProviderError> {
        let (status, bytes) = match self.inner.mode {
            HttpMode::Real => self.send_real(url, body).await?,
            HttpMode::Mock => self.send_mock(url, body, mock_body),
        };
        let value = body_to_value(&bytes);
        if !(200..300).contains(&status) {
            return Err(ProviderError::Upstream {
                status,
                body: value,
            });
        }
        Ok(value)
    }

    async fn send_real(
        &self,
        url: &str,
        body: RequestBody,
    ) -> Result<(u16, Vec<u8>), ProviderError> {
        let request = self.inner.http.post(url).bearer_auth(&self.inner.token);
        let request = match body {
            RequestBody::Json(payload) => request.json(&payload),
            RequestBody::Multipart { fields, file } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                let part = Part::bytes(file.bytes)
                    .file_name(file.filename)
                    .mime_str(&file.mime_type)
                    .map_err(|err| ProviderError::Transport(err.to_string()))?;
                request.multipart(form.part("file", part))
            }
        };
        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok((status, bytes.to_vec()))
    }

    fn send_mock(&self, url: &str, body: RequestBody, mock_body: &[u8]) -> (u16, Vec<u8>) {
        let (content_type, recorded_body) = match body {
            RequestBody::Json(payload) => ("application/json", payload),
            RequestBody::Multipart { fields, file } => {
                let fields: serde_json::Map<String, Value> = fields
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), Value::String(value)))
                    .collect();
                (
                    "multipart/form-data",
                    json!({
                        "fields": fields,
                        "file": {
                            "name": "file",
                            "filename": file.filename,
                            "mime_type": file.mime_type,
                            "size": file.bytes.len(),
                            "content_b64": STANDARD.encode(&file.bytes),
                        }
                    }),
                )
            }
        };
        let response = next_mock_response(&self.inner.responses, mock_body);
        record(
            &self.inner.history,
            HttpCall {
                request: HttpRequest {
                    method: "POST".to_string(),
                    url: url.to_string(),
                    headers: vec![
                        Header::new(
                            AUTHORIZATION.as_str(),
                            format!("Bearer {}", self.inner.token),
                        ),
                        Header::new(CONTENT_TYPE.as_str(), content_type),
                    ],
                    body: recorded_body,
                },
                response: HttpResponseRecord {
                    status: response.status,
                    body: body_to_value(&response.body),
                },
            },
        );
        (response.status, response.body)
    }
}
