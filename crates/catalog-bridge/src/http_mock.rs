use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;

pub type HttpHistory = Arc<Mutex<Vec<HttpCall>>>;
pub type HttpResponseQueue = Arc<Mutex<VecDeque<MockResponse>>>;

/// Whether outbound provider calls hit the network or are only recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMode {
    #[default]
    Real,
    Mock,
}

impl HttpMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "real" => Some(HttpMode::Real),
            "mock" => Some(HttpMode::Mock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMode::Real => "real",
            HttpMode::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpCall {
    pub request: HttpRequest,
    pub response: HttpResponseRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<Header>,
    pub body: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpResponseRecord {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

pub fn new_history() -> HttpHistory {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn new_response_queue() -> HttpResponseQueue {
    Arc::new(Mutex::new(VecDeque::new()))
}

pub fn queue_mock_response(queue: &HttpResponseQueue, status: u16, body: Vec<u8>) {
    if let Ok(mut pending) = queue.lock() {
        pending.push_back(MockResponse { status, body });
    }
}

/// Pops the next queued response, or answers 200 with `fallback`.
pub(crate) fn next_mock_response(queue: &HttpResponseQueue, fallback: &[u8]) -> MockResponse {
    queue
        .lock()
        .ok()
        .and_then(|mut pending| pending.pop_front())
        .unwrap_or_else(|| MockResponse {
            status: 200,
            body: fallback.to_vec(),
        })
}

pub(crate) fn record(history: &HttpHistory, call: HttpCall) {
    if let Ok(mut calls) = history.lock() {
        calls.push(call);
    }
}

pub fn recorded_calls(history: &HttpHistory) -> Vec<HttpCall> {
    history
        .lock()
        .map(|guard| guard.clone())
        .unwrap_or_default()
}

/// Decodes a response body for inspection: JSON when it parses, text otherwise.
pub fn body_to_value(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
