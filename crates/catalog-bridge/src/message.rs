//! Outbound messages and their WhatsApp Cloud API payloads.

use serde_json::{Map, Value, json};

pub const MESSAGING_PRODUCT: &str = "whatsapp";

/// Where the provider should fetch a document from. A document carries exactly one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Handle(String),
    Link(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text {
        body: String,
    },
    Document {
        source: DocumentSource,
        caption: Option<String>,
        filename: Option<String>,
    },
    InteractiveButtons {
        body: String,
        header: Option<String>,
        footer: Option<String>,
        buttons: Vec<ReplyButton>,
    },
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        OutboundMessage::Text { body: body.into() }
    }

    pub fn document(source: DocumentSource, caption: Option<String>) -> Self {
        OutboundMessage::Document {
            source,
            caption,
            filename: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text { .. } => "text",
            OutboundMessage::Document { .. } => "document",
            OutboundMessage::InteractiveButtons { .. } => "interactive",
        }
    }

    pub fn to_payload(&self, to: &str) -> Value {
        let mut payload = json!({
            "messaging_product": MESSAGING_PRODUCT,
            "to": to,
            "type": self.kind(),
        });
        let body = match self {
            OutboundMessage::Text { body } => json!({ "body": body }),
            OutboundMessage::Document {
                source,
                caption,
                filename,
            } => {
                let mut document = Map::new();
                match source {
                    DocumentSource::Handle(id) => {
                        document.insert("id".into(), Value::String(id.clone()));
                    }
                    DocumentSource::Link(url) => {
                        document.insert("link".into(), Value::String(url.clone()));
                    }
                }
                if let Some(filename) = non_blank(filename) {
                    document.insert("filename".into(), Value::String(filename.to_string()));
                }
                if let Some(caption) = non_blank(caption) {
                    document.insert("caption".into(), Value::String(caption.to_string()));
                }
                Value::Object(document)
            }
            OutboundMessage::InteractiveButtons {
                body,
                header,
                footer,
                buttons,
            } => {
                let buttons: Vec<Value> = buttons
                    .iter()
                    .map(|button| {
                        json!({
                            "type": "reply",
                            "reply": { "id": button.id, "title": button.title },
                        })
                    })
                    .collect();
                let mut interactive = json!({
                    "type": "button",
                    "body": { "text": body },
                    "action": { "buttons": buttons },
                });
                if let Some(obj) = interactive.as_object_mut() {
                    if let Some(header) = non_blank(header) {
                        obj.insert("header".into(), json!({ "type": "text", "text": header }));
                    }
                    if let Some(footer) = non_blank(footer) {
                        obj.insert("footer".into(), json!({ "text": footer }));
                    }
                }
                interactive
            }
        };
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(self.kind().to_string(), body);
        }
        payload
    }
}

/// Blank values are omitted; anything else is sent as given.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Keeps only the digits of a phone number as typed by an operator.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
