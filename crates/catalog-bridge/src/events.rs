//! Tolerant extraction of user events from WhatsApp Cloud API webhook envelopes.
//!
//! Every level of the envelope is optional: a missing or mistyped field simply
//! yields no events for that branch, never an error.

use serde_json::Value;

pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";
pub const MESSAGES_FIELD: &str = "messages";
pub const CATALOG_BUTTON_ID: &str = "btn_catalogo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A contact tapped a reply button of an interactive message.
    ButtonReply { from: String, button_id: String },
}

/// Walks `object -> entry[] -> changes[] -> value.messages[]`.
pub fn extract_events(body: &Value) -> Vec<InboundEvent> {
    if body.get("object").and_then(Value::as_str) != Some(WHATSAPP_OBJECT) {
        return Vec::new();
    }
    let Some(entries) = body.get("entry").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| entry.get("changes").and_then(Value::as_array))
        .flatten()
        .filter(|change| change.get("field").and_then(Value::as_str) == Some(MESSAGES_FIELD))
        .filter_map(|change| {
            change
                .get("value")
                .and_then(|value| value.get("messages"))
                .and_then(Value::as_array)
        })
        .flatten()
        .filter_map(parse_message)
        .collect()
}

/// Only interactive button replies become events; text, media and other replies are skipped.
fn parse_message(message: &Value) -> Option<InboundEvent> {
    let from = message.get("from").and_then(Value::as_str)?.to_string();
    if message.get("type").and_then(Value::as_str) != Some("interactive") {
        return None;
    }
    let interactive = message.get("interactive")?;
    if interactive.get("type").and_then(Value::as_str) != Some("button_reply") {
        return None;
    }
    let button_id = interactive
        .get("button_reply")
        .and_then(|reply| reply.get("id"))
        .and_then(Value::as_str)?
        .to_string();
    Some(InboundEvent::ButtonReply { from, button_id })
}

/// Contacts that asked for the catalog, in envelope order. Duplicates are kept.
pub fn catalog_requests(events: &[InboundEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            InboundEvent::ButtonReply { from, button_id } if button_id == CATALOG_BUTTON_ID => {
                Some(from.clone())
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(messages: Value) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"phone_number_id": "1000"},
                        "messages": messages
                    }
                }]
            }]
        })
    }

    fn button(from: &str, id: &str) -> Value {
        json!({
            "from": from,
            "id": "wamid.1",
            "type": "interactive",
            "interactive": {
                "type": "button_reply",
                "button_reply": {"id": id, "title": "Ver Catálogo PDF"}
            }
        })
    }

    #[test]
    fn single_catalog_click_yields_one_request() {
        let body = envelope(json!([button("5511999990000", CATALOG_BUTTON_ID)]));
        let events = extract_events(&body);
        assert_eq!(
            events,
            vec![InboundEvent::ButtonReply {
                from: "5511999990000".into(),
                button_id: CATALOG_BUTTON_ID.into()
            }]
        );
        assert_eq!(catalog_requests(&events), vec!["5511999990000".to_string()]);
    }

    #[test]
    fn other_button_ids_are_not_catalog_requests() {
        let body = envelope(json!([button("55", "btn_other")]));
        let events = extract_events(&body);
        assert_eq!(events.len(), 1);
        assert!(catalog_requests(&events).is_empty());
    }

    #[test]
    fn malformed_shapes_yield_nothing() {
        let cases = vec![
            json!(null),
            json!([]),
            json!("text"),
            json!({}),
            json!({"entry": []}),
            json!({"object": "page", "entry": [{"changes": []}]}),
            json!({"object": "whatsapp_business_account"}),
            json!({"object": "whatsapp_business_account", "entry": {}}),
            json!({"object": "whatsapp_business_account", "entry": [1, "x", null]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": "nope"}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"field": "messages"}]}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"field": "messages", "value": {"messages": {}}}]}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"field": "messages", "value": {"messages": [42, {"type": "interactive"}]}}]}]}),
            json!({"object": 7, "entry": [{"changes": []}]}),
        ];
        for body in cases {
            assert!(extract_events(&body).is_empty(), "expected no events for {body}");
        }
    }

    #[test]
    fn ignores_changes_for_other_fields() {
        let mut body = envelope(json!([button("55", CATALOG_BUTTON_ID)]));
        body["entry"][0]["changes"][0]["field"] = json!("statuses");
        assert!(extract_events(&body).is_empty());
    }

    #[test]
    fn text_messages_yield_no_events() {
        let message = json!({"from": "55", "type": "text", "text": {"body": "catalogo"}});
        assert!(extract_events(&envelope(json!([message]))).is_empty());
    }

    #[test]
    fn list_reply_is_not_a_button_reply() {
        let message = json!({
            "from": "55",
            "type": "interactive",
            "interactive": {"type": "list_reply", "list_reply": {"id": CATALOG_BUTTON_ID}}
        });
        assert!(extract_events(&envelope(json!([message]))).is_empty());
    }

    #[test]
    fn walks_every_entry_change_and_message() {
        let body = json!({
            "object": "whatsapp_business_account",
            "entry": [
                {"changes": [
                    {"field": "messages", "value": {"messages": [
                        button("1", CATALOG_BUTTON_ID),
                        {"from": "2", "type": "text", "text": {"body": "oi"}}
                    ]}},
                    {"field": "messages", "value": {"messages": [button("3", CATALOG_BUTTON_ID)]}}
                ]},
                {"changes": [
                    {"field": "messages", "value": {"messages": [button("1", CATALOG_BUTTON_ID)]}}
                ]}
            ]
        });
        let events = extract_events(&body);
        assert_eq!(events.len(), 3, "text messages are not events");
        assert_eq!(
            catalog_requests(&events),
            vec!["1".to_string(), "3".to_string(), "1".to_string()]
        );
    }
}
