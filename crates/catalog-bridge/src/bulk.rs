use serde::Serialize;
use tracing::{info, warn};

use crate::message::{DocumentSource, normalize_phone};
use crate::provider::ProviderClient;

/// Replaced with each contact's name in the broadcast text or caption.
pub const NAME_PLACEHOLDER: &str = "$nome";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub phone: String,
}

/// Parses `name;phone` lines. A line without `;` is all phone. Lines whose phone has no
/// digits are dropped.
pub fn parse_contacts(text: &str) -> Vec<Contact> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (name, phone_raw) = match line.split_once(';') {
                Some((name, phone)) => (name.trim(), phone.trim()),
                None => ("", line),
            };
            let phone = normalize_phone(phone_raw);
            if phone.is_empty() {
                return None;
            }
            Some(Contact {
                name: name.to_string(),
                phone,
            })
        })
        .collect()
}

pub fn personalize(template: &str, name: &str) -> String {
    template.trim().replace(NAME_PLACEHOLDER, name)
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub phone: String,
    pub name: String,
    pub success: bool,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<BulkResult>,
}

impl BulkReport {
    fn from_results(results: Vec<BulkResult>) -> Self {
        let success = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            success,
            failed: results.len() - success,
            results,
        }
    }
}

/// Sends sequentially, one provider call per contact. A failure only marks its own
/// contact; the rest of the list is still attempted. `media_handle` switches every
/// message to a document that reuses the same upload.
pub async fn send_bulk(
    provider: &ProviderClient,
    contacts: &[Contact],
    template: &str,
    media_handle: Option<&str>,
) -> BulkReport {
    let mut results = Vec::with_capacity(contacts.len());
    for contact in contacts {
        let text = personalize(template, &contact.name);
        let outcome = match media_handle {
            Some(handle) => {
                let caption = Some(text).filter(|t| !t.is_empty());
                provider
                    .send_document(
                        &contact.phone,
                        DocumentSource::Handle(handle.to_string()),
                        caption,
                    )
                    .await
            }
            None => provider.send_text(&contact.phone, &text).await,
        };
        let result = match outcome {
            Ok(receipt) => BulkResult {
                phone: contact.phone.clone(),
                name: contact.name.clone(),
                success: true,
                message_id: receipt.message_id,
                error: None,
            },
            Err(err) => {
                warn!(phone = %contact.phone, error = %err, "bulk send failed for contact");
                BulkResult {
                    phone: contact.phone.clone(),
                    name: contact.name.clone(),
                    success: false,
                    message_id: None,
                    error: Some(err.summary()),
                }
            }
        };
        results.push(result);
    }
    let report = BulkReport::from_results(results);
    info!(
        total = report.total,
        success = report.success,
        failed = report.failed,
        "bulk send finished"
    );
    report
}
