use axum::Json;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::AppState;
use super::error::ApiError;
use super::form::{FormInput, UploadedFile};
use crate::bulk::{self, BulkReport, parse_contacts};
use crate::config::BridgeConfig;
use crate::events::CATALOG_BUTTON_ID;
use crate::message::{DocumentSource, OutboundMessage, ReplyButton, normalize_phone};
use crate::provider::{MediaUpload, ProviderError};
use crate::sender::{CATALOG_UPLOAD_FILENAME, PDF_MIME};

pub const INITIAL_BODY: &str = "Gostaria de conferir nossas ofertas exclusivas? Clique no botão abaixo para receber o catálogo em PDF.";
pub const INITIAL_FOOTER: &str = "Clique no botão abaixo para baixar.";
pub const CATALOG_BUTTON_TITLE: &str = "Ver Catálogo PDF";
const DEFAULT_DOCUMENT_NAME: &str = "document.pdf";

fn require_credentials(config: &BridgeConfig) -> Result<(), ApiError> {
    let missing = config.missing_credentials();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::missing_credentials(&missing))
    }
}

fn require_recipient(input: &FormInput) -> Result<String, ApiError> {
    let phone = input.text("to").map(normalize_phone).unwrap_or_default();
    if phone.is_empty() {
        return Err(ApiError::Validation(
            "send \"to\" with the recipient's phone number".into(),
        ));
    }
    Ok(phone)
}

fn document_upload(file: UploadedFile) -> MediaUpload {
    MediaUpload {
        bytes: file.bytes.to_vec(),
        filename: file
            .filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string()),
        mime_type: PDF_MIME.to_string(),
    }
}

/// Stores the attached catalog and sends the interactive message whose button asks for it.
pub async fn send_initial_message(
    State(state): State<AppState>,
    mut input: FormInput,
) -> Result<Json<Value>, ApiError> {
    require_credentials(&state.config)?;
    let to = require_recipient(&input)?;
    let catalog = input.take_pdf("catalog").ok_or_else(|| {
        ApiError::Validation(
            "attach the catalog PDF in the \"catalog\" field; it is stored and sent when the contact taps the button"
                .into(),
        )
    })?;

    let body = input
        .text("message")
        .filter(|text| !text.is_empty())
        .unwrap_or(INITIAL_BODY)
        .to_string();
    let header = input.text("header").map(ToOwned::to_owned);
    let footer = Some(input.text("footer").unwrap_or(INITIAL_FOOTER).to_string());

    state
        .catalog
        .replace(catalog.bytes.to_vec())
        .await
        .map_err(|err| ApiError::Internal(format!("failed to store catalog: {err}")))?;
    info!(
        path = %state.catalog.path().display(),
        bytes = catalog.bytes.len(),
        "catalog replaced"
    );

    let message = OutboundMessage::InteractiveButtons {
        body,
        header,
        footer,
        buttons: vec![ReplyButton {
            id: CATALOG_BUTTON_ID.to_string(),
            title: CATALOG_BUTTON_TITLE.to_string(),
        }],
    };
    let receipt = state.provider.send(&to, &message).await?;
    Ok(Json(receipt.response))
}

/// Sends either one PDF (upload, then by handle) or one text message.
pub async fn send_message(
    State(state): State<AppState>,
    mut input: FormInput,
) -> Result<Json<Value>, ApiError> {
    require_credentials(&state.config)?;
    let to = require_recipient(&input)?;
    let message = input.text("message").unwrap_or_default().to_string();

    if let Some(document) = input.take_pdf("document") {
        let handle = state.provider.upload_media(document_upload(document)).await?;
        let caption = Some(message).filter(|text| !text.is_empty());
        let receipt = state
            .provider
            .send_document(&to, DocumentSource::Handle(handle), caption)
            .await?;
        return Ok(Json(receipt.response));
    }

    if message.is_empty() {
        return Err(ApiError::Validation(
            "send \"message\" text or attach a PDF document".into(),
        ));
    }
    let receipt = state.provider.send_text(&to, &message).await?;
    Ok(Json(receipt.response))
}

/// Broadcasts to every parsed contact, uploading an attached PDF only once.
pub async fn send_bulk(
    State(state): State<AppState>,
    mut input: FormInput,
) -> Result<Json<BulkReport>, ApiError> {
    require_credentials(&state.config)?;
    let contacts_text = input.text("contacts").unwrap_or_default().to_string();
    if contacts_text.is_empty() {
        return Err(ApiError::Validation(
            "send \"contacts\" with one name;phone per line".into(),
        ));
    }
    let message = input.text("message").unwrap_or_default().to_string();
    let document = input.take_pdf("document");
    if document.is_none() && message.is_empty() {
        return Err(ApiError::Validation(
            "send \"message\" text or attach a PDF document".into(),
        ));
    }
    let contacts = parse_contacts(&contacts_text);
    if contacts.is_empty() {
        return Err(ApiError::Validation(
            "no valid contacts (expected name;phone per line)".into(),
        ));
    }

    let handle = match document {
        Some(document) => Some(
            state
                .provider
                .upload_media(document_upload(document))
                .await
                .map_err(bulk_upload_error)?,
        ),
        None => None,
    };

    let report = bulk::send_bulk(&state.provider, &contacts, &message, handle.as_deref()).await;
    Ok(Json(report))
}

fn bulk_upload_error(err: ProviderError) -> ApiError {
    warn!(error = %err, "bulk document upload failed");
    let status = match &err {
        ProviderError::Upstream { status, .. } => *status,
        _ => 500,
    };
    ApiError::Upstream {
        status,
        body: json!({
            "error": format!("failed to upload document to provider: {}", err.summary())
        }),
    }
}

/// Public copy of the current catalog, fetched by the provider for link sends.
pub async fn catalog_pdf(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.catalog.read().await {
        Ok(Some(bytes)) => Ok((
            [
                (CONTENT_TYPE, PDF_MIME.to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("inline; filename=\"{CATALOG_UPLOAD_FILENAME}\""),
                ),
            ],
            bytes,
        )
            .into_response()),
        Ok(None) => Err(ApiError::NotFound("catalog not available".into())),
        Err(err) => Err(ApiError::Internal(format!("failed to read catalog: {err}"))),
    }
}
