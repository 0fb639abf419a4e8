use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use super::error::ApiError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
            || self
                .filename
                .as_deref()
                .is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"))
    }
}

/// Fields of a management request, read from either a JSON object or a multipart form.
#[derive(Debug, Default)]
pub struct FormInput {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl FormInput {
    pub fn from_json(value: &Value) -> Self {
        let fields = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(key, value)| {
                        let text = match value {
                            Value::String(s) => s.clone(),
                            Value::Number(n) => n.to_string(),
                            Value::Bool(b) => b.to_string(),
                            _ => return None,
                        };
                        Some((key.clone(), text))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            fields,
            files: Vec::new(),
        }
    }

    /// Trimmed value of a text field, if it was sent at all.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|value| value.trim())
    }

    /// Takes the PDF attached under `field`. Non-PDF attachments count as absent.
    pub fn take_pdf(&mut self, field: &str) -> Option<UploadedFile> {
        let index = self
            .files
            .iter()
            .position(|file| file.field == field && file.is_pdf())?;
        Some(self.files.remove(index))
    }
}

impl<S> FromRequest<S> for FormInput
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            let mut input = FormInput::default();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(IntoResponse::into_response)?
            {
                let name = field.name().unwrap_or_default().to_string();
                match field.file_name().map(ToOwned::to_owned) {
                    Some(filename) => {
                        let content_type = field.content_type().map(ToOwned::to_owned);
                        let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
                        input.files.push(UploadedFile {
                            field: name,
                            filename: Some(filename),
                            content_type,
                            bytes,
                        });
                    }
                    None => {
                        let text = field.text().await.map_err(IntoResponse::into_response)?;
                        input.fields.insert(name, text);
                    }
                }
            }
            return Ok(input);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if bytes.is_empty() {
            return Ok(FormInput::default());
        }
        let value: Value = serde_json::from_slice(&bytes).map_err(|err| {
            ApiError::Validation(format!("invalid JSON body: {err}")).into_response()
        })?;
        Ok(FormInput::from_json(&value))
    }
}
