use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::config::BridgeConfig;
use crate::message::{DocumentSource, OutboundMessage};
use crate::provider::{DeliveryReceipt, MediaUpload, ProviderClient, ProviderError};

pub const CATALOG_CAPTION: &str = "Aqui está o nosso catálogo!";
pub const CATALOG_LINK_FILENAME: &str = "Catalogo.pdf";
pub const CATALOG_UPLOAD_FILENAME: &str = "catalogo.pdf";
pub const PDF_MIME: &str = "application/pdf";
pub const CATALOG_ROUTE: &str = "/catalog";

#[derive(thiserror::Error, Debug)]
pub enum SendError {
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),
    #[error("catalog file not found at {}; upload one through /send-initial-message first", .0.display())]
    CatalogNotFound(PathBuf),
    #[error("catalog file unreadable: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Delivers the current catalog PDF to one contact.
#[derive(Clone)]
pub struct CatalogSender {
    config: Arc<BridgeConfig>,
    provider: ProviderClient,
    catalog: CatalogStore,
}

impl CatalogSender {
    pub fn new(config: Arc<BridgeConfig>, provider: ProviderClient, catalog: CatalogStore) -> Self {
        Self {
            config,
            provider,
            catalog,
        }
    }

    /// Public URL the provider can fetch the catalog from, when one is configured.
    pub fn catalog_link(&self) -> Option<String> {
        self.config
            .public_base_url
            .as_deref()
            .map(|base| format!("{}{CATALOG_ROUTE}", base.trim_end_matches('/')))
    }

    /// One provider call when a public link is available, otherwise upload then send.
    pub async fn send(&self, recipient: &str) -> Result<DeliveryReceipt, SendError> {
        let missing = self.config.missing_credentials();
        if !missing.is_empty() {
            return Err(SendError::MissingCredentials(missing));
        }
        if !self.catalog.exists().await? {
            return Err(self.not_found());
        }

        if let Some(link) = self.catalog_link() {
            let message = OutboundMessage::Document {
                source: DocumentSource::Link(link),
                caption: Some(CATALOG_CAPTION.to_string()),
                filename: Some(CATALOG_LINK_FILENAME.to_string()),
            };
            return Ok(self.provider.send(recipient, &message).await?);
        }

        // The file may vanish between the existence check and the read.
        let bytes = self.catalog.read().await?.ok_or_else(|| self.not_found())?;
        let handle = self
            .provider
            .upload_media(MediaUpload {
                bytes,
                filename: CATALOG_UPLOAD_FILENAME.to_string(),
                mime_type: PDF_MIME.to_string(),
            })
            .await?;
        let receipt = self
            .provider
            .send_document(
                recipient,
                DocumentSource::Handle(handle),
                Some(CATALOG_CAPTION.to_string()),
            )
            .await?;
        Ok(receipt)
    }

    fn not_found(&self) -> SendError {
        SendError::CatalogNotFound(self.catalog.path().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_mock::{HttpMode, queue_mock_response, recorded_calls};

    struct Fixture {
        _dir: tempfile::TempDir,
        sender: CatalogSender,
        provider: ProviderClient,
        catalog: CatalogStore,
    }

    fn fixture(base_url: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BridgeConfig {
            whatsapp_token: "token".into(),
            phone_number_id: "1000".into(),
            public_base_url: base_url.map(ToOwned::to_owned),
            catalog_path: dir.path().join("current.pdf"),
            http_mode: HttpMode::Mock,
            ..BridgeConfig::default()
        };
        let provider = ProviderClient::new(&config).expect("client");
        let catalog = CatalogStore::new(config.catalog_path.clone());
        let sender = CatalogSender::new(Arc::new(config), provider.clone(), catalog.clone());
        Fixture {
            _dir: dir,
            sender,
            provider,
            catalog,
        }
    }

    #[tokio::test]
    async fn public_base_url_sends_one_link_document() {
        let fx = fixture(Some("https://bridge.test/"));
        fx.catalog.replace(b"%PDF".to_vec()).await.expect("write");

        let receipt = fx.sender.send("5511999990000").await.expect("send");
        assert_eq!(receipt.message_id.as_deref(), Some("wamid.mock"));

        let calls = recorded_calls(fx.provider.history());
        assert_eq!(calls.len(), 1);
        let body = &calls[0].request.body;
        assert_eq!(calls[0].request.url, fx.provider.messages_url());
        assert_eq!(body["to"], "5511999990000");
        assert_eq!(body["document"]["link"], "https://bridge.test/catalog");
        assert_eq!(body["document"]["filename"], CATALOG_LINK_FILENAME);
        assert_eq!(body["document"]["caption"], CATALOG_CAPTION);
        assert!(body["document"].get("id").is_none());
    }

    #[tokio::test]
    async fn without_base_url_uploads_then_sends_by_handle() {
        let fx = fixture(None);
        fx.catalog.replace(b"%PDF-1.7".to_vec()).await.expect("write");
        queue_mock_response(fx.provider.responses(), 200, br#"{"id":"media-9"}"#.to_vec());

        fx.sender.send("5511").await.expect("send");

        let calls = recorded_calls(fx.provider.history());
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].request.url, fx.provider.media_url());
        assert_eq!(calls[0].request.body["file"]["filename"], CATALOG_UPLOAD_FILENAME);
        assert_eq!(calls[1].request.body["document"]["id"], "media-9");
        assert!(calls[1].request.body["document"].get("link").is_none());
    }

    #[tokio::test]
    async fn missing_catalog_makes_no_calls() {
        for base_url in [None, Some("https://bridge.test")] {
            let fx = fixture(base_url);
            let err = fx.sender.send("55").await.expect_err("not found");
            assert!(matches!(err, SendError::CatalogNotFound(_)));
            assert!(err.to_string().contains("current.pdf"));
            assert!(recorded_calls(fx.provider.history()).is_empty());
        }
    }

    #[tokio::test]
    async fn failed_upload_skips_the_send() {
        let fx = fixture(None);
        fx.catalog.replace(b"%PDF".to_vec()).await.expect("write");
        queue_mock_response(
            fx.provider.responses(),
            400,
            br#"{"error":{"message":"bad file"}}"#.to_vec(),
        );

        let err = fx.sender.send("55").await.expect_err("upload fails");
        assert!(matches!(
            err,
            SendError::Provider(ProviderError::Upstream { status: 400, .. })
        ));
        assert_eq!(recorded_calls(fx.provider.history()).len(), 1);
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BridgeConfig {
            catalog_path: dir.path().join("current.pdf"),
            http_mode: HttpMode::Mock,
            ..BridgeConfig::default()
        };
        let provider = ProviderClient::new(&config).expect("client");
        let catalog = CatalogStore::new(config.catalog_path.clone());
        let sender = CatalogSender::new(Arc::new(config), provider.clone(), catalog);
        let err = sender.send("55").await.expect_err("credentials");
        assert!(matches!(err, SendError::MissingCredentials(ref keys) if keys.len() == 2));
        assert!(recorded_calls(provider.history()).is_empty());
    }
}
