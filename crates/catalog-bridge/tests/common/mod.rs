#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use catalog_bridge::dispatch::CatalogTask;
use catalog_bridge::http_mock::HttpMode;
use catalog_bridge::{AppState, BridgeConfig, CatalogStore, ProviderClient, TaskQueue, router};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub const BOUNDARY: &str = "catalog-bridge-test-boundary";

pub struct Harness {
    pub app: Router,
    pub provider: ProviderClient,
    pub catalog: CatalogStore,
    pub tasks: UnboundedReceiver<CatalogTask>,
    pub dir: TempDir,
}

pub fn mock_config(dir: &TempDir) -> BridgeConfig {
    BridgeConfig {
        whatsapp_token: "test-token".into(),
        phone_number_id: "1000".into(),
        verify_token: "hub-secret".into(),
        catalog_path: dir.path().join("catalogs/current.pdf"),
        http_mode: HttpMode::Mock,
        ..BridgeConfig::default()
    }
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = mock_config(&dir);
    harness_with(config, dir)
}

pub fn harness_with(config: BridgeConfig, dir: TempDir) -> Harness {
    let provider = ProviderClient::new(&config).expect("client");
    let catalog = CatalogStore::new(config.catalog_path.clone());
    catalog.ensure_dir().expect("catalog dir");
    let (tasks, rx) = TaskQueue::new();
    let app = router(AppState {
        config: Arc::new(config),
        provider: provider.clone(),
        catalog: catalog.clone(),
        tasks,
    });
    Harness {
        app,
        provider,
        catalog,
        tasks: rx,
        dir,
    }
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                field,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}
