//! Bridge between the WhatsApp Cloud API and a single catalog PDF.
//!
//! Inbound webhook clicks on the catalog button are answered with the current PDF;
//! management endpoints send interactive, text, document and bulk messages.

pub mod bulk;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod http_mock;
pub mod message;
pub mod provider;
pub mod sender;
pub mod server;

pub use catalog::CatalogStore;
pub use config::{BridgeConfig, ConfigError};
pub use dispatch::{CatalogTask, TaskQueue, run_worker};
pub use provider::{ProviderClient, ProviderError};
pub use sender::{CatalogSender, SendError};
pub use server::{AppState, router};
