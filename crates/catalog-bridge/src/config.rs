use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::http_mock::HttpMode;

pub const DEFAULT_CONFIG_FILE: &str = "config.ini";
pub const DEFAULT_API_VERSION: &str = "v22.0";
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_VERIFY_TOKEN: &str = "whatsapp_verify";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CATALOG_PATH: &str = "catalogs/current.pdf";

pub const TOKEN_KEY: &str = "WHATSAPP_TOKEN";
pub const PHONE_NUMBER_ID_KEY: &str = "PHONE_NUMBER_ID";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] io::Error),
    #[error("invalid PORT value '{0}'")]
    InvalidPort(String),
    #[error("invalid HTTP_MODE value '{0}', expected 'real' or 'mock'")]
    InvalidHttpMode(String),
}

/// Process-wide settings, resolved once at start-up and shared by reference.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeConfig {
    #[serde(skip_serializing)]
    pub whatsapp_token: String,
    pub phone_number_id: String,
    pub api_version: String,
    pub graph_api_base: String,
    pub public_base_url: Option<String>,
    #[serde(skip_serializing)]
    pub verify_token: String,
    pub port: u16,
    pub catalog_path: PathBuf,
    pub http_mode: HttpMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            whatsapp_token: String::new(),
            phone_number_id: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            graph_api_base: DEFAULT_GRAPH_API_BASE.to_string(),
            public_base_url: None,
            verify_token: DEFAULT_VERIFY_TOKEN.to_string(),
            port: DEFAULT_PORT,
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            http_mode: HttpMode::Real,
        }
    }
}

impl BridgeConfig {
    /// Reads `file` (when present) and the process environment. File entries win.
    pub fn load(file: &Path) -> Result<Self, ConfigError> {
        let entries = read_config_file(file)?;
        Self::from_sources(&entries, |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(file: &BTreeMap<String, String>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank entries count as unset in either source.
        let present = |value: String| Some(value.trim().to_string()).filter(|v| !v.is_empty());
        let lookup = |key: &str| -> Option<String> {
            file.get(key)
                .cloned()
                .and_then(present)
                .or_else(|| env(key).and_then(present))
        };

        let defaults = Self::default();
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => defaults.port,
        };
        let http_mode = match lookup("HTTP_MODE") {
            Some(raw) => HttpMode::parse(&raw).ok_or(ConfigError::InvalidHttpMode(raw))?,
            None => defaults.http_mode,
        };

        Ok(Self {
            whatsapp_token: lookup(TOKEN_KEY)
                .map(|value| clean_token(&value))
                .unwrap_or_default(),
            phone_number_id: lookup(PHONE_NUMBER_ID_KEY)
                .map(|value| clean_token(&value))
                .unwrap_or_default(),
            api_version: lookup("API_VERSION").unwrap_or(defaults.api_version),
            graph_api_base: lookup("GRAPH_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.graph_api_base),
            public_base_url: lookup("BASE_URL")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty()),
            verify_token: lookup("WEBHOOK_VERIFY_TOKEN")
                .or_else(|| lookup("VERIFY_TOKEN"))
                .unwrap_or(defaults.verify_token),
            port,
            catalog_path: lookup("CATALOG_PDF_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            http_mode,
        })
    }

    /// Keys that must be set before anything can be sent to the provider.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.whatsapp_token.is_empty() {
            missing.push(TOKEN_KEY);
        }
        if self.phone_number_id.is_empty() {
            missing.push(PHONE_NUMBER_ID_KEY);
        }
        missing
    }
}

/// Missing files yield an empty map.
pub fn read_config_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(parse_key_values(&contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(ConfigError::Read(path.to_path_buf(), err)),
    }
}

pub fn parse_key_values(contents: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        entries.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }
    entries
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Tokens pasted from dashboards often carry line breaks or stray spaces.
pub fn clean_token(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}
