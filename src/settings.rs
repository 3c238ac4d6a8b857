//! File-backed settings.
//!
//! Settings hold the defaults that environment variables override during
//! [`crate::config::Config::resolve`]. A missing settings file is not an
//! error; every field falls back to its built-in default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default settings file looked up next to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "casedesk.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub credentials: CredentialSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: String,
    pub lookup_mode: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub bucket: String,
    pub public_base_url: Option<String>,
    pub tables: TableSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "dynamodb".to_string(),
            lookup_mode: "key".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            bucket: "casedesk-documents".to_string(),
            public_base_url: None,
            tables: TableSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub users: String,
    pub cases: String,
    pub documents: String,
    pub chats: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            users: "CasedeskUsers".to_string(),
            cases: "CasedeskCases".to_string(),
            documents: "CasedeskDocuments".to_string(),
            chats: "CasedeskChats".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub password_scheme: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            password_scheme: "argon2".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// Returns defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Parse {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };
        Self::from_toml(&raw).map_err(|reason| ConfigError::Parse {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }
}
