use crate::config::helpers::{optional_env, parse_optional_string_env, parse_string_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Which key-value and blob backends to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// DynamoDB tables plus an S3 bucket.
    DynamoDb,
    /// Process-local maps. Data does not survive a restart.
    Memory,
}

impl StoreBackend {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "dynamodb" | "aws" => Ok(Self::DynamoDb),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "STORE_BACKEND".to_string(),
                message: format!("unsupported backend '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DynamoDb => "dynamodb",
            Self::Memory => "memory",
        }
    }
}

/// How `get_by_id` lookups reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Primary-key point lookup.
    Key,
    /// Equality-filtered full scan on `_id`, with duplicate detection.
    Scan,
}

impl LookupMode {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "key" => Ok(Self::Key),
            "scan" => Ok(Self::Scan),
            other => Err(ConfigError::InvalidValue {
                key: "STORE_LOOKUP_MODE".to_string(),
                message: format!("unsupported lookup mode '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Scan => "scan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub users: String,
    pub cases: String,
    pub documents: String,
    pub chats: String,
}

impl Default for TableNames {
    fn default() -> Self {
        let defaults = crate::settings::TableSettings::default();
        Self {
            users: defaults.users,
            cases: defaults.cases,
            documents: defaults.documents,
            chats: defaults.chats,
        }
    }
}

/// Store client configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    pub lookup_mode: LookupMode,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub bucket: String,
    pub public_base_url: Option<String>,
    pub tables: TableNames,
}

impl StorageConfig {
    /// In-memory configuration used by tests and local development.
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            lookup_mode: LookupMode::Key,
            region: "us-east-1".to_string(),
            endpoint_url: None,
            bucket: "casedesk-documents".to_string(),
            public_base_url: None,
            tables: TableNames::default(),
        }
    }
}

fn validate_table_name(key: &str, raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    // DynamoDB: 3-255 chars of [a-zA-Z0-9_.-].
    let valid_chars = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if trimmed.len() < 3 || trimmed.len() > 255 || !valid_chars {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{trimmed}' is not a valid table name"),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_bucket(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let valid_chars = trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.'));
    if trimmed.len() < 3 || trimmed.len() > 63 || !valid_chars {
        return Err(ConfigError::InvalidValue {
            key: "BLOB_BUCKET".to_string(),
            message: format!("'{trimmed}' is not a valid bucket name"),
        });
    }
    Ok(trimmed.to_string())
}

impl StorageConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let storage = &settings.storage;
        let backend =
            StoreBackend::from_str(&parse_string_env("STORE_BACKEND", storage.backend.clone())?)?;
        let lookup_mode = LookupMode::from_str(&parse_string_env(
            "STORE_LOOKUP_MODE",
            storage.lookup_mode.clone(),
        )?)?;
        let region = optional_env("AWS_REGION")?
            .or_else(|| optional_env("AWS_DEFAULT_REGION").ok().flatten())
            .unwrap_or_else(|| storage.region.clone());

        Ok(Self {
            backend,
            lookup_mode,
            region,
            endpoint_url: parse_optional_string_env(
                "DYNAMODB_ENDPOINT_URL",
                storage.endpoint_url.clone(),
            )?,
            bucket: validate_bucket(parse_string_env("BLOB_BUCKET", storage.bucket.clone())?)?,
            public_base_url: parse_optional_string_env(
                "BLOB_PUBLIC_BASE_URL",
                storage.public_base_url.clone(),
            )?
            .map(|url| url.trim_end_matches('/').to_string()),
            tables: TableNames {
                users: validate_table_name(
                    "TABLE_USERS",
                    parse_string_env("TABLE_USERS", storage.tables.users.clone())?,
                )?,
                cases: validate_table_name(
                    "TABLE_CASES",
                    parse_string_env("TABLE_CASES", storage.tables.cases.clone())?,
                )?,
                documents: validate_table_name(
                    "TABLE_DOCUMENTS",
                    parse_string_env("TABLE_DOCUMENTS", storage.tables.documents.clone())?,
                )?,
                chats: validate_table_name(
                    "TABLE_CHATS",
                    parse_string_env("TABLE_CHATS", storage.tables.chats.clone())?,
                )?,
            },
        })
    }
}
