use std::net::SocketAddr;

use crate::config::helpers::{parse_csv_env, parse_string_env, parse_usize_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// HTTP gateway configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Request body ceiling for the multipart upload routes.
    pub max_upload_bytes: usize,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_upload_bytes: 50 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

fn parse_bind(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidValue {
            key: "CASEDESK_BIND".to_string(),
            message: format!("'{raw}' is not a socket address: {e}"),
        })
}

fn validate_origins(origins: Vec<String>) -> Result<Vec<String>, ConfigError> {
    for origin in &origins {
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "CASEDESK_CORS_ORIGINS".to_string(),
                message: format!("origin '{origin}' must start with http:// or https://"),
            });
        }
    }
    Ok(origins)
}

impl ServerConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let bind = parse_string_env("CASEDESK_BIND", settings.server.bind.clone())?;
        let max_upload_bytes =
            parse_usize_env("CASEDESK_MAX_UPLOAD_BYTES", settings.server.max_upload_bytes)?;
        if max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CASEDESK_MAX_UPLOAD_BYTES".to_string(),
                message: "upload limit must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind: parse_bind(&bind)?,
            max_upload_bytes,
            cors_origins: validate_origins(parse_csv_env(
                "CASEDESK_CORS_ORIGINS",
                settings.server.cors_origins.clone(),
            )?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ConfigError;

    #[test]
    fn parse_bind_rejects_garbage() {
        let err = super::parse_bind("localhost").expect_err("not an addr");
        let ConfigError::InvalidValue { key, .. } = err else {
            panic!("expected InvalidValue");
        };
        assert_eq!(key, "CASEDESK_BIND");
    }

    #[test]
    fn validate_origins_requires_scheme() {
        assert!(super::validate_origins(vec!["https://app.example".to_string()]).is_ok());
        let err = super::validate_origins(vec!["app.example".to_string()]).expect_err("no scheme");
        let ConfigError::InvalidValue { message, .. } = err else {
            panic!("expected InvalidValue");
        };
        assert!(message.contains("app.example"), "unexpected message: {message}");
    }
}
