use crate::config::helpers::parse_string_env;
use crate::error::ConfigError;
use crate::settings::Settings;

/// How user passwords are stored and verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    /// Salted Argon2id PHC strings.
    Argon2,
    /// Stored verbatim and compared in constant time. Only for data written
    /// by older deployments.
    Plaintext,
}

impl PasswordScheme {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "argon2" | "argon2id" => Ok(Self::Argon2),
            "plaintext" | "legacy" => Ok(Self::Plaintext),
            other => Err(ConfigError::InvalidValue {
                key: "CREDENTIALS_PASSWORD_SCHEME".to_string(),
                message: format!("unsupported password scheme '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Argon2 => "argon2",
            Self::Plaintext => "plaintext",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialsConfig {
    pub password_scheme: PasswordScheme,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            password_scheme: PasswordScheme::Argon2,
        }
    }
}

impl CredentialsConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let raw = parse_string_env(
            "CREDENTIALS_PASSWORD_SCHEME",
            settings.credentials.password_scheme.clone(),
        )?;
        Ok(Self {
            password_scheme: PasswordScheme::from_str(&raw)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PasswordScheme;

    #[test]
    fn scheme_aliases_resolve() {
        assert_eq!(
            PasswordScheme::from_str("Argon2id").expect("valid"),
            PasswordScheme::Argon2
        );
        assert_eq!(
            PasswordScheme::from_str("legacy").expect("valid"),
            PasswordScheme::Plaintext
        );
        assert!(PasswordScheme::from_str("md5").is_err());
    }
}
