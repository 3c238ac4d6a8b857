//! Runtime configuration.
//!
//! Values resolve in order: environment variable, settings file, built-in
//! default. Resolution validates everything up front so a bad value stops
//! the process at startup rather than on the first request.

mod credentials;
pub(crate) mod helpers;
mod server;
mod storage;

pub use credentials::{CredentialsConfig, PasswordScheme};
pub use server::ServerConfig;
pub use storage::{LookupMode, StorageConfig, StoreBackend, TableNames};

use crate::error::ConfigError;
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::resolve(settings)?,
            storage: StorageConfig::resolve(settings)?,
            credentials: CredentialsConfig::resolve(settings)?,
        })
    }
}
