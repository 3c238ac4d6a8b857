//! Case-management backend: users, cases, per-case chat threads and
//! documents over a key-value store and a blob store.

pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod legal;
pub mod settings;
pub mod web;

pub use config::Config;
pub use db::{StoreClient, connect_from_config};
pub use error::{ConfigError, DatabaseError, ServiceError};
pub use settings::Settings;
