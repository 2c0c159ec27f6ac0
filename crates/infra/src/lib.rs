//! Infrastructure layer: on-disk record storage and process configuration.

pub mod config;
pub mod store;

pub use config::{Config, ConfigError, Environment, TlsPaths};
pub use store::{FileStore, InMemoryStore, RecordStore, StoreError};
