//! Infrastructure layer: persistence gateway and configuration.

pub mod config;
pub mod repository;

pub use config::{AllowList, AppConfig, ConfigError, CorsConfig, DatabaseConfig};
pub use repository::{
    InMemoryProductStore, PostgresProductStore, ProductRepository, ProductTransaction, StoreError,
};
