//! Product persistence gateway.
//!
//! `store` defines the storage-agnostic boundary; `in_memory` and `postgres`
//! implement it.

pub mod in_memory;
pub mod postgres;
pub mod store;

pub use in_memory::InMemoryProductStore;
pub use postgres::PostgresProductStore;
pub use store::{ProductRepository, ProductTransaction, StoreError};
