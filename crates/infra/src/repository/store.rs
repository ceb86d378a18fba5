use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use catalog_core::ProductId;
use catalog_products::{Page, PageRequest, Predicate, Product, ProductFields};

/// Persistence operation error.
///
/// These are **infrastructure errors** (connectivity, constraints, decoding)
/// as opposed to domain errors. They are passed through to callers unchanged;
/// nothing at this layer retries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("failed to decode stored row: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to products plus the entry point for atomic writes.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Every stored product, ordered by id.
    async fn find_all(&self) -> Result<Vec<Product>, StoreError>;

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// One page of the products matching `predicate`, plus the total match count.
    async fn find_matching(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
    ) -> Result<Page<Product>, StoreError>;

    /// Start a write transaction.
    async fn begin(&self) -> Result<Box<dyn ProductTransaction>, StoreError>;
}

/// A unit of work over the products table.
///
/// Nothing written through a transaction is visible to other readers until
/// `commit` succeeds. Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait ProductTransaction: Send {
    /// Load a product and hold it for the rest of the transaction.
    async fn find_by_id(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Store a new product; the store assigns its id.
    async fn insert(&mut self, fields: ProductFields) -> Result<Product, StoreError>;

    /// Overwrite every field of an existing product.
    async fn update(&mut self, product: &Product) -> Result<Product, StoreError>;

    async fn delete(&mut self, id: ProductId) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> ProductRepository for Arc<S>
where
    S: ProductRepository + ?Sized,
{
    async fn find_all(&self) -> Result<Vec<Product>, StoreError> {
        (**self).find_all().await
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_matching(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        (**self).find_matching(predicate, page).await
    }

    async fn begin(&self) -> Result<Box<dyn ProductTransaction>, StoreError> {
        (**self).begin().await
    }
}
