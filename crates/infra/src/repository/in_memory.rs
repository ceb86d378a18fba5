use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use catalog_core::{Entity, ProductId};
use catalog_products::{Page, PageRequest, Predicate, Product, ProductFields};

use super::store::{ProductRepository, ProductTransaction, StoreError};

#[derive(Debug, Clone)]
struct Table {
    rows: BTreeMap<ProductId, ProductFields>,
    next_id: i64,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl Table {
    fn get(&self, id: ProductId) -> Option<Product> {
        self.rows.get(&id).map(|f| Product::new(id, f.clone()))
    }

    fn products(&self) -> impl Iterator<Item = Product> + '_ {
        self.rows.iter().map(|(id, f)| Product::new(*id, f.clone()))
    }
}

/// In-memory product store.
///
/// Intended for tests/dev. A write transaction holds the table lock until it
/// commits or is dropped, so transactions are fully serialized.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductStore {
    table: Arc<Mutex<Table>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductStore {
    async fn find_all(&self) -> Result<Vec<Product>, StoreError> {
        let table = self.table.lock().await;
        let products = table.products().collect();
        Ok(products)
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.table.lock().await.get(id))
    }

    async fn find_matching(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        let mut matching: Vec<Product> = {
            let table = self.table.lock().await;
            table.products().filter(|p| predicate.matches(p)).collect()
        };

        let sort = page.sort();
        matching.sort_by(|a, b| sort.compare(a, b));

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let content = matching
            .into_iter()
            .skip(offset)
            .take(page.size() as usize)
            .collect();

        Ok(Page::new(content, page, total))
    }

    async fn begin(&self) -> Result<Box<dyn ProductTransaction>, StoreError> {
        let guard = self.table.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }
}

/// Writes go to `staged`; commit copies them over the locked table.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<Table>,
    staged: Table,
}

#[async_trait]
impl ProductTransaction for InMemoryTransaction {
    async fn find_by_id(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.staged.get(id))
    }

    async fn insert(&mut self, fields: ProductFields) -> Result<Product, StoreError> {
        let id = ProductId::from_i64(self.staged.next_id);
        self.staged.next_id += 1;
        self.staged.rows.insert(id, fields.clone());
        Ok(Product::new(id, fields))
    }

    async fn update(&mut self, product: &Product) -> Result<Product, StoreError> {
        match self.staged.rows.get_mut(&product.id()) {
            Some(row) => {
                *row = product.fields().clone();
                Ok(product.clone())
            }
            None => Err(StoreError::Database(format!(
                "product {} does not exist",
                product.id()
            ))),
        }
    }

    async fn delete(&mut self, id: ProductId) -> Result<(), StoreError> {
        self.staged.rows.remove(&id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
