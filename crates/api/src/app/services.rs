use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use catalog_core::{Entity, ProductId};
use catalog_infra::{
    AppConfig, InMemoryProductStore, PostgresProductStore, ProductRepository, StoreError,
};
use catalog_products::{Page, PageRequest, Product, ProductFields, ProductFilter};

/// Failure of a product service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Product use cases over any [`ProductRepository`].
///
/// Writes run in a single store transaction each. Updates replace every field;
/// there is no partial update.
#[derive(Debug, Clone)]
pub struct ProductService<R> {
    repo: R,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn get_all(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.repo.find_all().await?)
    }

    /// Absence is `Ok(None)`, not an error.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, ServiceError> {
        Ok(self.repo.find_by_id(id).await?)
    }

    #[instrument(skip(self, fields), err)]
    pub async fn create(&self, fields: ProductFields) -> Result<Product, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let product = tx.insert(fields.normalized()).await?;
        tx.commit().await?;
        tracing::info!(product_id = %product.id(), "product created");
        Ok(product)
    }

    #[instrument(skip(self, fields), err)]
    pub async fn update(&self, id: ProductId, fields: ProductFields) -> Result<Product, ServiceError> {
        let mut tx = self.repo.begin().await?;
        let existing = tx.find_by_id(id).await?.ok_or(ServiceError::NotFound(id))?;
        let updated = tx.update(&existing.with_fields(fields.normalized())).await?;
        tx.commit().await?;
        tracing::info!(product_id = %id, "product updated");
        Ok(updated)
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        let mut tx = self.repo.begin().await?;
        if tx.find_by_id(id).await?.is_none() {
            return Err(ServiceError::NotFound(id));
        }
        tx.delete(id).await?;
        tx.commit().await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn search(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<Page<Product>, ServiceError> {
        let predicate = filter.build();
        Ok(self.repo.find_matching(&predicate, page).await?)
    }
}

/// Services shared by every request handler.
pub struct AppServices {
    pub products: ProductService<Arc<dyn ProductRepository>>,
}

impl AppServices {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self {
            products: ProductService::new(repo),
        }
    }

    /// Services backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryProductStore::new()))
    }
}

/// Pick the store from configuration: Postgres when a database is
/// configured, otherwise in-memory.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    match &config.database {
        Some(db) => {
            let store = PostgresProductStore::connect(&db.url, db.max_connections).await?;
            store.ensure_schema().await?;
            tracing::info!(max_connections = db.max_connections, "using postgres product store");
            Ok(AppServices::new(Arc::new(store)))
        }
        None => Ok(AppServices::in_memory()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_products::{ProductCategory, Sort, SortField};
    use rust_decimal::Decimal;

    fn service() -> ProductService<InMemoryProductStore> {
        ProductService::new(InMemoryProductStore::new())
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn fields(name: &str, price: &str, stock: i32, category: ProductCategory) -> ProductFields {
        ProductFields {
            name: name.to_string(),
            description: None,
            price: dec(price),
            stock_quantity: stock,
            category,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_the_same_product() {
        let svc = service();
        let created = svc
            .create(fields("Widget", "9.99", 10, ProductCategory::Tools))
            .await
            .unwrap();

        let fetched = svc.get_by_id(created.id()).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name(), "Widget");
        assert_eq!(fetched.price(), dec("9.99"));
    }

    #[tokio::test]
    async fn stored_price_is_rounded_to_cents() {
        let svc = service();
        let created = svc
            .create(fields("Widget", "9.999", 10, ProductCategory::Tools))
            .await
            .unwrap();
        assert_eq!(created.price().to_string(), "10.00");

        let fetched = svc.get_by_id(created.id()).await.unwrap().unwrap();
        assert_eq!(fetched.price().to_string(), "10.00");

        let at_least_ten = ProductFilter {
            min_price: Some(dec("10")),
            ..ProductFilter::default()
        };
        let page = svc.search(&at_least_ten, &PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements(), 1);

        let updated = svc
            .update(created.id(), fields("Widget", "0.125", 10, ProductCategory::Tools))
            .await
            .unwrap();
        assert_eq!(updated.price().to_string(), "0.13");
    }

    #[tokio::test]
    async fn missing_product_is_absent_not_an_error() {
        let svc = service();
        assert!(svc.get_by_id(ProductId::from_i64(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_overwrites_every_field() {
        let svc = service();
        let mut original = fields("Widget", "9.99", 10, ProductCategory::Tools);
        original.description = Some("small".to_string());
        let created = svc.create(original).await.unwrap();

        let replacement = fields("Gizmo", "12.50", 3, ProductCategory::Toys);
        let updated = svc.update(created.id(), replacement.clone()).await.unwrap();

        assert_eq!(updated.id(), created.id());
        assert_eq!(updated.fields(), &replacement);
        assert_eq!(updated.description(), None);
        assert_eq!(svc.get_by_id(created.id()).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let svc = service();
        let err = svc
            .update(ProductId::from_i64(7), fields("Ghost", "1", 1, ProductCategory::Other))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(id) if id == ProductId::from_i64(7)));
        assert!(svc.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let svc = service();
        let created = svc
            .create(fields("Widget", "9.99", 10, ProductCategory::Tools))
            .await
            .unwrap();

        svc.delete(created.id()).await.unwrap();
        assert!(svc.get_by_id(created.id()).await.unwrap().is_none());
        assert!(matches!(
            svc.delete(created.id()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn get_all_lists_in_id_order() {
        let svc = service();
        for name in ["b", "a", "c"] {
            svc.create(fields(name, "1", 1, ProductCategory::Other)).await.unwrap();
        }
        let names: Vec<String> = svc
            .get_all()
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn widget_search_scenario() {
        let svc = service();
        let widget = svc
            .create(fields("Widget", "9.99", 10, ProductCategory::Tools))
            .await
            .unwrap();
        svc.create(fields("Gadget", "25.00", 5, ProductCategory::Electronics))
            .await
            .unwrap();

        let by_name = ProductFilter {
            name: Some("wid".to_string()),
            ..ProductFilter::default()
        };
        let page = svc.search(&by_name, &PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements(), 1);
        assert_eq!(page.content()[0].id(), widget.id());

        let pricey = ProductFilter {
            min_price: Some(dec("10")),
            ..ProductFilter::default()
        };
        let page = svc.search(&pricey, &PageRequest::default()).await.unwrap();
        let names: Vec<&str> = page.content().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Gadget"]);

        let inverted = ProductFilter {
            min_price: Some(dec("100")),
            max_price: Some(dec("1")),
            ..ProductFilter::default()
        };
        let page = svc.search(&inverted, &PageRequest::default()).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_elements(), 0);
    }

    #[tokio::test]
    async fn widget_alone_matches_name_and_price_range_but_not_electronics() {
        let svc = service();
        let widget = svc
            .create(fields("Widget", "9.99", 10, ProductCategory::Tools))
            .await
            .unwrap();

        let criteria = ProductFilter {
            name: Some("wid".to_string()),
            min_price: Some(dec("5")),
            max_price: Some(dec("15")),
            ..ProductFilter::default()
        };
        let page = svc.search(&criteria, &PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements(), 1);
        assert_eq!(page.into_content(), vec![widget]);

        let electronics = ProductFilter {
            category: Some(ProductCategory::Electronics),
            ..ProductFilter::default()
        };
        let page = svc.search(&electronics, &PageRequest::default()).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_elements(), 0);
    }

    #[tokio::test]
    async fn empty_filter_search_matches_get_all() {
        let svc = service();
        for (name, price) in [("Widget", "9.99"), ("Gadget", "25.00"), ("Hammer", "15.00")] {
            svc.create(fields(name, price, 1, ProductCategory::Tools)).await.unwrap();
        }

        let page = svc
            .search(&ProductFilter::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements(), 3);
        assert_eq!(page.into_content(), svc.get_all().await.unwrap());

        let by_price = PageRequest::new(0, 2, Some(Sort::desc(SortField::Price)));
        let page = svc.search(&ProductFilter::default(), &by_price).await.unwrap();
        let names: Vec<&str> = page.content().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Gadget", "Hammer"]);
        assert_eq!(page.total_pages(), 2);
    }
}
