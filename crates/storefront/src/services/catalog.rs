//! Menu catalog: categories and products.
//!
//! Reads are cached in memory with `moka` for the configured TTL. Back-office
//! writes call [`CatalogService::invalidate_all`] so customers see changes at
//! once.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use foodtruck_core::{CategoryId, ProductId};

use crate::backend::{BackendError, CatalogTable, ProductQuery};
use crate::models::{Category, Product};

/// Upper bound on cached entries.
const CACHE_CAPACITY: u64 = 1000;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    Products(ProductQuery),
    Product(ProductId),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
}

/// Cached read access to the catalog.
#[derive(Clone)]
pub struct CatalogService {
    table: Arc<dyn CatalogTable>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("cached_entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    #[must_use]
    pub fn new(table: Arc<dyn CatalogTable>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { table, cache }
    }

    /// Categories ordered by position.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, BackendError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories.as_ref().clone());
        }

        let categories = self.table.list_categories().await?;
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::new(categories.clone())),
            )
            .await;
        Ok(categories)
    }

    /// Products customers can order, optionally within one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn menu(&self, category: Option<CategoryId>) -> Result<Vec<Product>, BackendError> {
        self.products(ProductQuery::menu(category)).await
    }

    /// Available featured products for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn featured(&self) -> Result<Vec<Product>, BackendError> {
        self.products(ProductQuery::FEATURED).await
    }

    /// Products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: ProductQuery) -> Result<Vec<Product>, BackendError> {
        let cache_key = CacheKey::Products(query);
        if let Some(CacheValue::Products(products)) = self.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products.as_ref().clone());
        }

        let products = self.table.list_products(&query).await?;
        self.cache
            .insert(cache_key, CacheValue::Products(Arc::new(products.clone())))
            .await;
        Ok(products)
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` for an unknown id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, BackendError> {
        let cache_key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product = self.table.get_product(id).await?;
        self.cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use foodtruck_core::Price;

    use super::*;
    use crate::models::{NewCategory, NewProduct};

    #[derive(Default)]
    struct CountingCatalog {
        product_lists: AtomicUsize,
    }

    #[async_trait]
    impl CatalogTable for CountingCatalog {
        async fn list_categories(&self) -> Result<Vec<Category>, BackendError> {
            Ok(Vec::new())
        }

        async fn insert_category(&self, _: &NewCategory) -> Result<Category, BackendError> {
            Err(BackendError::Unauthenticated)
        }

        async fn update_category(&self, _: CategoryId, _: &NewCategory) -> Result<(), BackendError> {
            Ok(())
        }

        async fn delete_category(&self, _: CategoryId) -> Result<(), BackendError> {
            Ok(())
        }

        async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, BackendError> {
            self.product_lists.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Product {
                id: ProductId::random(),
                name: "X-Burger".into(),
                description: String::new(),
                price: Price::from_cents(2500),
                image_url: None,
                category_id: query.category,
                available: true,
                featured: query.featured_only,
            }])
        }

        async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
            Err(BackendError::NotFound(id.to_string()))
        }

        async fn insert_product(&self, _: &NewProduct) -> Result<Product, BackendError> {
            Err(BackendError::Unauthenticated)
        }

        async fn update_product(&self, _: ProductId, _: &NewProduct) -> Result<(), BackendError> {
            Ok(())
        }

        async fn set_product_available(&self, _: ProductId, _: bool) -> Result<(), BackendError> {
            Ok(())
        }

        async fn set_product_featured(&self, _: ProductId, _: bool) -> Result<(), BackendError> {
            Ok(())
        }

        async fn delete_product(&self, _: ProductId) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_products_are_cached_per_query() {
        let table = Arc::new(CountingCatalog::default());
        let catalog = CatalogService::new(table.clone(), Duration::from_secs(60));

        catalog.menu(None).await.unwrap();
        catalog.menu(None).await.unwrap();
        assert_eq!(table.product_lists.load(Ordering::SeqCst), 1);

        let featured = catalog.featured().await.unwrap();
        assert!(featured[0].featured);
        assert_eq!(table.product_lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_reload() {
        let table = Arc::new(CountingCatalog::default());
        let catalog = CatalogService::new(table.clone(), Duration::from_secs(60));

        catalog.menu(None).await.unwrap();
        catalog.invalidate_all().await;
        catalog.menu(None).await.unwrap();
        assert_eq!(table.product_lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_cached() {
        let catalog =
            CatalogService::new(Arc::new(CountingCatalog::default()), Duration::from_secs(60));
        let err = catalog.product(ProductId::random()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
