//! Product catalog service.
//!
//! Product detail reads are cached via `moka` (5-minute TTL). Every admin
//! write goes through this service and invalidates the affected entry.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::catalog::{self, CATEGORY_TREE, CategoryGroup};
use onandhome_core::{ProductId, ProductStatus, Won};

use super::{BulkResult, ServiceError, or_not_found};
use crate::db::RepositoryError;
use crate::db::notifications::NotificationRepository;
use crate::db::products::{ProductFilter, ProductRepository};
use crate::models::product::{Product, ProductDetail, ProductInput};

const PRODUCT_NOT_FOUND: &str = "상품을 찾을 수 없습니다.";

/// Shared cache of product details keyed by ID.
#[derive(Clone)]
pub struct ProductCache {
    cache: Cache<ProductId, Arc<ProductDetail>>,
}

impl Default for ProductCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductCache {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// Drop one cached product.
    pub async fn invalidate(&self, id: ProductId) {
        self.cache.invalidate(&id).await;
    }

    /// Drop every cached product.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for ProductCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

/// Resolve a category query to the sub-categories it covers.
///
/// A parent key (`"kitchen"`) expands to its sub-categories, anything else
/// is taken as a sub-category name. Blank input means no filter.
#[must_use]
pub fn expand_category(category: Option<&str>) -> Vec<&str> {
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        None => Vec::new(),
        Some(key) => catalog::group(key).map_or_else(
            || vec![key],
            |group| group.sub_categories.to_vec(),
        ),
    }
}

/// Normalize admin input: trimmed name, non-negative amounts, and a sale
/// price that defaults to the list price.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` for a blank name or negative numbers.
pub fn normalize_input(mut input: ProductInput) -> Result<ProductInput, ServiceError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(ServiceError::invalid("상품명을 입력해주세요."));
    }
    if input.price.is_negative() {
        return Err(ServiceError::invalid("가격은 0원 이상이어야 합니다."));
    }
    if input.stock < 0 {
        return Err(ServiceError::invalid("재고는 0개 이상이어야 합니다."));
    }

    match input.sale_price {
        Some(sale) if sale.is_negative() => {
            return Err(ServiceError::invalid("할인가는 0원 이상이어야 합니다."));
        }
        Some(sale) if sale.is_zero() => input.sale_price = Some(input.price),
        None => input.sale_price = Some(input.price),
        Some(_) => {}
    }

    input.product_code = input
        .product_code
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty());
    Ok(input)
}

/// Catalog service.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    notifications: NotificationRepository<'a>,
    cache: &'a ProductCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a ProductCache) -> Self {
        Self {
            products: ProductRepository::new(pool),
            notifications: NotificationRepository::new(pool),
            cache,
        }
    }

    /// The static category tree.
    #[must_use]
    pub const fn categories() -> &'static [CategoryGroup] {
        &CATEGORY_TREE
    }

    /// Products in a category (parent key or sub-category) matching a keyword.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(
        &self,
        category: Option<&str>,
        keyword: Option<&str>,
        in_stock_only: bool,
    ) -> Result<Vec<Product>, ServiceError> {
        let categories = expand_category(category);
        Ok(self
            .products
            .list(ProductFilter {
                categories: &categories,
                keyword,
                in_stock_only,
            })
            .await?)
    }

    /// Product detail with rating stats, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown product.
    #[instrument(skip(self))]
    pub async fn detail(&self, id: ProductId) -> Result<Arc<ProductDetail>, ServiceError> {
        if let Some(cached) = self.cache.cache.get(&id).await {
            tracing::debug!("Cache hit for product");
            return Ok(cached);
        }

        let product = self
            .products
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(PRODUCT_NOT_FOUND))?;
        let stats = self.products.rating_stats(id).await?;

        let detail = Arc::new(ProductDetail {
            product,
            average_rating: stats.average_rating.unwrap_or(0.0),
            review_count: stats.review_count,
        });
        self.cache.cache.insert(id, Arc::clone(&detail)).await;
        Ok(detail)
    }

    /// Uncached product row for the admin screens.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown product.
    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(PRODUCT_NOT_FOUND))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for bad input and
    /// `ServiceError::Conflict` for a duplicate product code.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: ProductInput) -> Result<Product, ServiceError> {
        let input = normalize_input(input)?;
        let product = self.products.create(&input).await.map_err(conflict)?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, `ServiceError::Invalid` or
    /// `ServiceError::Conflict`.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: ProductId, input: ProductInput) -> Result<Product, ServiceError> {
        let input = normalize_input(input)?;
        let product = self.products.update(id, &input).await.map_err(conflict)?;
        self.cache.invalidate(id).await;
        Ok(product)
    }

    /// Change a product's sales status.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown product.
    pub async fn set_status(&self, id: ProductId, status: ProductStatus) -> Result<Product, ServiceError> {
        let product = self
            .products
            .set_status(id, status)
            .await
            .map_err(or_not_found(PRODUCT_NOT_FOUND))?;
        self.cache.invalidate(id).await;
        Ok(product)
    }

    /// Delete a product and the notifications that point at it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown product.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        self.products
            .delete(id)
            .await
            .map_err(or_not_found(PRODUCT_NOT_FOUND))?;
        self.cache.invalidate(id).await;
        self.notifications.delete_by_product(id).await?;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Delete several products, counting successes and failures.
    pub async fn delete_many(&self, ids: &[ProductId]) -> BulkResult {
        let mut result = BulkResult::default();
        for &id in ids {
            match self.delete(id).await {
                Ok(()) => result.success_count += 1,
                Err(e) => {
                    tracing::warn!(product_id = %id, error = %e, "Bulk product delete failed");
                    result.fail_count += 1;
                }
            }
        }
        result
    }
}

fn conflict(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::Conflict(_) => ServiceError::Conflict("이미 사용 중인 상품 코드입니다.".to_string()),
        RepositoryError::NotFound => ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string()),
        other => ServiceError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(price: i64, sale: Option<i64>) -> ProductInput {
        ProductInput {
            name: "  냉장고 A  ".into(),
            price: Won::new(price),
            sale_price: sale.map(Won::new),
            stock: 3,
            ..ProductInput::default()
        }
    }

    #[test]
    fn test_expand_parent_category() {
        assert_eq!(
            expand_category(Some("kitchen")),
            vec!["냉장고", "전자렌지", "식기세척기"]
        );
        assert_eq!(expand_category(Some("TV")), vec!["TV"]);
        assert!(expand_category(Some("  ")).is_empty());
        assert!(expand_category(None).is_empty());
    }

    #[test]
    fn test_sale_price_defaults_to_price() {
        let normalized = normalize_input(input(500_000, None)).unwrap();
        assert_eq!(normalized.sale_price, Some(Won::new(500_000)));
        assert_eq!(normalized.name, "냉장고 A");

        let zero = normalize_input(input(500_000, Some(0))).unwrap();
        assert_eq!(zero.sale_price, Some(Won::new(500_000)));

        let discounted = normalize_input(input(500_000, Some(450_000))).unwrap();
        assert_eq!(discounted.sale_price, Some(Won::new(450_000)));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(normalize_input(input(-1, None)).is_err());

        let mut blank = input(1_000, None);
        blank.name = "   ".into();
        assert!(normalize_input(blank).is_err());

        let mut negative_stock = input(1_000, None);
        negative_stock.stock = -1;
        assert!(normalize_input(negative_stock).is_err());
    }

    #[tokio::test]
    async fn test_cache_invalidation() {
        let cache = ProductCache::new();
        let now = chrono::Utc::now();
        let detail = Arc::new(ProductDetail {
            product: Product {
                id: ProductId::new(1),
                product_code: None,
                name: "TV".into(),
                description: None,
                price: Won::new(1_000),
                sale_price: None,
                stock: 1,
                thumbnail_image: None,
                detail_image: None,
                category: Some("TV".into()),
                manufacturer: None,
                country: None,
                status: ProductStatus::OnSale,
                created_at: now,
                updated_at: now,
            },
            average_rating: 0.0,
            review_count: 0,
        });

        cache.cache.insert(ProductId::new(1), detail).await;
        assert!(cache.cache.get(&ProductId::new(1)).await.is_some());

        cache.invalidate(ProductId::new(1)).await;
        assert!(cache.cache.get(&ProductId::new(1)).await.is_none());
    }
}
