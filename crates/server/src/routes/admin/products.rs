//! Catalog management.
//!
//! Create and update take `multipart/form-data`: text fields plus optional
//! `thumbnailImage` and `detailImage` files. An image part may also be a
//! plain text URL of an earlier upload.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use onandhome_core::{ProductId, ProductStatus, Won};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::ApiResponse;
use crate::models::product::{Product, ProductInput};
use crate::services::BulkResult;
use crate::services::catalog::CatalogService;
use crate::services::uploads::UploadStore;
use crate::state::AppState;

const THUMBNAIL_FIELD: &str = "thumbnailImage";
const DETAIL_FIELD: &str = "detailImage";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub kw: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDelete {
    pub ids: Vec<ProductId>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: ProductStatus,
}

/// Text fields and stored image URLs read from a product form.
#[derive(Debug, Default)]
struct ProductForm {
    fields: HashMap<String, String>,
    thumbnail_image: Option<String>,
    detail_image: Option<String>,
    /// Files written while reading this form.
    stored: Vec<String>,
}

impl ProductForm {
    /// Drain a multipart body, storing image files as they arrive.
    ///
    /// Files already written are removed again if the body turns out bad.
    async fn read(multipart: Multipart, uploads: &UploadStore) -> Result<Self> {
        let mut form = Self::default();
        let filled = form.fill(multipart, uploads).await;
        form.settle(filled, uploads).await?;
        Ok(form)
    }

    async fn fill(&mut self, mut multipart: Multipart, uploads: &UploadStore) -> Result<()> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("잘못된 요청 형식입니다: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(String::from);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("요청 본문을 읽을 수 없습니다: {e}")))?;

            if name != THUMBNAIL_FIELD && name != DETAIL_FIELD {
                self.fields
                    .insert(name, String::from_utf8_lossy(&bytes).into_owned());
                continue;
            }

            let url = match file_name {
                Some(file_name) if !bytes.is_empty() => {
                    let url = uploads.save(&file_name, &bytes).await?;
                    self.stored.push(url.clone());
                    Some(url)
                }
                Some(_) => None,
                None => Some(String::from_utf8_lossy(&bytes).trim().to_string())
                    .filter(|url| !url.is_empty()),
            };
            if name == THUMBNAIL_FIELD {
                self.thumbnail_image = url;
            } else {
                self.detail_image = url;
            }
        }
        Ok(())
    }

    /// Pass `result` through, deleting the files this form wrote when it failed.
    async fn settle<T>(&self, result: Result<T>, uploads: &UploadStore) -> Result<T> {
        if result.is_err() {
            for url in &self.stored {
                if let Err(e) = uploads.delete(url).await {
                    tracing::warn!(error = %e, file = %url, "Failed to remove rejected upload");
                }
            }
        }
        result
    }

    fn text(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(String::from)
    }

    fn number<T: std::str::FromStr>(&self, key: &str, label: &str) -> Result<Option<T>> {
        self.text(key)
            .map(|value| {
                value
                    .replace(',', "")
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("{label} 값이 올바르지 않습니다.")))
            })
            .transpose()
    }

    /// Build the input, taking the status from `fallback` when the form omits it.
    fn to_input(&self, fallback: ProductStatus) -> Result<ProductInput> {
        let price = self
            .number::<i64>("price", "가격")?
            .ok_or_else(|| AppError::BadRequest("가격을 입력해주세요.".to_string()))?;
        let status = self
            .text("status")
            .map(|value| value.parse::<ProductStatus>())
            .transpose()
            .map_err(AppError::BadRequest)?
            .unwrap_or(fallback);

        Ok(ProductInput {
            name: self.text("name").unwrap_or_default(),
            product_code: self.text("productCode"),
            description: self.text("description"),
            price: Won::new(price),
            sale_price: self.number::<i64>("salePrice", "할인가")?.map(Won::new),
            stock: self.number("stock", "재고")?.unwrap_or_default(),
            category: self.text("category"),
            manufacturer: self.text("manufacturer"),
            country: self.text("country"),
            status,
            thumbnail_image: self.thumbnail_image.clone(),
            detail_image: self.detail_image.clone(),
        })
    }
}

/// Every product in a category matching a keyword, sold out included.
///
/// GET /api/admin/products?category=&kw=
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = CatalogService::new(state.pool(), state.products())
        .list(query.category.as_deref(), query.kw.as_deref(), false)
        .await?;
    Ok(Json(products))
}

/// GET /api/admin/products/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.pool(), state.products())
        .get(id)
        .await?;
    Ok(Json(product))
}

/// POST /api/admin/products
#[instrument(skip(state, admin, multipart), fields(admin = %admin.login_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Product>>> {
    let form = ProductForm::read(multipart, state.uploads()).await?;
    let catalog = CatalogService::new(state.pool(), state.products());
    let created = match form.to_input(ProductStatus::default()) {
        Ok(input) => catalog.create(input).await.map_err(AppError::from),
        Err(e) => Err(e),
    };
    let product = form.settle(created, state.uploads()).await?;
    Ok(Json(ApiResponse::ok("상품이 등록되었습니다.", product)))
}

/// Replace a product's fields. Images not sent are kept.
///
/// PUT /api/admin/products/{id}
#[instrument(skip(state, admin, multipart), fields(admin = %admin.login_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Product>>> {
    let catalog = CatalogService::new(state.pool(), state.products());
    let current = catalog.get(id).await?;
    let form = ProductForm::read(multipart, state.uploads()).await?;
    let updated = match form.to_input(current.status) {
        Ok(input) => catalog.update(id, input).await.map_err(AppError::from),
        Err(e) => Err(e),
    };
    let product = form.settle(updated, state.uploads()).await?;
    Ok(Json(ApiResponse::ok("상품이 수정되었습니다.", product)))
}

/// PATCH /api/admin/products/{id}/status
#[instrument(skip(state, admin, change), fields(admin = %admin.login_id, status = %change.status))]
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = CatalogService::new(state.pool(), state.products())
        .set_status(id, change.status)
        .await?;
    Ok(Json(ApiResponse::ok("판매 상태가 변경되었습니다.", product)))
}

/// DELETE /api/admin/products/{id}
#[instrument(skip(state, admin), fields(admin = %admin.login_id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiResponse<()>>> {
    CatalogService::new(state.pool(), state.products())
        .delete(id)
        .await?;
    Ok(Json(ApiResponse::message("상품이 삭제되었습니다.")))
}

/// Delete several products. Failures are counted, not fatal.
///
/// POST /api/admin/products/delete
#[instrument(skip(state, admin, request), fields(admin = %admin.login_id, count = request.ids.len()))]
pub async fn delete_many(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<BulkDelete>,
) -> Result<Json<ApiResponse<BulkResult>>> {
    let result = CatalogService::new(state.pool(), state.products())
        .delete_many(&request.ids)
        .await;
    Ok(Json(ApiResponse::ok(
        format!("{}개 삭제, {}개 실패", result.success_count, result.fail_count),
        result,
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> ProductForm {
        ProductForm {
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_form_parses_numbers_and_status() {
        let input = form(&[
            ("name", " 양문형 냉장고 "),
            ("price", "1,290,000"),
            ("salePrice", "990000"),
            ("stock", "7"),
            ("status", "품절"),
            ("category", ""),
        ])
        .to_input(ProductStatus::OnSale)
        .unwrap();

        assert_eq!(input.name, "양문형 냉장고");
        assert_eq!(input.price, Won::new(1_290_000));
        assert_eq!(input.sale_price, Some(Won::new(990_000)));
        assert_eq!(input.stock, 7);
        assert_eq!(input.status, ProductStatus::SoldOut);
        assert_eq!(input.category, None);
    }

    #[test]
    fn test_missing_status_uses_fallback() {
        let input = form(&[("name", "TV"), ("price", "100")])
            .to_input(ProductStatus::Suspended)
            .unwrap();
        assert_eq!(input.status, ProductStatus::Suspended);
        assert_eq!(input.stock, 0);
        assert_eq!(input.thumbnail_image, None);
    }

    #[test]
    fn test_bad_numbers_rejected() {
        assert!(matches!(
            form(&[("name", "TV")]).to_input(ProductStatus::OnSale),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            form(&[("name", "TV"), ("price", "abc")]).to_input(ProductStatus::OnSale),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            form(&[("name", "TV"), ("price", "1"), ("status", "unknown")])
                .to_input(ProductStatus::OnSale),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_form_removes_stored_images() {
        let dir = std::env::temp_dir().join(format!("onandhome-form-{}", uuid::Uuid::new_v4()));
        let uploads = UploadStore::new(&dir);
        let url = uploads.save("front.png", b"\x89PNG").await.unwrap();

        let mut rejected = form(&[("name", "TV"), ("price", "abc")]);
        rejected.thumbnail_image = Some(url.clone());
        rejected.stored.push(url.clone());

        let outcome = rejected
            .settle(rejected.to_input(ProductStatus::OnSale), &uploads)
            .await;
        assert!(matches!(outcome, Err(AppError::BadRequest(_))));
        assert!(matches!(
            uploads.delete(&url).await,
            Err(crate::services::ServiceError::NotFound(_))
        ));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_accepted_form_keeps_stored_images() {
        let dir = std::env::temp_dir().join(format!("onandhome-form-{}", uuid::Uuid::new_v4()));
        let uploads = UploadStore::new(&dir);
        let url = uploads.save("front.png", b"\x89PNG").await.unwrap();

        let mut accepted = form(&[("name", "TV"), ("price", "100")]);
        accepted.thumbnail_image = Some(url.clone());
        accepted.stored.push(url.clone());

        let input = accepted
            .settle(accepted.to_input(ProductStatus::OnSale), &uploads)
            .await
            .unwrap();
        assert_eq!(input.thumbnail_image.as_deref(), Some(url.as_str()));
        uploads.delete(&url).await.unwrap();

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
