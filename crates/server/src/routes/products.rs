//! Public catalog routes.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use onandhome_core::ProductId;
use onandhome_core::catalog::CategoryGroup;

use crate::error::Result;
use crate::models::product::{Product, ProductDetail};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub kw: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
}

/// Products filtered by category (parent key or sub-category) and keyword.
///
/// GET /api/products/list?category=&kw=
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = CatalogService::new(state.pool(), state.products())
        .list(query.category.as_deref(), query.kw.as_deref(), false)
        .await?;
    Ok(Json(products))
}

/// Product detail with rating statistics.
///
/// GET /api/products/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Arc<ProductDetail>>> {
    let detail = CatalogService::new(state.pool(), state.products())
        .detail(id)
        .await?;
    Ok(Json(detail))
}

/// In-stock products matching a keyword.
///
/// GET /api/products/search?keyword=
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = CatalogService::new(state.pool(), state.products())
        .list(None, query.keyword.as_deref(), true)
        .await?;
    Ok(Json(products))
}

/// In-stock products of one category.
///
/// GET /api/products/category/{category}
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Product>>> {
    let products = CatalogService::new(state.pool(), state.products())
        .list(Some(&category), None, true)
        .await?;
    Ok(Json(products))
}

/// The category tree.
///
/// GET /api/products/categories
pub async fn categories() -> Json<&'static [CategoryGroup]> {
    Json(CatalogService::categories())
}
