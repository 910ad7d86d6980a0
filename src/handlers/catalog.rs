// src/handlers/catalog.rs
use axum::{extract::State, Json};
use tracing::instrument;

use crate::dtos::catalog::{CatalogSearchRequest, NamedEntityResponse};
use crate::dtos::response::ApiResponse;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::models::catalog::Catalog;
use crate::state::AppState;

type CatalogResult = Result<Json<ApiResponse<Vec<NamedEntityResponse>>>, AppError>;

async fn list(state: &AppState, catalog: Catalog, payload: CatalogSearchRequest) -> CatalogResult {
    let rows = state
        .store
        .list_catalog(catalog, payload.search.as_deref())
        .await?;
    let total = rows.len() as i64;
    let data = rows.into_iter().map(NamedEntityResponse::from).collect();
    Ok(Json(ApiResponse::success(data).with_total(total)))
}

#[instrument(skip(state))]
pub async fn get_brands(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CatalogSearchRequest>,
) -> CatalogResult {
    list(&state, Catalog::Brands, payload).await
}

#[instrument(skip(state))]
pub async fn get_retailers(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CatalogSearchRequest>,
) -> CatalogResult {
    list(&state, Catalog::Retailers, payload).await
}

#[instrument(skip(state))]
pub async fn get_categories(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CatalogSearchRequest>,
) -> CatalogResult {
    list(&state, Catalog::Categories, payload).await
}
