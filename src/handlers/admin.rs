// src/handlers/admin.rs
use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::{info, instrument, warn};

use crate::dtos::catalog::{
    NamedEntityResponse, RemoveCatalogRequest, RemoveProductRequest, SaveCatalogRequest,
};
use crate::dtos::product::{ProductSavedResponse, SaveProductRequest};
use crate::dtos::response::ApiResponse;
use crate::error::{required, AppError};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthContext;
use crate::models::catalog::Catalog;
use crate::state::AppState;

fn ensure_admin(auth: &AuthContext) -> Result<(), AppError> {
    if !auth.is_admin() {
        warn!(user_id = auth.user_id, "Non-admin attempted an admin operation");
        return Err(AppError::forbidden("Admin role required"));
    }
    Ok(())
}

type Created<T> = (StatusCode, Json<ApiResponse<T>>);

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn add_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<SaveProductRequest>,
) -> Result<Created<ProductSavedResponse>, AppError> {
    ensure_admin(&auth)?;
    let product = payload.into_input(true)?;

    let product_id = state.store.create_product(product).await?;

    info!(product_id, "Product added");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ProductSavedResponse { product_id }).with_message("Product added")),
    ))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id, product_id = ?payload.product_id))]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<SaveProductRequest>,
) -> Result<Json<ApiResponse<ProductSavedResponse>>, AppError> {
    ensure_admin(&auth)?;
    let product_id = payload.product_id.ok_or(AppError::MissingField("product_id"))?;
    let product = payload.into_input(false)?;

    if !state.store.update_product(product_id, product).await? {
        return Err(AppError::not_found("Product not found"));
    }

    info!(product_id, "Product updated");
    Ok(Json(
        ApiResponse::success(ProductSavedResponse { product_id }).with_message("Product updated"),
    ))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn remove_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<RemoveProductRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    ensure_admin(&auth)?;
    let product_id = payload.product_id.ok_or(AppError::MissingField("product_id"))?;

    if !state.store.remove_product(product_id).await? {
        return Err(AppError::not_found("Product not found"));
    }

    info!(product_id, "Product removed");
    Ok(Json(ApiResponse::message("Product removed")))
}

async fn add_named(
    state: &AppState,
    auth: &AuthContext,
    catalog: Catalog,
    payload: SaveCatalogRequest,
) -> Result<Created<NamedEntityResponse>, AppError> {
    ensure_admin(auth)?;
    let name = required(&payload.name, "name")?;

    let entity = state.store.create_catalog(catalog, name).await?;

    info!(id = entity.id, catalog = catalog.table(), "Catalog entry added");
    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::success(NamedEntityResponse::from(entity))
                .with_message(format!("{} added", catalog.singular())),
        ),
    ))
}

async fn update_named(
    state: &AppState,
    auth: &AuthContext,
    catalog: Catalog,
    payload: SaveCatalogRequest,
) -> Result<Json<ApiResponse<NamedEntityResponse>>, AppError> {
    ensure_admin(auth)?;
    let id = payload.id.ok_or(AppError::MissingField("id"))?;
    let name = required(&payload.name, "name")?;

    let entity = state
        .store
        .update_catalog(catalog, id, name)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", catalog.singular())))?;

    info!(id, catalog = catalog.table(), "Catalog entry renamed");
    Ok(Json(
        ApiResponse::success(NamedEntityResponse::from(entity))
            .with_message(format!("{} updated", catalog.singular())),
    ))
}

async fn remove_named(
    state: &AppState,
    auth: &AuthContext,
    catalog: Catalog,
    payload: RemoveCatalogRequest,
) -> Result<Json<ApiResponse<()>>, AppError> {
    ensure_admin(auth)?;
    let id = payload.id.ok_or(AppError::MissingField("id"))?;

    if !state.store.remove_catalog(catalog, id).await? {
        return Err(AppError::not_found(format!("{} not found", catalog.singular())));
    }

    info!(id, catalog = catalog.table(), "Catalog entry removed");
    Ok(Json(ApiResponse::message(format!("{} removed", catalog.singular()))))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn add_brand(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<SaveCatalogRequest>,
) -> Result<Created<NamedEntityResponse>, AppError> {
    add_named(&state, &auth, Catalog::Brands, payload).await
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn update_brand(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<SaveCatalogRequest>,
) -> Result<Json<ApiResponse<NamedEntityResponse>>, AppError> {
    update_named(&state, &auth, Catalog::Brands, payload).await
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn add_retailer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<SaveCatalogRequest>,
) -> Result<Created<NamedEntityResponse>, AppError> {
    add_named(&state, &auth, Catalog::Retailers, payload).await
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn update_retailer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<SaveCatalogRequest>,
) -> Result<Json<ApiResponse<NamedEntityResponse>>, AppError> {
    update_named(&state, &auth, Catalog::Retailers, payload).await
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn add_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<SaveCatalogRequest>,
) -> Result<Created<NamedEntityResponse>, AppError> {
    add_named(&state, &auth, Catalog::Categories, payload).await
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn update_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<SaveCatalogRequest>,
) -> Result<Json<ApiResponse<NamedEntityResponse>>, AppError> {
    update_named(&state, &auth, Catalog::Categories, payload).await
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn remove_brand(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<RemoveCatalogRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    remove_named(&state, &auth, Catalog::Brands, payload).await
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn remove_retailer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<RemoveCatalogRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    remove_named(&state, &auth, Catalog::Retailers, payload).await
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn remove_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<RemoveCatalogRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    remove_named(&state, &auth, Catalog::Categories, payload).await
}
