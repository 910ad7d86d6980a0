// src/handlers/watchlist.rs
use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::{info, instrument};

use crate::dtos::product::ProductResponse;
use crate::dtos::response::ApiResponse;
use crate::dtos::watchlist::WatchlistRequest;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_watchlist(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, AppError> {
    let rows = state.store.watchlist(auth.user_id).await?;
    let total = rows.len() as i64;
    let data = rows.into_iter().map(ProductResponse::from).collect();
    Ok(Json(ApiResponse::success(data).with_total(total)))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<WatchlistRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), AppError> {
    let product_id = payload.product_id.ok_or(AppError::MissingField("product_id"))?;
    let retailer_id = payload.retailer_id.ok_or(AppError::MissingField("retailer_id"))?;

    state
        .store
        .add_to_watchlist(auth.user_id, product_id, retailer_id)
        .await?;

    info!(product_id, retailer_id, "Added to watchlist");
    Ok((StatusCode::CREATED, Json(ApiResponse::message("Added to watchlist"))))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<WatchlistRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let product_id = payload.product_id.ok_or(AppError::MissingField("product_id"))?;

    let removed = state
        .store
        .remove_from_watchlist(auth.user_id, product_id, payload.retailer_id)
        .await?;
    if removed == 0 {
        return Err(AppError::not_found("Product is not in the watchlist"));
    }

    info!(product_id, removed, "Removed from watchlist");
    Ok(Json(ApiResponse::message("Removed from watchlist")))
}
