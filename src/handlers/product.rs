// src/handlers/product.rs
use axum::{
    extract::{Path, State},
    Json,
};
use http::HeaderMap;
use tracing::{debug, instrument};

use crate::dtos::product::{
    ProductDetailRequest, ProductDetailResponse, ProductResponse, ProductsRequest,
    RetailPriceResponse, RetailPricesRequest,
};
use crate::dtos::response::ApiResponse;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::auth::{bearer_token, resolve_api_key};
use crate::state::AppState;

fn parse_id(raw: &str, name: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("{name} must be an integer")))
}

// POST /Get/Products - filtered, ordered, paged listing
#[instrument(skip(state, payload))]
pub async fn get_products(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ProductsRequest>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, AppError> {
    let query = payload.into_query()?;
    debug!(?query, "Listing products");

    let page = state.store.list_products(&query).await?;
    let data = page.rows.into_iter().map(ProductResponse::from).collect();

    Ok(Json(ApiResponse::success(data).with_total(page.total)))
}

// POST /Get/Product/{productID}/{retailerID} - one offer with reviews
#[instrument(skip(state, headers, payload))]
pub async fn get_product(
    State(state): State<AppState>,
    Path((product_id, retailer_id)): Path<(String, String)>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ProductDetailRequest>,
) -> Result<Json<ApiResponse<ProductDetailResponse>>, AppError> {
    let product_id = parse_id(&product_id, "productID")?;
    let retailer_id = parse_id(&retailer_id, "retailerID")?;

    let api_key = payload
        .apikey
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| bearer_token(&headers));
    let viewer = match api_key {
        Some(key) => Some(resolve_api_key(&state, key).await?.id),
        None => None,
    };

    let detail = state
        .store
        .product_detail(product_id, retailer_id, viewer)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ApiResponse::success(detail.into())))
}

// POST /Get/RetailPrices - every retailer's price for a product
#[instrument(skip(state))]
pub async fn get_retail_prices(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RetailPricesRequest>,
) -> Result<Json<ApiResponse<Vec<RetailPriceResponse>>>, AppError> {
    let product_id = payload.product_id.ok_or(AppError::MissingField("product_id"))?;

    let prices = state
        .store
        .retail_prices(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ApiResponse::success(
        prices.into_iter().map(RetailPriceResponse::from).collect(),
    )))
}
