use axum::{routing::post, Router};
use crate::handlers::product::{get_product, get_products, get_retail_prices};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/Get/Products", post(get_products))
        .route("/Get/Product/{product_id}/{retailer_id}", post(get_product))
        .route("/Get/RetailPrices", post(get_retail_prices))
}
