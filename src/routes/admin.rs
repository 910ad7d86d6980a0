use axum::{middleware, routing::post, Router};
use crate::handlers::admin::{
    add_brand, add_category, add_product, add_retailer, remove_brand, remove_category,
    remove_product, remove_retailer, update_brand, update_category, update_product,
    update_retailer,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

// Role is checked in the handlers; the layer only resolves the caller.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/Add/Product", post(add_product))
        .route("/Update/Product", post(update_product))
        .route("/Remove/Product", post(remove_product))
        .route("/Add/Brand", post(add_brand))
        .route("/Update/Brand", post(update_brand))
        .route("/Remove/Brand", post(remove_brand))
        .route("/Add/Retailer", post(add_retailer))
        .route("/Update/Retailer", post(update_retailer))
        .route("/Remove/Retailer", post(remove_retailer))
        .route("/Add/Category", post(add_category))
        .route("/Update/Category", post(update_category))
        .route("/Remove/Category", post(remove_category))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
