use axum::{routing::post, Router};
use crate::handlers::catalog::{get_brands, get_categories, get_retailers};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/Get/Brands", post(get_brands))
        .route("/Get/Retailers", post(get_retailers))
        .route("/Get/Categories", post(get_categories))
}
