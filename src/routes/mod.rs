pub mod admin;
pub mod catalog;
pub mod products;
pub mod users;
pub mod watchlist;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::content_type::require_json;
use crate::state::AppState;

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(products::routes())
        .merge(catalog::routes())
        .merge(users::routes(state.clone()))
        .merge(watchlist::routes(state.clone()))
        .merge(admin::routes(state.clone()))
}

/// The JSON gate wraps every API route; `/health` is added after it so
/// health checks can call it without a body.
pub fn create_app(state: AppState, cors: CorsLayer) -> Router {
    let api = create_router(&state).layer(middleware::from_fn(require_json));

    Router::new()
        .merge(api)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
