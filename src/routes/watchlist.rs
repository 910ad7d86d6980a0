use axum::{middleware, routing::post, Router};
use crate::handlers::review::add_review;
use crate::handlers::watchlist::{add_to_watchlist, get_watchlist, remove_from_watchlist};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/Get/Watchlist", post(get_watchlist))
        .route("/Add/Watchlist", post(add_to_watchlist))
        .route("/Remove/Watchlist", post(remove_from_watchlist))
        .route("/Add/Review", post(add_review))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
