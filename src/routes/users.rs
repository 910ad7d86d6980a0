use axum::{middleware, routing::post, Router};
use crate::handlers::user::{login_user, register_user, remove_user, update_email, update_password};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/User/Register", post(register_user))
        .route("/User/Login", post(login_user));

    let protected = Router::new()
        .route("/Update/User/Email", post(update_email))
        .route("/Update/User/Password", post(update_password))
        .route("/Remove/User", post(remove_user))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    open.merge(protected)
}
