// src/middleware/auth.rs
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::{header::AUTHORIZATION, HeaderMap};

use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
    pub email: String,
    pub password_hash: String,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<User> for AuthContext {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            email: user.email,
            password_hash: user.password_hash,
        }
    }
}

/// Resolves `Authorization: Bearer <api key>` to the owning user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = bearer_token(req.headers())
        .ok_or_else(|| AppError::unauthorized("Missing or malformed Authorization header"))?
        .to_owned();

    let user = resolve_api_key(&state, &api_key).await?;
    req.extensions_mut().insert(AuthContext::from(user));

    Ok(next.run(req).await)
}

pub async fn resolve_api_key(state: &AppState, api_key: &str) -> Result<User, AppError> {
    state
        .store
        .user_by_api_key(api_key)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid API key"))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
