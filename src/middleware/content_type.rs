// src/middleware/content_type.rs
use axum::{extract::Request, middleware::Next, response::Response};
use http::{header::CONTENT_TYPE, HeaderMap};

use crate::error::AppError;

/// Every API request must declare a JSON body.
pub async fn require_json(req: Request, next: Next) -> Result<Response, AppError> {
    if !is_json(req.headers()) {
        return Err(AppError::UnsupportedMediaType);
    }
    Ok(next.run(req).await)
}

/// `application/json`, optionally with parameters such as `charset`.
pub fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
