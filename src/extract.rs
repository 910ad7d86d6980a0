// src/extract.rs
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Json<T>` whose rejections use the API's error envelope: wrong content
/// type is 415, unparsable JSON 400, and a well-formed body of the wrong
/// shape 422.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(match rejection {
                JsonRejection::MissingJsonContentType(_) => AppError::UnsupportedMediaType,
                JsonRejection::JsonDataError(e) => AppError::validation(e.body_text()),
                JsonRejection::JsonSyntaxError(e) => AppError::bad_request(e.body_text()),
                other => AppError::bad_request(other.body_text()),
            }),
        }
    }
}
