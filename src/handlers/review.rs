// src/handlers/review.rs
use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::{info, instrument};

use crate::dtos::response::ApiResponse;
use crate::dtos::review::{AddReviewRequest, ReviewResponse};
use crate::error::{required, AppError};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthContext;
use crate::models::review::NewReview;
use crate::state::AppState;

pub const MAX_MESSAGE_LEN: usize = 2000;

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id, product_id = ?payload.product_id))]
pub async fn add_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<AddReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), AppError> {
    let product_id = payload.product_id.ok_or(AppError::MissingField("product_id"))?;
    let score = payload.score.ok_or(AppError::MissingField("score"))?;
    let message = required(&payload.message, "message")
        .map_err(|_| AppError::validation("Review message must not be empty"))?;

    let score = i16::try_from(score)
        .ok()
        .filter(|s| (1..=5).contains(s))
        .ok_or_else(|| AppError::validation("Score must be between 1 and 5"))?;
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::validation(format!(
            "Review message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }

    let review = state
        .store
        .add_review(NewReview {
            product_id,
            user_id: auth.user_id,
            score,
            message: message.to_owned(),
        })
        .await?;

    info!(review_id = review.id, "Review added");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(review.into()))))
}
