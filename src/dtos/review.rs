// src/dtos/review.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dtos::de::flexible_id;
use crate::models::review::Review;

#[derive(Debug, Deserialize)]
pub struct AddReviewRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub product_id: i64,
    pub user_name: String,
    pub score: i16,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            product_id: review.product_id,
            user_name: review.author,
            score: review.score,
            message: review.message,
            created_at: review.created_at,
        }
    }
}
