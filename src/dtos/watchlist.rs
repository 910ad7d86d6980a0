// src/dtos/watchlist.rs
use serde::Deserialize;

use crate::dtos::de::flexible_id;

#[derive(Debug, Deserialize)]
pub struct WatchlistRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub product_id: Option<i64>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub retailer_id: Option<i64>,
}
