use serde_json::{Map, Value};
use sqlx::FromRow;

use crate::models::review::Review;

/// Flat `{"name": "value"}` product specifications.
pub type Specifications = Map<String, Value>;

/// One offer: a product as sold by one retailer.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProductListing {
    pub product_id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub retailer_id: i64,
    pub retailer_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub initial_price: f64,
    pub final_price: f64,
    pub discount: i32,
    /// Average review score; `None` until the product has a review.
    pub rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub rows: Vec<ProductListing>,
    /// Matching rows before LIMIT/OFFSET.
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub listing: ProductListing,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub features: Vec<String>,
    pub specifications: Specifications,
    pub reviews: Vec<Review>,
    pub in_watchlist: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RetailPrice {
    pub retailer_id: i64,
    pub retailer_name: String,
    pub initial_price: f64,
    pub final_price: f64,
    pub discount: i32,
}

/// One retailer's price for a product being saved.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferInput {
    pub retailer_id: i64,
    pub initial_price: f64,
    pub final_price: f64,
}

impl OfferInput {
    pub fn discount(&self) -> i32 {
        offer_discount(self.initial_price, self.final_price)
    }
}

/// A product as written by `/Add/Product` and `/Update/Product`.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub features: Vec<String>,
    pub specifications: Specifications,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    /// `None` on update keeps the current offers; `Some` replaces them.
    pub offers: Option<Vec<OfferInput>>,
}

/// Whole-percent markdown from `initial` to `final_price`, clamped to 0..=100.
pub fn offer_discount(initial: f64, final_price: f64) -> i32 {
    if initial <= 0.0 {
        return 0;
    }
    (((initial - final_price) / initial) * 100.0).round().clamp(0.0, 100.0) as i32
}
