// src/dtos/product.rs
use serde::{Deserialize, Serialize};

use crate::dtos::de::flexible_id;
use crate::dtos::review::ReviewResponse;
use crate::error::{required, AppError};
use crate::models::product::{
    OfferInput, ProductDetail, ProductInput, ProductListing, RetailPrice, Specifications,
};
use crate::query::filter::ProductFilters;
use crate::query::ordering::{Page, Sort};
use crate::query::ProductQuery;

#[derive(Debug, Default, Deserialize)]
pub struct ProductsRequest {
    #[serde(default)]
    pub filters: Option<ProductFilters>,
    #[serde(default)]
    pub ordering: Option<Sort>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl ProductsRequest {
    pub fn into_query(self) -> Result<ProductQuery, AppError> {
        let filters = self.filters.unwrap_or_default();
        filters.validate()?;
        Ok(ProductQuery {
            filters,
            sort: self.ordering.unwrap_or_default(),
            page: Page::new(self.limit, self.offset)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductDetailRequest {
    #[serde(default)]
    pub apikey: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetailPricesRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub product_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RetailDetailRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub retailer_id: Option<i64>,
    #[serde(default)]
    pub initial_price: Option<f64>,
    /// Defaults to `initial_price` (no markdown).
    #[serde(default)]
    pub final_price: Option<f64>,
}

impl RetailDetailRequest {
    fn into_offer(self) -> Result<OfferInput, AppError> {
        let retailer_id = self.retailer_id.ok_or(AppError::MissingField("retailer_id"))?;
        let initial_price = self.initial_price.ok_or(AppError::MissingField("initial_price"))?;
        let final_price = self.final_price.unwrap_or(initial_price);

        if !initial_price.is_finite() || !final_price.is_finite() || final_price < 0.0 {
            return Err(AppError::validation("Prices must be non-negative numbers"));
        }
        if final_price > initial_price {
            return Err(AppError::validation("Final price exceeds initial price"));
        }
        Ok(OfferInput { retailer_id, initial_price, final_price })
    }
}

/// `/Add/Product` and `/Update/Product`; the latter carries `product_id`.
#[derive(Debug, Deserialize)]
pub struct SaveProductRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub brand_id: Option<i64>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub specifications: Option<Specifications>,
    #[serde(default)]
    pub retail_details: Option<Vec<RetailDetailRequest>>,
}

impl SaveProductRequest {
    /// `require_offers` is set for inserts, which must list at least one
    /// retailer. A present `retail_details` is never empty.
    pub fn into_input(self, require_offers: bool) -> Result<ProductInput, AppError> {
        let title = required(&self.title, "title")?.to_owned();

        let image_url = non_blank(self.image_url);
        let images = trimmed(self.images);
        if let Some(url) = image_url.iter().chain(&images).find(|url| !is_http_url(url)) {
            return Err(AppError::validation(format!("Invalid image URL: {url}")));
        }

        let offers = match self.retail_details {
            None if !require_offers => None,
            details => Some(offers(details)?),
        };

        Ok(ProductInput {
            title,
            description: non_blank(self.description),
            image_url,
            images,
            features: trimmed(self.features),
            specifications: self.specifications.unwrap_or_default(),
            brand_id: self.brand_id,
            category_id: self.category_id,
            offers,
        })
    }
}

fn offers(details: Option<Vec<RetailDetailRequest>>) -> Result<Vec<OfferInput>, AppError> {
    let details = details
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::validation("At least one retailer price is required"))?;

    let offers = details
        .into_iter()
        .map(RetailDetailRequest::into_offer)
        .collect::<Result<Vec<_>, _>>()?;
    for (i, offer) in offers.iter().enumerate() {
        if offers[..i].iter().any(|o| o.retailer_id == offer.retailer_id) {
            return Err(AppError::validation("Retailer listed more than once"));
        }
    }
    Ok(offers)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn trimmed(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| non_blank(Some(v)))
        .collect()
}

fn is_http_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

#[derive(Debug, Serialize)]
pub struct ProductSavedResponse {
    pub product_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub retailer_id: i64,
    pub retailer_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub initial_price: f64,
    pub final_price: f64,
    pub discount: i32,
    pub rating: Option<f64>,
    pub review_count: i64,
}

impl From<ProductListing> for ProductResponse {
    fn from(listing: ProductListing) -> Self {
        Self {
            id: listing.product_id,
            title: listing.title,
            image_url: listing.image_url,
            retailer_id: listing.retailer_id,
            retailer_name: listing.retailer_name,
            brand: listing.brand,
            category: listing.category,
            initial_price: listing.initial_price,
            final_price: listing.final_price,
            discount: listing.discount,
            rating: listing.rating,
            review_count: listing.review_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub description: Option<String>,
    /// `image_url` first, then the gallery images.
    pub images: Vec<String>,
    pub features: Vec<String>,
    pub specifications: Specifications,
    pub reviews: Vec<ReviewResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_watchlist: Option<bool>,
}

impl From<ProductDetail> for ProductDetailResponse {
    fn from(detail: ProductDetail) -> Self {
        let images = detail
            .listing
            .image_url
            .iter()
            .cloned()
            .chain(detail.images)
            .collect();
        Self {
            product: detail.listing.into(),
            description: detail.description,
            images,
            features: detail.features,
            specifications: detail.specifications,
            reviews: detail.reviews.into_iter().map(ReviewResponse::from).collect(),
            in_watchlist: detail.in_watchlist,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RetailPriceResponse {
    pub retailer_id: i64,
    pub retailer_name: String,
    pub initial_price: f64,
    pub final_price: f64,
    pub discount: i32,
}

impl From<RetailPrice> for RetailPriceResponse {
    fn from(price: RetailPrice) -> Self {
        Self {
            retailer_id: price.retailer_id,
            retailer_name: price.retailer_name,
            initial_price: price.initial_price,
            final_price: price.final_price,
            discount: price.discount,
        }
    }
}
