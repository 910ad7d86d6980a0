//! Data access.
//!
//! Every operation runs on a single pooled connection, acquired at the
//! start of the call and released when it returns, whichever path it
//! takes.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::catalog::{Catalog, NamedEntity};
use crate::models::product::{ProductDetail, ProductInput, ProductListing, ProductPage, RetailPrice};
use crate::models::review::{NewReview, Review};
use crate::models::user::{NewUser, User};
use crate::query::ProductQuery;

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, AppError>;

    /// `viewer` fills in `in_watchlist` when present.
    async fn product_detail(
        &self,
        product_id: i64,
        retailer_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<ProductDetail>, AppError>;

    /// Every offer of the product, cheapest first. `None` for an unknown product.
    async fn retail_prices(&self, product_id: i64) -> Result<Option<Vec<RetailPrice>>, AppError>;

    async fn list_catalog(
        &self,
        catalog: Catalog,
        search: Option<&str>,
    ) -> Result<Vec<NamedEntity>, AppError>;

    /// `Conflict` when the name is taken.
    async fn create_catalog(&self, catalog: Catalog, name: &str) -> Result<NamedEntity, AppError>;

    /// `None` for an unknown id; `Conflict` when the name is taken.
    async fn update_catalog(
        &self,
        catalog: Catalog,
        id: i64,
        name: &str,
    ) -> Result<Option<NamedEntity>, AppError>;

    async fn remove_catalog(&self, catalog: Catalog, id: i64) -> Result<bool, AppError>;

    /// Inserts the product and its offers together. `NotFound` when a
    /// referenced brand, category or retailer does not exist.
    async fn create_product(&self, product: ProductInput) -> Result<i64, AppError>;

    /// `false` for an unknown product; otherwise as [`Store::create_product`].
    async fn update_product(&self, product_id: i64, product: ProductInput) -> Result<bool, AppError>;

    async fn remove_product(&self, product_id: i64) -> Result<bool, AppError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn user_by_api_key(&self, api_key: &str) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the email is taken; nothing is inserted then.
    /// A clashing `api_key` is replaced with a fresh one.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn update_email(&self, user_id: i64, email: &str) -> Result<(), AppError>;

    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), AppError>;

    async fn delete_user(&self, user_id: i64) -> Result<bool, AppError>;

    async fn watchlist(&self, user_id: i64) -> Result<Vec<ProductListing>, AppError>;

    /// `NotFound` for an unknown offer, `Conflict` when already saved.
    async fn add_to_watchlist(
        &self,
        user_id: i64,
        product_id: i64,
        retailer_id: i64,
    ) -> Result<(), AppError>;

    /// Without `retailer_id`, removes every saved offer of the product.
    async fn remove_from_watchlist(
        &self,
        user_id: i64,
        product_id: i64,
        retailer_id: Option<i64>,
    ) -> Result<u64, AppError>;

    /// `NotFound` for an unknown product.
    async fn add_review(&self, review: NewReview) -> Result<Review, AppError>;
}
