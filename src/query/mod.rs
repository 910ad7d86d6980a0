//! SQL composition for product listings.

pub mod filter;
pub mod ordering;

use sqlx::{Postgres, QueryBuilder};

use self::filter::ProductFilters;
use self::ordering::{push_order_by, Page, Sort};

/// Columns of [`crate::models::product::ProductListing`].
pub const LISTING_COLUMNS: &str = "SELECT p.id AS product_id, p.title, p.image_url, \
    r.id AS retailer_id, r.name AS retailer_name, \
    b.name AS brand, c.name AS category, \
    pr.initial_price, pr.final_price, pr.discount, \
    rs.rating, COALESCE(rs.review_count, 0) AS review_count";

/// One row per offer, with brand, category and review aggregates joined in.
pub const LISTING_FROM: &str = " FROM product_retailers pr \
    JOIN products p ON p.id = pr.product_id \
    JOIN retailers r ON r.id = pr.retailer_id \
    LEFT JOIN brands b ON b.id = p.brand_id \
    LEFT JOIN categories c ON c.id = p.category_id \
    LEFT JOIN (SELECT product_id, AVG(score)::FLOAT8 AS rating, COUNT(*) AS review_count \
               FROM reviews GROUP BY product_id) rs ON rs.product_id = p.id";

/// A validated `/Get/Products` request.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub filters: ProductFilters,
    pub sort: Sort,
    pub page: Page,
}

impl ProductQuery {
    /// Full listing query. `total` is the window count of matching rows
    /// before LIMIT/OFFSET are applied.
    pub fn build(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(LISTING_COLUMNS);
        qb.push(", COUNT(*) OVER () AS total");
        qb.push(LISTING_FROM);
        self.filters.push_where(&mut qb);
        push_order_by(&mut qb, self.sort);
        self.page.push_limit(&mut qb);
        qb
    }
}
