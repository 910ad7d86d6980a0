//! Allow-listed ORDER BY and bounded LIMIT/OFFSET for listings.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use crate::error::AppError;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 500;

/// Sortable fields. Anything outside this enum fails deserialization, so
/// the client never supplies SQL text for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[serde(alias = "final_price")]
    Price,
    Title,
    Rating,
    Discount,
    #[serde(alias = "id")]
    Newest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// The request's `ordering` object. `{}` means default ordering; a `null`
/// field or order is the same as leaving it out.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Sort {
    #[serde(default)]
    pub field: Option<SortField>,
    #[serde(default)]
    pub order: Option<SortDirection>,
}

impl Sort {
    pub fn direction(self) -> SortDirection {
        self.order.unwrap_or_default()
    }
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::Price => "pr.final_price",
            SortField::Title => "p.title",
            SortField::Rating => "COALESCE(rs.rating, 0)",
            SortField::Discount => "pr.discount",
            SortField::Newest => "p.id",
        }
    }
}

impl SortDirection {
    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Appends ORDER BY with a stable `(product, retailer)` tie-breaker.
pub fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, sort: Sort) {
    qb.push(" ORDER BY ");
    if let Some(field) = sort.field {
        qb.push(field.column()).push(" ").push(sort.direction().keyword()).push(", ");
    }
    qb.push("p.id ASC, r.id ASC");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Result<Self, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(Self { limit, offset: offset.unwrap_or(0) })
    }

    pub fn push_limit(self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" LIMIT ")
            .push_bind(i64::from(self.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(self.offset));
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, offset: 0 }
    }
}
