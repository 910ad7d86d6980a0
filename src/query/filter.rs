//! Product listing filters.
//!
//! Each filter key becomes one [`Predicate`]; predicates are joined with
//! `AND` and every user-supplied value is pushed as a bind parameter.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use crate::error::AppError;

pub const MAX_RATING: f64 = 5.0;

/// `[min, max]`; either side may be `null` (the browser sends `Infinity`
/// as `null`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct PriceRange(pub Option<f64>, pub Option<f64>);

/// The client's filter object. Unknown keys are ignored; absent, `null`,
/// empty-list and blank-search keys impose no constraint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilters {
    #[serde(default)]
    pub brands: Option<Vec<String>>,
    #[serde(default)]
    pub departments: Option<Vec<String>>,
    #[serde(default)]
    pub retailers: Option<Vec<String>>,
    #[serde(default)]
    pub prices: Option<PriceRange>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    BrandIn(Vec<String>),
    CategoryIn(Vec<String>),
    RetailerIn(Vec<String>),
    MinPrice(f64),
    MaxPrice(f64),
    MinRating(f64),
    /// Raw search text; wildcard escaping happens when the SQL is built.
    TitleContains(String),
}

impl ProductFilters {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(PriceRange(min, max)) = self.prices {
            for bound in [min, max].into_iter().flatten() {
                if !bound.is_finite() || bound < 0.0 {
                    return Err(AppError::validation("Price bounds must be non-negative numbers"));
                }
            }
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(AppError::validation("Minimum price exceeds maximum price"));
                }
            }
        }

        if let Some(rating) = self.rating {
            if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
                return Err(AppError::validation("Rating must be between 0 and 5"));
            }
        }

        Ok(())
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();

        if let Some(names) = non_empty(&self.brands) {
            out.push(Predicate::BrandIn(names));
        }
        if let Some(names) = non_empty(&self.departments) {
            out.push(Predicate::CategoryIn(names));
        }
        if let Some(names) = non_empty(&self.retailers) {
            out.push(Predicate::RetailerIn(names));
        }
        if let Some(PriceRange(min, max)) = self.prices {
            if let Some(min) = min {
                out.push(Predicate::MinPrice(min));
            }
            if let Some(max) = max {
                out.push(Predicate::MaxPrice(max));
            }
        }
        if let Some(rating) = self.rating {
            out.push(Predicate::MinRating(rating));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            out.push(Predicate::TitleContains(term.to_string()));
        }

        out
    }

    /// Appends ` WHERE ... AND ...`, or nothing when no predicate applies.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (i, predicate) in self.predicates().into_iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(qb);
        }
    }
}

impl Predicate {
    fn push_sql(self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::BrandIn(names) => {
                qb.push("b.name = ANY(").push_bind(names).push(")");
            }
            Predicate::CategoryIn(names) => {
                qb.push("c.name = ANY(").push_bind(names).push(")");
            }
            Predicate::RetailerIn(names) => {
                qb.push("r.name = ANY(").push_bind(names).push(")");
            }
            Predicate::MinPrice(min) => {
                qb.push("pr.final_price >= ").push_bind(min);
            }
            Predicate::MaxPrice(max) => {
                qb.push("pr.final_price <= ").push_bind(max);
            }
            Predicate::MinRating(rating) => {
                qb.push("COALESCE(rs.rating, 0) >= ").push_bind(rating);
            }
            Predicate::TitleContains(term) => {
                qb.push("p.title ILIKE ").push_bind(contains_pattern(&term));
            }
        }
    }
}

/// Drops blank entries; an empty result means "no constraint".
fn non_empty(values: &Option<Vec<String>>) -> Option<Vec<String>> {
    let names: Vec<String> = values
        .as_deref()?
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect();
    (!names.is_empty()).then_some(names)
}

/// `%term%` with LIKE metacharacters in `term` escaped (backslash is
/// Postgres' default LIKE escape).
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
