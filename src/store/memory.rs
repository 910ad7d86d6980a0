//! In-memory [`Store`] for router tests. Mirrors the SQL semantics of
//! `PgStore`, including filter predicates and sort order.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::catalog::{Catalog, NamedEntity};
use crate::auth::credentials::generate_api_key;
use crate::models::product::{
    offer_discount, OfferInput, ProductDetail, ProductInput, ProductListing, ProductPage, RetailPrice,
    Specifications,
};
use crate::models::review::{NewReview, Review};
use crate::models::user::{NewUser, User};
use crate::query::filter::Predicate;
use crate::query::ordering::{SortDirection, SortField};
use crate::query::ProductQuery;
use crate::store::Store;

#[derive(Debug, Clone)]
struct ProductRecord {
    id: i64,
    title: String,
    description: Option<String>,
    image_url: Option<String>,
    images: Vec<String>,
    features: Vec<String>,
    specifications: Specifications,
    brand_id: Option<i64>,
    category_id: Option<i64>,
}

impl ProductRecord {
    fn from_input(id: i64, input: &ProductInput) -> Self {
        Self {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            image_url: input.image_url.clone(),
            images: input.images.clone(),
            features: input.features.clone(),
            specifications: input.specifications.clone(),
            brand_id: input.brand_id,
            category_id: input.category_id,
        }
    }
}

#[derive(Debug, Clone)]
struct Offer {
    product_id: i64,
    retailer_id: i64,
    initial_price: f64,
    final_price: f64,
    discount: i32,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<User>,
    brands: Vec<NamedEntity>,
    retailers: Vec<NamedEntity>,
    categories: Vec<NamedEntity>,
    products: Vec<ProductRecord>,
    offers: Vec<Offer>,
    reviews: Vec<Review>,
    /// (user, product, retailer), newest last.
    watchlist: Vec<(i64, i64, i64)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn catalog(&self, catalog: Catalog) -> &Vec<NamedEntity> {
        match catalog {
            Catalog::Brands => &self.brands,
            Catalog::Retailers => &self.retailers,
            Catalog::Categories => &self.categories,
        }
    }

    fn catalog_mut(&mut self, catalog: Catalog) -> &mut Vec<NamedEntity> {
        match catalog {
            Catalog::Brands => &mut self.brands,
            Catalog::Retailers => &mut self.retailers,
            Catalog::Categories => &mut self.categories,
        }
    }

    fn name_of(entities: &[NamedEntity], id: Option<i64>) -> Option<String> {
        let id = id?;
        entities.iter().find(|e| e.id == id).map(|e| e.name.clone())
    }

    fn listing(&self, offer: &Offer) -> Option<ProductListing> {
        let product = self.products.iter().find(|p| p.id == offer.product_id)?;
        let retailer = self.retailers.iter().find(|r| r.id == offer.retailer_id)?;

        let scores: Vec<f64> = self
            .reviews
            .iter()
            .filter(|r| r.product_id == product.id)
            .map(|r| f64::from(r.score))
            .collect();
        let rating = (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64);

        Some(ProductListing {
            product_id: product.id,
            title: product.title.clone(),
            image_url: product.image_url.clone(),
            retailer_id: retailer.id,
            retailer_name: retailer.name.clone(),
            brand: Self::name_of(&self.brands, product.brand_id),
            category: Self::name_of(&self.categories, product.category_id),
            initial_price: offer.initial_price,
            final_price: offer.final_price,
            discount: offer.discount,
            rating,
            review_count: scores.len() as i64,
        })
    }

    fn listings(&self) -> Vec<ProductListing> {
        self.offers.iter().filter_map(|o| self.listing(o)).collect()
    }

    /// Foreign-key checks for a product write.
    fn check_references(&self, input: &ProductInput) -> Result<(), AppError> {
        let known = |entities: &[NamedEntity], id: Option<i64>| {
            id.map_or(true, |id| entities.iter().any(|e| e.id == id))
        };
        let retailers_known = input
            .offers
            .iter()
            .flatten()
            .all(|o| known(self.retailers.as_slice(), Some(o.retailer_id)));

        if known(self.brands.as_slice(), input.brand_id)
            && known(self.categories.as_slice(), input.category_id)
            && retailers_known
        {
            Ok(())
        } else {
            Err(AppError::not_found("Referenced record not found"))
        }
    }

    fn replace_offers(&mut self, product_id: i64, offers: &[OfferInput]) {
        let keep = |retailer_id: i64| offers.iter().any(|o| o.retailer_id == retailer_id);
        self.offers.retain(|o| o.product_id != product_id || keep(o.retailer_id));
        self.watchlist.retain(|w| w.1 != product_id || keep(w.2));

        for input in offers {
            let offer = Offer {
                product_id,
                retailer_id: input.retailer_id,
                initial_price: input.initial_price,
                final_price: input.final_price,
                discount: input.discount(),
            };
            match self
                .offers
                .iter_mut()
                .find(|o| o.product_id == product_id && o.retailer_id == input.retailer_id)
            {
                Some(existing) => *existing = offer,
                None => self.offers.push(offer),
            }
        }
    }
}

fn matches(predicate: &Predicate, row: &ProductListing) -> bool {
    let named = |names: &Vec<String>, value: &Option<String>| {
        value.as_ref().is_some_and(|v| names.contains(v))
    };
    match predicate {
        Predicate::BrandIn(names) => named(names, &row.brand),
        Predicate::CategoryIn(names) => named(names, &row.category),
        Predicate::RetailerIn(names) => names.contains(&row.retailer_name),
        Predicate::MinPrice(min) => row.final_price >= *min,
        Predicate::MaxPrice(max) => row.final_price <= *max,
        Predicate::MinRating(min) => row.rating.unwrap_or(0.0) >= *min,
        Predicate::TitleContains(term) => row.title.to_lowercase().contains(&term.to_lowercase()),
    }
}

fn compare(field: Option<SortField>, a: &ProductListing, b: &ProductListing) -> Ordering {
    match field {
        None => Ordering::Equal,
        Some(SortField::Price) => a.final_price.total_cmp(&b.final_price),
        Some(SortField::Title) => a.title.cmp(&b.title),
        Some(SortField::Rating) => a.rating.unwrap_or(0.0).total_cmp(&b.rating.unwrap_or(0.0)),
        Some(SortField::Discount) => a.discount.cmp(&b.discount),
        Some(SortField::Newest) => a.product_id.cmp(&b.product_id),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_named(&self, catalog: Catalog, name: &str) -> i64 {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        inner.catalog_mut(catalog).push(NamedEntity { id, name: name.to_string() });
        id
    }

    pub async fn add_product(&self, title: &str, brand_id: Option<i64>, category_id: Option<i64>) -> i64 {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        inner.products.push(ProductRecord {
            id,
            title: title.to_string(),
            description: Some(format!("{title} description")),
            image_url: None,
            images: Vec::new(),
            features: Vec::new(),
            specifications: Specifications::new(),
            brand_id,
            category_id,
        });
        id
    }

    pub async fn add_offer(&self, product_id: i64, retailer_id: i64, initial_price: f64, final_price: f64) {
        let discount = offer_discount(initial_price, final_price);
        self.inner.lock().await.offers.push(Offer {
            product_id,
            retailer_id,
            initial_price,
            final_price,
            discount,
        });
    }

    pub async fn user_count(&self) -> usize {
        self.inner.lock().await.users.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, AppError> {
        let inner = self.inner.lock().await;
        let predicates = query.filters.predicates();

        let mut rows: Vec<ProductListing> = inner
            .listings()
            .into_iter()
            .filter(|row| predicates.iter().all(|p| matches(p, row)))
            .collect();

        rows.sort_by(|a, b| {
            let primary = compare(query.sort.field, a, b);
            let primary = match query.sort.direction() {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary
                .then(a.product_id.cmp(&b.product_id))
                .then(a.retailer_id.cmp(&b.retailer_id))
        });

        let total = rows.len() as i64;
        let rows = rows
            .into_iter()
            .skip(query.page.offset as usize)
            .take(query.page.limit as usize)
            .collect();

        Ok(ProductPage { rows, total })
    }

    async fn product_detail(
        &self,
        product_id: i64,
        retailer_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<ProductDetail>, AppError> {
        let inner = self.inner.lock().await;
        let Some(offer) = inner
            .offers
            .iter()
            .find(|o| o.product_id == product_id && o.retailer_id == retailer_id)
        else {
            return Ok(None);
        };
        let Some(listing) = inner.listing(offer) else {
            return Ok(None);
        };

        let Some(product) = inner.products.iter().find(|p| p.id == product_id) else {
            return Ok(None);
        };

        let mut reviews: Vec<Review> = inner
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let in_watchlist =
            viewer.map(|user_id| inner.watchlist.contains(&(user_id, product_id, retailer_id)));

        Ok(Some(ProductDetail {
            listing,
            description: product.description.clone(),
            images: product.images.clone(),
            features: product.features.clone(),
            specifications: product.specifications.clone(),
            reviews,
            in_watchlist,
        }))
    }

    async fn retail_prices(&self, product_id: i64) -> Result<Option<Vec<RetailPrice>>, AppError> {
        let inner = self.inner.lock().await;
        if !inner.products.iter().any(|p| p.id == product_id) {
            return Ok(None);
        }

        let mut prices: Vec<RetailPrice> = inner
            .offers
            .iter()
            .filter(|o| o.product_id == product_id)
            .filter_map(|o| {
                let retailer = inner.retailers.iter().find(|r| r.id == o.retailer_id)?;
                Some(RetailPrice {
                    retailer_id: retailer.id,
                    retailer_name: retailer.name.clone(),
                    initial_price: o.initial_price,
                    final_price: o.final_price,
                    discount: o.discount,
                })
            })
            .collect();
        prices.sort_by(|a, b| {
            a.final_price
                .total_cmp(&b.final_price)
                .then_with(|| a.retailer_name.cmp(&b.retailer_name))
        });

        Ok(Some(prices))
    }

    async fn list_catalog(
        &self,
        catalog: Catalog,
        search: Option<&str>,
    ) -> Result<Vec<NamedEntity>, AppError> {
        let inner = self.inner.lock().await;
        let term = search
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<NamedEntity> = inner
            .catalog(catalog)
            .iter()
            .filter(|e| term.as_ref().map_or(true, |t| e.name.to_lowercase().contains(t)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn create_catalog(&self, catalog: Catalog, name: &str) -> Result<NamedEntity, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.catalog(catalog).iter().any(|e| e.name == name) {
            return Err(AppError::conflict(format!("{} already exists", catalog.singular())));
        }
        let entity = NamedEntity { id: inner.next_id(), name: name.to_string() };
        inner.catalog_mut(catalog).push(entity.clone());
        Ok(entity)
    }

    async fn update_catalog(
        &self,
        catalog: Catalog,
        id: i64,
        name: &str,
    ) -> Result<Option<NamedEntity>, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.catalog(catalog).iter().any(|e| e.name == name && e.id != id) {
            return Err(AppError::conflict(format!("{} already exists", catalog.singular())));
        }
        let Some(entity) = inner.catalog_mut(catalog).iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        entity.name = name.to_string();
        Ok(Some(entity.clone()))
    }

    async fn remove_catalog(&self, catalog: Catalog, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        let entities = inner.catalog_mut(catalog);
        let before = entities.len();
        entities.retain(|e| e.id != id);
        let removed = entities.len() < before;

        if removed {
            match catalog {
                Catalog::Brands => inner
                    .products
                    .iter_mut()
                    .filter(|p| p.brand_id == Some(id))
                    .for_each(|p| p.brand_id = None),
                Catalog::Categories => inner
                    .products
                    .iter_mut()
                    .filter(|p| p.category_id == Some(id))
                    .for_each(|p| p.category_id = None),
                Catalog::Retailers => {
                    inner.offers.retain(|o| o.retailer_id != id);
                    inner.watchlist.retain(|w| w.2 != id);
                }
            }
        }
        Ok(removed)
    }

    async fn remove_product(&self, product_id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        let before = inner.products.len();
        inner.products.retain(|p| p.id != product_id);
        if inner.products.len() == before {
            return Ok(false);
        }
        inner.offers.retain(|o| o.product_id != product_id);
        inner.reviews.retain(|r| r.product_id != product_id);
        inner.watchlist.retain(|w| w.1 != product_id);
        Ok(true)
    }

    async fn create_product(&self, product: ProductInput) -> Result<i64, AppError> {
        let mut inner = self.inner.lock().await;
        inner.check_references(&product)?;

        let id = inner.next_id();
        inner.products.push(ProductRecord::from_input(id, &product));
        if let Some(offers) = &product.offers {
            inner.replace_offers(id, offers);
        }
        Ok(id)
    }

    async fn update_product(&self, product_id: i64, product: ProductInput) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.products.iter().any(|p| p.id == product_id) {
            return Ok(false);
        }
        inner.check_references(&product)?;

        if let Some(record) = inner.products.iter_mut().find(|p| p.id == product_id) {
            *record = ProductRecord::from_input(product_id, &product);
        }
        if let Some(offers) = &product.offers {
            inner.replace_offers(product_id, offers);
        }
        Ok(true)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_by_api_key(&self, api_key: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.api_key == api_key).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::conflict("Email already registered"));
        }

        let mut api_key = user.api_key;
        while inner.users.iter().any(|u| u.api_key == api_key) {
            api_key = generate_api_key();
        }

        let created = User {
            id: inner.next_id(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            api_key,
            created_at: Utc::now(),
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn update_email(&self, user_id: i64, email: &str) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|u| u.email == email && u.id != user_id) {
            return Err(AppError::conflict("Email already registered"));
        }
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.email = email.to_string();
        Ok(())
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        let before = inner.users.len();
        inner.users.retain(|u| u.id != user_id);
        if inner.users.len() == before {
            return Ok(false);
        }
        inner.reviews.retain(|r| r.user_id != user_id);
        inner.watchlist.retain(|w| w.0 != user_id);
        Ok(true)
    }

    async fn watchlist(&self, user_id: i64) -> Result<Vec<ProductListing>, AppError> {
        let inner = self.inner.lock().await;
        let rows = inner
            .watchlist
            .iter()
            .rev()
            .filter(|w| w.0 == user_id)
            .filter_map(|&(_, product_id, retailer_id)| {
                let offer = inner
                    .offers
                    .iter()
                    .find(|o| o.product_id == product_id && o.retailer_id == retailer_id)?;
                inner.listing(offer)
            })
            .collect();
        Ok(rows)
    }

    async fn add_to_watchlist(
        &self,
        user_id: i64,
        product_id: i64,
        retailer_id: i64,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if !inner
            .offers
            .iter()
            .any(|o| o.product_id == product_id && o.retailer_id == retailer_id)
        {
            return Err(AppError::not_found("Product is not sold by that retailer"));
        }
        let entry = (user_id, product_id, retailer_id);
        if inner.watchlist.contains(&entry) {
            return Err(AppError::conflict("Already in watchlist"));
        }
        inner.watchlist.push(entry);
        Ok(())
    }

    async fn remove_from_watchlist(
        &self,
        user_id: i64,
        product_id: i64,
        retailer_id: Option<i64>,
    ) -> Result<u64, AppError> {
        let mut inner = self.inner.lock().await;
        let before = inner.watchlist.len();
        inner.watchlist.retain(|&(u, p, r)| {
            !(u == user_id && p == product_id && retailer_id.map_or(true, |rid| rid == r))
        });
        Ok((before - inner.watchlist.len()) as u64)
    }

    async fn add_review(&self, review: NewReview) -> Result<Review, AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.products.iter().any(|p| p.id == review.product_id) {
            return Err(AppError::not_found("Product not found"));
        }
        let author = inner
            .users
            .iter()
            .find(|u| u.id == review.user_id)
            .map(|u| u.first_name.clone())
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let saved = Review {
            id: inner.next_id(),
            product_id: review.product_id,
            user_id: review.user_id,
            author,
            score: review.score,
            message: review.message,
            created_at: Utc::now(),
        };
        inner.reviews.push(saved.clone());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn new_user(email: &str, api_key: &str) -> NewUser {
        NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: Role::Normal,
            api_key: api_key.into(),
        }
    }

    #[tokio::test]
    async fn clashing_api_key_is_replaced_not_reported_as_duplicate_email() {
        let store = MemoryStore::new();
        let first = store.create_user(new_user("a@example.com", "samekey")).await.unwrap();
        let second = store.create_user(new_user("b@example.com", "samekey")).await.unwrap();

        assert_eq!(first.api_key, "samekey");
        assert_ne!(second.api_key, "samekey");
        assert_eq!(store.user_count().await, 2);

        let err = store.create_user(new_user("a@example.com", "otherkey")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
