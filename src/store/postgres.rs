// src/store/postgres.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{error, warn};

use crate::auth::credentials::generate_api_key;
use crate::error::AppError;
use crate::models::catalog::{Catalog, NamedEntity};
use crate::models::product::{
    OfferInput, ProductDetail, ProductInput, ProductListing, ProductPage, RetailPrice, Specifications,
};
use crate::models::review::{NewReview, Review};
use crate::models::user::{NewUser, Role, User};
use crate::query::filter::contains_pattern;
use crate::query::{ProductQuery, LISTING_COLUMNS, LISTING_FROM};
use crate::store::Store;

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, role, api_key, created_at";

const DUPLICATE_EMAIL: &str = "Email already registered";
const DUPLICATE_OFFER: &str = "Retailer listed twice for the product";

/// Fresh keys tried when a generated API key collides.
const API_KEY_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    listing: ProductListing,
    total: i64,
}

#[derive(FromRow)]
struct DetailRow {
    #[sqlx(flatten)]
    listing: ProductListing,
    description: Option<String>,
    images: Vec<String>,
    features: Vec<String>,
    specifications: Json<Specifications>,
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    api_key: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| AppError::internal(format!("user {} has unknown role {:?}", row.id, row.role)))?;
        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            api_key: row.api_key,
            created_at: row.created_at,
        })
    }
}

fn listing_base() -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(LISTING_COLUMNS);
    qb.push(LISTING_FROM);
    qb
}

/// Makes `offers` the product's complete offer list: retailers not listed
/// are dropped, the rest inserted or repriced.
async fn replace_offers(
    conn: &mut PgConnection,
    product_id: i64,
    offers: &[OfferInput],
) -> Result<(), AppError> {
    let retailer_ids: Vec<i64> = offers.iter().map(|o| o.retailer_id).collect();
    sqlx::query("DELETE FROM product_retailers WHERE product_id = $1 AND NOT (retailer_id = ANY($2))")
        .bind(product_id)
        .bind(&retailer_ids)
        .execute(&mut *conn)
        .await?;

    for offer in offers {
        sqlx::query(
            "INSERT INTO product_retailers (product_id, retailer_id, initial_price, final_price, discount)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (product_id, retailer_id) DO UPDATE
             SET initial_price = EXCLUDED.initial_price,
                 final_price = EXCLUDED.final_price,
                 discount = EXCLUDED.discount",
        )
        .bind(product_id)
        .bind(offer.retailer_id)
        .bind(offer.initial_price)
        .bind(offer.final_price)
        .bind(offer.discount())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::db(e, DUPLICATE_OFFER))?;
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = query.build();
        let rows = qb
            .build_query_as::<ListingRow>()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                error!(?e, "Failed to fetch products");
                AppError::from(e)
            })?;

        let total = match rows.first() {
            Some(row) => row.total,
            // Past the last page the window count is unavailable; count directly.
            None if query.page.offset > 0 => {
                let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
                count.push(LISTING_FROM);
                query.filters.push_where(&mut count);
                count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?
            }
            None => 0,
        };

        Ok(ProductPage {
            rows: rows.into_iter().map(|r| r.listing).collect(),
            total,
        })
    }

    async fn product_detail(
        &self,
        product_id: i64,
        retailer_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<ProductDetail>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = QueryBuilder::<Postgres>::new(LISTING_COLUMNS);
        qb.push(", p.description, p.images, p.features, p.specifications");
        qb.push(LISTING_FROM);
        qb.push(" WHERE pr.product_id = ")
            .push_bind(product_id)
            .push(" AND pr.retailer_id = ")
            .push_bind(retailer_id);

        let Some(row) = qb
            .build_query_as::<DetailRow>()
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let reviews = sqlx::query_as::<_, Review>(
            "SELECT rv.id, rv.product_id, rv.user_id, u.first_name AS author,
                    rv.score, rv.message, rv.created_at
             FROM reviews rv
             JOIN users u ON u.id = rv.user_id
             WHERE rv.product_id = $1
             ORDER BY rv.created_at DESC, rv.id DESC",
        )
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        let in_watchlist = match viewer {
            Some(user_id) => Some(
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM watchlist
                     WHERE user_id = $1 AND product_id = $2 AND retailer_id = $3)",
                )
                .bind(user_id)
                .bind(product_id)
                .bind(retailer_id)
                .fetch_one(&mut *conn)
                .await?,
            ),
            None => None,
        };

        Ok(Some(ProductDetail {
            listing: row.listing,
            description: row.description,
            images: row.images,
            features: row.features,
            specifications: row.specifications.0,
            reviews,
            in_watchlist,
        }))
    }

    async fn retail_prices(&self, product_id: i64) -> Result<Option<Vec<RetailPrice>>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;
        if !exists {
            return Ok(None);
        }

        let prices = sqlx::query_as::<_, RetailPrice>(
            "SELECT r.id AS retailer_id, r.name AS retailer_name,
                    pr.initial_price, pr.final_price, pr.discount
             FROM product_retailers pr
             JOIN retailers r ON r.id = pr.retailer_id
             WHERE pr.product_id = $1
             ORDER BY pr.final_price ASC, r.name ASC",
        )
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(prices))
    }

    async fn list_catalog(
        &self,
        catalog: Catalog,
        search: Option<&str>,
    ) -> Result<Vec<NamedEntity>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id, name FROM ");
        qb.push(catalog.table());
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            qb.push(" WHERE name ILIKE ").push_bind(contains_pattern(term));
        }
        qb.push(" ORDER BY name ASC");

        let rows = qb
            .build_query_as::<NamedEntity>()
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    async fn create_catalog(&self, catalog: Catalog, name: &str) -> Result<NamedEntity, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO ");
        qb.push(catalog.table())
            .push(" (name) VALUES (")
            .push_bind(name.to_owned())
            .push(") RETURNING id, name");

        qb.build_query_as::<NamedEntity>()
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::db(e, &format!("{} already exists", catalog.singular())))
    }

    async fn update_catalog(
        &self,
        catalog: Catalog,
        id: i64,
        name: &str,
    ) -> Result<Option<NamedEntity>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ");
        qb.push(catalog.table())
            .push(" SET name = ")
            .push_bind(name.to_owned())
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING id, name");

        qb.build_query_as::<NamedEntity>()
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::db(e, &format!("{} already exists", catalog.singular())))
    }

    async fn remove_catalog(&self, catalog: Catalog, id: i64) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM ");
        qb.push(catalog.table()).push(" WHERE id = ").push_bind(id);
        let result = qb.build().execute(&mut *conn).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_product(&self, product_id: i64) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_product(&self, product: ProductInput) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let product_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO products
                 (title, description, image_url, images, features, specifications, brand_id, category_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(&product.images)
        .bind(&product.features)
        .bind(Json(&product.specifications))
        .bind(product.brand_id)
        .bind(product.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::db(e, "Product already exists"))?;

        if let Some(offers) = &product.offers {
            replace_offers(&mut tx, product_id, offers).await?;
        }

        // Dropping `tx` on any error above rolls the product back too.
        tx.commit().await?;
        Ok(product_id)
    }

    async fn update_product(&self, product_id: i64, product: ProductInput) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE products
             SET title = $1, description = $2, image_url = $3, images = $4,
                 features = $5, specifications = $6, brand_id = $7, category_id = $8
             WHERE id = $9",
        )
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(&product.images)
        .bind(&product.features)
        .bind(Json(&product.specifications))
        .bind(product.brand_id)
        .bind(product.category_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::db(e, "Product already exists"))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(offers) = &product.offers {
            replace_offers(&mut tx, product_id, offers).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_api_key(&self, api_key: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE api_key = $1"))
            .bind(api_key)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&user.email)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            // Dropping `tx` rolls back and returns the connection.
            return Err(AppError::conflict(DUPLICATE_EMAIL));
        }

        // Only the key constraint is absorbed; an email clash still errors.
        let insert = format!(
            "INSERT INTO users (first_name, last_name, email, password_hash, role, api_key)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT ON CONSTRAINT users_api_key_unique DO NOTHING
             RETURNING {USER_COLUMNS}"
        );

        let mut api_key = user.api_key;
        for _ in 0..API_KEY_ATTEMPTS {
            let row = sqlx::query_as::<_, UserRow>(&insert)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.role.as_str())
                .bind(&api_key)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::db(e, DUPLICATE_EMAIL))?;

            if let Some(row) = row {
                tx.commit().await?;
                return User::try_from(row);
            }

            warn!("Generated API key collided with an existing one, retrying");
            api_key = generate_api_key();
        }

        Err(AppError::internal("Could not allocate a unique API key"))
    }

    async fn update_email(&self, user_id: i64, email: &str) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query("UPDATE users SET email = $1 WHERE id = $2")
            .bind(email)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::db(e, DUPLICATE_EMAIL))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn watchlist(&self, user_id: i64) -> Result<Vec<ProductListing>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = listing_base();
        qb.push(" JOIN watchlist w ON w.product_id = pr.product_id AND w.retailer_id = pr.retailer_id");
        qb.push(" WHERE w.user_id = ").push_bind(user_id);
        qb.push(" ORDER BY w.created_at DESC, p.id ASC, r.id ASC");

        let rows = qb
            .build_query_as::<ProductListing>()
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    async fn add_to_watchlist(
        &self,
        user_id: i64,
        product_id: i64,
        retailer_id: i64,
    ) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;

        let offer_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM product_retailers WHERE product_id = $1 AND retailer_id = $2)",
        )
        .bind(product_id)
        .bind(retailer_id)
        .fetch_one(&mut *conn)
        .await?;
        if !offer_exists {
            return Err(AppError::not_found("Product is not sold by that retailer"));
        }

        let result = sqlx::query(
            "INSERT INTO watchlist (user_id, product_id, retailer_id)
             VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(retailer_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict("Already in watchlist"));
        }
        Ok(())
    }

    async fn remove_from_watchlist(
        &self,
        user_id: i64,
        product_id: i64,
        retailer_id: Option<i64>,
    ) -> Result<u64, AppError> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            "DELETE FROM watchlist
             WHERE user_id = $1 AND product_id = $2
               AND ($3::BIGINT IS NULL OR retailer_id = $3)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(retailer_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    async fn add_review(&self, review: NewReview) -> Result<Review, AppError> {
        let mut conn = self.pool.acquire().await?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(review.product_id)
            .fetch_one(&mut *conn)
            .await?;
        if !exists {
            return Err(AppError::not_found("Product not found"));
        }

        let saved = sqlx::query_as::<_, Review>(
            "WITH inserted AS (
                 INSERT INTO reviews (product_id, user_id, score, message)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, product_id, user_id, score, message, created_at
             )
             SELECT i.id, i.product_id, i.user_id, u.first_name AS author,
                    i.score, i.message, i.created_at
             FROM inserted i
             JOIN users u ON u.id = i.user_id",
        )
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.score)
        .bind(&review.message)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::db(e, "Review already exists"))?;

        Ok(saved)
    }
}
