// src/dtos/catalog.rs
use serde::{Deserialize, Serialize};

use crate::dtos::de::flexible_id;
use crate::models::catalog::NamedEntity;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogSearchRequest {
    #[serde(default)]
    pub search: Option<String>,
}

/// `/Add/{Brand,Retailer,Category}` and `/Update/...`. The admin panel
/// sends the name as `brand_name`, `retailer_name` or `category_name`.
#[derive(Debug, Deserialize)]
pub struct SaveCatalogRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<i64>,
    #[serde(default, alias = "brand_name", alias = "retailer_name", alias = "category_name")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveCatalogRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveProductRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub product_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NamedEntityResponse {
    pub id: i64,
    pub name: String,
}

impl From<NamedEntity> for NamedEntityResponse {
    fn from(entity: NamedEntity) -> Self {
        Self { id: entity.id, name: entity.name }
    }
}
