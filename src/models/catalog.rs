use sqlx::FromRow;

/// The lookup tables exposed by name: brands, retailers and categories
/// (the storefront calls categories "departments").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Brands,
    Retailers,
    Categories,
}

impl Catalog {
    pub fn table(self) -> &'static str {
        match self {
            Catalog::Brands => "brands",
            Catalog::Retailers => "retailers",
            Catalog::Categories => "categories",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Catalog::Brands => "Brand",
            Catalog::Retailers => "Retailer",
            Catalog::Categories => "Category",
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct NamedEntity {
    pub id: i64,
    pub name: String,
}
