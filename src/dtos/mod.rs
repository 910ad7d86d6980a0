pub mod catalog;
pub mod de;
pub mod product;
pub mod response;
pub mod review;
pub mod user;
pub mod watchlist;
