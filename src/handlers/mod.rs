pub mod admin;
pub mod catalog;
pub mod product;
pub mod review;
pub mod user;
pub mod watchlist;
