pub mod product;
pub mod query;
