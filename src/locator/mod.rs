pub mod error;
pub mod resource_locator;
