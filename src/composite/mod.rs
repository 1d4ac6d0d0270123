pub mod compositor;
pub mod error;
pub mod reduce;
