pub mod error;
mod lexer;
pub mod normalizer;
mod parser;
