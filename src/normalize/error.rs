use crate::locator::error::InvalidRequest;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No '{{...}}' object found in model output")]
    NoObjectFound,

    #[error("Unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("Unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { offset: usize, found: char },

    #[error("Expected {expected} at offset {offset}, found {found}")]
    UnexpectedToken {
        offset: usize,
        expected: &'static str,
        found: String,
    },

    #[error("Nesting deeper than {limit} levels at offset {offset}")]
    TooDeep { offset: usize, limit: usize },

    #[error("Input ended while expecting {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("Object does not match the request layout")]
    Layout(#[from] serde_json::Error),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{0}' is an empty list")]
    EmptyList(&'static str),

    #[error("Field '{field}' has unusable value '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("Field '{field}' is not a valid request value")]
    InvalidRequest {
        field: &'static str,
        #[source]
        source: InvalidRequest,
    },
}
