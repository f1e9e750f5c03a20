use thiserror::Error;

/// Errors produced when constructing hsync types from untrusted input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{field} must be a non-empty string")]
    Empty { field: &'static str },

    #[error("document handle is not valid base58: {0}")]
    InvalidHandle(String),
}
