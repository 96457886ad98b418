//! Error types for the Resource Groups Tagging API.

use backend_core::{ErrorKind, PaginationError, ProviderError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaggingError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl ProviderError for TaggingError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::ValidationError
    }

    fn code(&self) -> &'static str {
        match self {
            TaggingError::InvalidParameter(_) => "InvalidParameterException",
            TaggingError::Pagination(PaginationError::InvalidToken) => "PaginationTokenExpiredException",
            TaggingError::Pagination(e) => e.code(),
        }
    }
}
