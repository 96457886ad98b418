//! Error types for the IAM backend.

use backend_core::{ErrorKind, ProviderError, TagViolation};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IamError {
    #[error("{0}")]
    NoSuchEntity(String),

    #[error("Role with name {0} already exists.")]
    EntityAlreadyExists(String),

    #[error("{0}")]
    MalformedPolicyDocument(String),

    #[error("1 validation error detected: Value at 'tags' failed to satisfy constraint: Member must have length less than or equal to {0}")]
    TooManyTags(usize),

    #[error("{0}")]
    InvalidInput(String),
}

impl From<TagViolation> for IamError {
    fn from(violation: TagViolation) -> Self {
        match violation {
            TagViolation::TooManyTags { limit, .. } => IamError::TooManyTags(limit),
            other => IamError::InvalidInput(other.to_string()),
        }
    }
}

impl ProviderError for IamError {
    fn kind(&self) -> ErrorKind {
        match self {
            IamError::NoSuchEntity(_) => ErrorKind::NotFound,
            IamError::EntityAlreadyExists(_) => ErrorKind::AlreadyExists,
            IamError::MalformedPolicyDocument(_) => ErrorKind::StructureInvalid,
            IamError::TooManyTags(_) => ErrorKind::LimitExceeded,
            IamError::InvalidInput(_) => ErrorKind::ValidationError,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            IamError::NoSuchEntity(_) => "NoSuchEntity",
            IamError::EntityAlreadyExists(_) => "EntityAlreadyExists",
            IamError::MalformedPolicyDocument(_) => "MalformedPolicyDocument",
            IamError::TooManyTags(_) => "LimitExceeded",
            IamError::InvalidInput(_) => "InvalidInput",
        }
    }
}
