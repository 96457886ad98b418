//! Error types for the SNS backend.

use backend_core::{ErrorKind, ProviderError, TagViolation};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SnsError {
    /// Publishing or reading a topic that does not exist.
    #[error("Topic does not exist")]
    NotFound,

    /// Tag operations on an unknown resource ARN.
    #[error("Resource does not exist")]
    ResourceNotFound,

    #[error("Could not complete request: tag quota of per resource exceeded")]
    TagLimitExceeded,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<TagViolation> for SnsError {
    fn from(violation: TagViolation) -> Self {
        match violation {
            TagViolation::TooManyTags { .. } => SnsError::TagLimitExceeded,
            other => SnsError::InvalidParameter(format!("Tags Reason: {other}")),
        }
    }
}

impl ProviderError for SnsError {
    fn kind(&self) -> ErrorKind {
        match self {
            SnsError::NotFound | SnsError::ResourceNotFound => ErrorKind::NotFound,
            SnsError::TagLimitExceeded => ErrorKind::LimitExceeded,
            SnsError::InvalidParameter(_) => ErrorKind::ValidationError,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            SnsError::NotFound => "NotFound",
            SnsError::ResourceNotFound => "ResourceNotFound",
            SnsError::TagLimitExceeded => "TagLimitExceeded",
            SnsError::InvalidParameter(_) => "InvalidParameter",
        }
    }
}
