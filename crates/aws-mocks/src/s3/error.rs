//! Error types for the S3 backend.

use backend_core::{ErrorKind, ProviderError, TagViolation};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum S3Error {
    #[error(
        "The requested bucket name is not available. The bucket namespace is shared by all \
         users of the system. Please select a different name and try again"
    )]
    BucketAlreadyExists(String),

    #[error("The specified bucket does not exist")]
    NoSuchBucket(String),

    #[error("The specified bucket is not valid.")]
    InvalidBucketName(String),

    #[error("The TagSet does not exist")]
    NoSuchTagSet,

    #[error("{0}")]
    InvalidTag(String),

    #[error("Bucket tag count cannot be greater than {0}")]
    TooManyTags(usize),

    #[error("The XML you provided was not well-formed or did not validate against our published schema")]
    MalformedXml,

    #[error("The lifecycle configuration does not exist")]
    NoSuchLifecycleConfiguration,
}

impl From<TagViolation> for S3Error {
    fn from(violation: TagViolation) -> Self {
        match violation {
            TagViolation::TooManyTags { limit, .. } => S3Error::TooManyTags(limit),
            TagViolation::ReservedKey(_) => {
                S3Error::InvalidTag("System tags cannot be added/updated by requester".to_string())
            }
            TagViolation::DuplicateKey(_) => {
                S3Error::InvalidTag("Cannot provide multiple Tags with the same key".to_string())
            }
            TagViolation::EmptyKey => {
                S3Error::InvalidTag("The TagKey you have provided is invalid".to_string())
            }
        }
    }
}

impl ProviderError for S3Error {
    fn kind(&self) -> ErrorKind {
        match self {
            S3Error::BucketAlreadyExists(_) => ErrorKind::AlreadyExists,
            S3Error::NoSuchBucket(_) | S3Error::NoSuchTagSet | S3Error::NoSuchLifecycleConfiguration => {
                ErrorKind::NotFound
            }
            S3Error::TooManyTags(_) => ErrorKind::LimitExceeded,
            S3Error::InvalidBucketName(_) | S3Error::InvalidTag(_) | S3Error::MalformedXml => {
                ErrorKind::ValidationError
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            S3Error::BucketAlreadyExists(_) => "BucketAlreadyExists",
            S3Error::NoSuchBucket(_) => "NoSuchBucket",
            S3Error::InvalidBucketName(_) => "InvalidBucketName",
            S3Error::NoSuchTagSet => "NoSuchTagSet",
            S3Error::InvalidTag(_) | S3Error::TooManyTags(_) => "InvalidTag",
            S3Error::MalformedXml => "MalformedXML",
            S3Error::NoSuchLifecycleConfiguration => "NoSuchLifecycleConfiguration",
        }
    }

    fn status(&self) -> u16 {
        match self {
            S3Error::BucketAlreadyExists(_) => 409,
            _ if self.kind() == ErrorKind::NotFound => 404,
            _ => 400,
        }
    }
}
