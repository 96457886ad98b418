//! Error types for the SES backend.

use crate::sns::SnsError;
use backend_core::{ErrorKind, PaginationError, ProviderError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SesError {
    #[error("Too many recipients.")]
    TooManyRecipients,

    /// Bulk sends count destinations, not addresses.
    #[error("Too many destinations.")]
    TooManyDestinations,

    #[error("Email address not verified {0}")]
    NotVerified(String),

    #[error("Did not have authority to send from email {0}")]
    NoAuthority(String),

    #[error("Source not specified")]
    SourceNotSpecified,

    /// A template referenced by a send.
    #[error("Template ({0}) does not exist")]
    TemplateMissing(String),

    /// A template referenced by name in a template operation.
    #[error("Invalid Template Name.")]
    TemplateNotFound,

    #[error("Duplicate Template Name.")]
    TemplateNameAlreadyExists,

    #[error("{0}")]
    InvalidRenderingParameter(String),

    #[error("{0}")]
    InvalidParameterValue(String),

    #[error("{0}")]
    Validation(String),

    #[error("Configuration set <{0}> already exists")]
    ConfigurationSetAlreadyExists(String),

    #[error("{0}")]
    ConfigurationSetDoesNotExist(String),

    #[error("Duplicate Event destination Name.")]
    EventDestinationAlreadyExists,

    #[error("{0}")]
    AlreadyExists(String),

    #[error("Rule set does not exist: {0}")]
    RuleSetDoesNotExist(String),

    #[error("Rule does not exist: {0}")]
    RuleDoesNotExist(String),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// Publishing a feedback notification failed.
    #[error(transparent)]
    Sns(#[from] SnsError),
}

impl SesError {
    pub(crate) fn missing_configuration_set(name: &str) -> Self {
        SesError::ConfigurationSetDoesNotExist(format!("Configuration set <{name}> does not exist"))
    }
}

impl ProviderError for SesError {
    fn kind(&self) -> ErrorKind {
        match self {
            SesError::TooManyRecipients | SesError::TooManyDestinations => ErrorKind::LimitExceeded,
            SesError::NotVerified(_)
            | SesError::NoAuthority(_)
            | SesError::SourceNotSpecified
            | SesError::TemplateMissing(_) => ErrorKind::Rejected,
            SesError::TemplateNotFound
            | SesError::ConfigurationSetDoesNotExist(_)
            | SesError::RuleSetDoesNotExist(_)
            | SesError::RuleDoesNotExist(_) => ErrorKind::NotFound,
            SesError::TemplateNameAlreadyExists
            | SesError::ConfigurationSetAlreadyExists(_)
            | SesError::EventDestinationAlreadyExists
            | SesError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            SesError::InvalidRenderingParameter(_)
            | SesError::InvalidParameterValue(_)
            | SesError::Validation(_) => ErrorKind::ValidationError,
            SesError::Pagination(e) => e.kind(),
            SesError::Sns(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            SesError::TooManyRecipients
            | SesError::TooManyDestinations
            | SesError::NotVerified(_)
            | SesError::NoAuthority(_)
            | SesError::SourceNotSpecified => "MessageRejected",
            SesError::TemplateMissing(_) | SesError::TemplateNotFound => "TemplateDoesNotExist",
            SesError::TemplateNameAlreadyExists => "AlreadyExists",
            SesError::InvalidRenderingParameter(_) => "InvalidRenderingParameterException",
            SesError::InvalidParameterValue(_) => "InvalidParameterValue",
            SesError::Validation(_) => "ValidationError",
            SesError::ConfigurationSetAlreadyExists(_) => "ConfigurationSetAlreadyExists",
            SesError::ConfigurationSetDoesNotExist(_) => "ConfigurationSetDoesNotExist",
            SesError::EventDestinationAlreadyExists => "EventDestinationAlreadyExists",
            SesError::AlreadyExists(_) => "AlreadyExists",
            SesError::RuleSetDoesNotExist(_) => "RuleSetDoesNotExist",
            SesError::RuleDoesNotExist(_) => "RuleDoesNotExist",
            SesError::Pagination(e) => e.code(),
            SesError::Sns(e) => e.code(),
        }
    }

    fn status(&self) -> u16 {
        match self {
            SesError::Sns(e) => e.status(),
            _ => 400,
        }
    }
}
