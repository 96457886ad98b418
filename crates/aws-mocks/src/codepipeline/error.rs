//! Error types for the CodePipeline backend.

use backend_core::{ErrorKind, ProviderError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodePipelineError {
    /// Structural problem with a declaration (stage count, untrusted role).
    #[error("{0}")]
    InvalidStructure(String),

    /// Name collision on create. Reported on the wire as an invalid structure.
    #[error("{0}")]
    NameInUse(String),

    #[error("{0}")]
    PipelineNotFound(String),

    #[error("{0}")]
    ResourceNotFound(String),

    #[error("{0}")]
    InvalidTags(String),

    #[error("Tag limit exceeded for resource [{0}].")]
    TooManyTags(String),

    #[error("The next token was invalid: {0}")]
    InvalidNextToken(String),
}

impl ProviderError for CodePipelineError {
    fn kind(&self) -> ErrorKind {
        match self {
            CodePipelineError::InvalidStructure(_) => ErrorKind::StructureInvalid,
            CodePipelineError::NameInUse(_) => ErrorKind::AlreadyExists,
            CodePipelineError::PipelineNotFound(_) | CodePipelineError::ResourceNotFound(_) => {
                ErrorKind::NotFound
            }
            CodePipelineError::InvalidTags(_) | CodePipelineError::InvalidNextToken(_) => {
                ErrorKind::ValidationError
            }
            CodePipelineError::TooManyTags(_) => ErrorKind::LimitExceeded,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CodePipelineError::InvalidStructure(_) | CodePipelineError::NameInUse(_) => {
                "InvalidStructureException"
            }
            CodePipelineError::PipelineNotFound(_) => "PipelineNotFoundException",
            CodePipelineError::ResourceNotFound(_) => "ResourceNotFoundException",
            CodePipelineError::InvalidTags(_) => "InvalidTagsException",
            CodePipelineError::TooManyTags(_) => "TooManyTagsException",
            CodePipelineError::InvalidNextToken(_) => "InvalidNextTokenException",
        }
    }

    fn status(&self) -> u16 {
        400
    }
}
