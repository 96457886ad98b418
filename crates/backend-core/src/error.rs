//! # Error Taxonomy
//!
//! Every service defines its own error enum (one per service, mirroring the provider's
//! exception list). This module holds what they share: the coarse [`ErrorKind`] callers can
//! branch on, and the [`ProviderError`] trait that exposes the provider's wire code next to
//! the `Display` message.

use serde::Serialize;
use std::fmt;

/// Coarse classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The operation references a resource that is not in the store.
    NotFound,
    /// A create targets an id or name that is already present.
    AlreadyExists,
    /// The payload fails a structural precondition (too few stages, untrusted role, ...).
    StructureInvalid,
    /// A field-level constraint is violated.
    ValidationError,
    /// A count-based ceiling is exceeded (tags, recipients).
    LimitExceeded,
    /// A business rule refused the request (unverified sender, missing template).
    Rejected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::StructureInvalid => "StructureInvalid",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::LimitExceeded => "LimitExceeded",
            ErrorKind::Rejected => "Rejected",
        };
        f.write_str(name)
    }
}

/// A service error as the provider would report it.
///
/// `Display` yields the provider's human-readable message, [`code`](Self::code) the error
/// code a wire layer would put in the envelope.
pub trait ProviderError: std::error::Error {
    fn kind(&self) -> ErrorKind;

    fn code(&self) -> &'static str;

    /// HTTP status the provider answers with. Almost everything is a client error.
    fn status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            _ => 400,
        }
    }

    /// Plain-data snapshot of the error.
    fn details(&self) -> ErrorDetails {
        ErrorDetails {
            kind: self.kind(),
            code: self.code(),
            message: self.to_string(),
            status: self.status(),
        }
    }
}

/// Serializable view of a [`ProviderError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetails {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum SampleError {
        #[error("Thing {0} is missing")]
        Missing(String),
        #[error("Too many things")]
        TooMany,
    }

    impl ProviderError for SampleError {
        fn kind(&self) -> ErrorKind {
            match self {
                SampleError::Missing(_) => ErrorKind::NotFound,
                SampleError::TooMany => ErrorKind::LimitExceeded,
            }
        }

        fn code(&self) -> &'static str {
            match self {
                SampleError::Missing(_) => "ThingNotFound",
                SampleError::TooMany => "TooManyThings",
            }
        }
    }

    #[test]
    fn details_carry_code_and_message() {
        let details = SampleError::Missing("x".into()).details();
        assert_eq!(details.code, "ThingNotFound");
        assert_eq!(details.message, "Thing x is missing");
        assert_eq!(details.status, 404);
        assert_eq!(SampleError::TooMany.status(), 400);
        assert_eq!(ErrorKind::LimitExceeded.to_string(), "LimitExceeded");
    }
}
