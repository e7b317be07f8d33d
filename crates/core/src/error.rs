//! Error types for the Rulecraft domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use crate::slot::Operator;
use crate::types::{Type, TypeError};
use thiserror::Error;

/// The top-level error type for all Rulecraft operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Slot resolution ---
    #[error("Type mismatch on '{slot}': {source}")]
    TypeMismatch {
        slot: String,
        #[source]
        source: TypeError,
    },

    #[error("Unresolved reference: {name} {operator} {value}")]
    UnresolvedReference {
        name: String,
        operator: Operator,
        value: String,
    },

    #[error("Actions cannot have conditions (found one on '{name}')")]
    InvalidPredicate { name: String },

    #[error("Could not resolve {what}: {reason}")]
    ResolutionFailed { what: String, reason: String },

    #[error("Unknown channel {kind}.{channel}")]
    UnknownChannel { kind: String, channel: String },

    // --- Code generation ---
    #[error("Program invalid: {0}")]
    ProgramInvalid(String),

    // --- Programming / configuration errors ---
    #[error("Slot '{slot}' has type {ty}, which cannot be asked for")]
    UnsupportedSlotType { slot: String, ty: Type },

    #[error("Unsupported comparison operator '{0}'")]
    UnsupportedOperator(Operator),

    // --- Collaborators ---
    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors that end the current attempt but leave the session usable.
    ///
    /// Everything else is a programming or configuration error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TypeMismatch { .. }
                | Error::UnresolvedReference { .. }
                | Error::InvalidPredicate { .. }
                | Error::ResolutionFailed { .. }
                | Error::UnknownChannel { .. }
                | Error::ProgramInvalid(_)
                | Error::Parser(_)
                | Error::Capability(_)
        )
    }

    pub fn resolution_failed(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ResolutionFailed {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ParserError {
    #[error("HTTP request failed: {message} (status: {status_code})")]
    Http { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Error received from parser server: {0}")]
    Remote(String),

    #[error("Malformed parser response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("{0} is not available")]
    Unavailable(String),

    #[error("{capability} failed: {reason}")]
    Failed { capability: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_displays_slot() {
        let err = Error::TypeMismatch {
            slot: "amount".into(),
            source: TypeError::Incompatible {
                expected: Type::Number,
                found: Type::String,
            },
        };
        assert!(err.to_string().contains("amount"));
        assert!(err.to_string().contains("Number"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn programming_errors_are_fatal() {
        let err = Error::UnsupportedSlotType {
            slot: "tags".into(),
            ty: Type::Array(Box::new(Type::String)),
        };
        assert!(!err.is_recoverable());
        assert!(!Error::UnsupportedOperator(Operator::Other("~".into())).is_recoverable());
    }
}
