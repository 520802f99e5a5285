//! Error types for opmqg.
//!
//! All failures surfaced by this crate are local validation failures,
//! strongly typed using thiserror. Operations never return partially
//! emitted query text alongside an error, and nothing here is retryable:
//! the caller must correct the input. Execution-time failures (store
//! unreachable, transaction conflicts) belong to the external store
//! client, not to this taxonomy.

use thiserror::Error;

/// Validation errors raised while checking operation inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Ambiguous input: exactly one of {expected} must be given, got {given}")]
    AmbiguousInput {
        expected: String,
        given: String,
    },

    #[error("Unknown reliability key '{key}'")]
    UnknownReliabilityKey {
        key: String,
    },

    #[error("Reliability 'derived' cannot be set directly; it is produced only by calculations")]
    DerivedNotSettable,

    #[error("Expression variables {expression_vars:?} do not match argument-path variables {argument_vars:?}")]
    VariableSetMismatch {
        expression_vars: Vec<String>,
        argument_vars: Vec<String>,
    },

    #[error("Expression cannot contain both '{first}' and '{second}'")]
    ConflictingAggregateKeywords {
        first: String,
        second: String,
    },

    #[error("Namespace prefix '{prefix}' is referenced but not registered")]
    UnknownNamespacePrefix {
        prefix: String,
    },

    #[error("Variable '?{name}' is reserved by the compiler and must not appear in caller input")]
    ReservedVariable {
        name: String,
    },

    #[error("At least one argument path is required")]
    EmptyArgumentPaths,

    #[error("'{value}' is not a valid URI: expected a prefixed name, a <>-wrapped IRI, or http(s)://")]
    InvalidUri {
        value: String,
    },
}

/// Top-level error type for opmqg.
///
/// Currently every failure is a [`ValidationError`]; the wrapper exists so
/// the public result type stays stable if further categories appear.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpmError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl OpmError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for opmqg operations.
pub type OpmResult<T> = Result<T, OpmError>;
