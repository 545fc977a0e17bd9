use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// The class decides how a transport reports the failure; the origin
/// records which layer raised it.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Entity type name that the registry does not know.
    pub fn unknown_entity(entity: &str) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Resource,
            format!("unknown entity type: '{entity}'"),
        )
    }

    /// No instance resolves for the identifier.
    pub fn entity_not_found(entity: &str, id: &str) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Resource,
            format!("entity not found: {entity}/{id}"),
        )
    }

    /// Property not declared on the entity type.
    pub fn property_not_found(entity: &str, property: &str) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Resource,
            format!("property not found: {entity}.{property}"),
        )
    }

    /// Verb categorically inapplicable to the target.
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::MethodNotAllowed,
            ErrorOrigin::Resource,
            message.into(),
        )
    }

    pub fn payload_too_large(size: usize, limit: usize) -> Self {
        Self::new(
            ErrorClass::PayloadTooLarge,
            ErrorOrigin::Resource,
            format!("attachment of {size} bytes exceeds the {limit} byte limit"),
        )
    }

    /// Storage backend failure; surfaced unchanged as a server error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Storage, message.into())
    }

    /// Repository lookup failure.
    pub fn repository(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Repository, message.into())
    }

    /// Construct an operation-origin invariant violation.
    pub(crate) fn operation_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Operation,
            message.into(),
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_method_not_allowed(&self) -> bool {
        matches!(self.class, ErrorClass::MethodNotAllowed)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Runtime error taxonomy. NotFound and MethodNotAllowed are client
/// errors and must never be conflated.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    Internal,
    InvariantViolation,
}

impl ErrorClass {
    /// HTTP status code a transport should report for this class.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::PayloadTooLarge => 413,
            Self::Internal | Self::InvariantViolation => 500,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Resource,
    Operation,
    Repository,
    Storage,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Resource => "resource",
            Self::Operation => "operation",
            Self::Repository => "repository",
            Self::Storage => "storage",
        };
        write!(f, "{label}")
    }
}
