//! Error types for Headwater.

use thiserror::Error;

/// Result type alias using Headwater's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Headwater operations.
///
/// Every fallible operation in the crate returns one of these kinds. All
/// validation happens before any mutation, so a returned error implies no
/// partial state change.
#[derive(Error, Debug)]
pub enum Error {
    /// A component (or allocator binding) with this name already exists.
    #[error("name not unique: '{0}' already exists")]
    NameNotUnique(String),

    /// The named component, listener, or allocator entry is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation requires a different component variant.
    #[error("wrong component type: expected {expected}, got {actual}")]
    WrongType {
        /// The variant the operation requires.
        expected: &'static str,
        /// The variant that was found.
        actual: &'static str,
    },

    /// The component (or graph) is already linked.
    #[error("already linked: {0}")]
    AlreadyLinked(String),

    /// The component (or graph) is not linked.
    #[error("not linked: {0}")]
    NotLinked(String),

    /// The component is not a child of the given parent.
    #[error("component '{component}' is not a child of '{parent}'")]
    NotChild {
        /// The component whose membership was asserted.
        component: String,
        /// The parent it is not a child of.
        parent: String,
    },

    /// The listener callback is already registered.
    #[error("listener already registered")]
    AlreadyRegistered,

    /// A parameter failed validation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A required path, URI, or resource is missing or unusable.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// A structural constraint was violated (singleton collision,
    /// mutually exclusive components).
    #[error("structural conflict: {0}")]
    StructuralConflict(String),

    /// An unexpected lower-layer failure, converted at the boundary.
    #[error("internal fault: {0}")]
    InternalFault(String),
}

// Lower-layer I/O failures never unwind into caller code with their own
// type; they surface as InternalFault.
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::InternalFault(e.to_string())
    }
}

impl Error {
    /// Construct a `NotFound` for a named entity.
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Error::NotFound(what.to_string())
    }

    /// Construct an `InvalidParameter` with a message.
    pub fn invalid(msg: impl std::fmt::Display) -> Self {
        Error::InvalidParameter(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts_to_internal_fault() {
        let io = std::io::Error::other("boom");
        let err: Error = io.into();
        assert!(matches!(err, Error::InternalFault(_)));
    }

    #[test]
    fn test_display_messages() {
        let err = Error::NameNotUnique("cam-0".into());
        assert_eq!(err.to_string(), "name not unique: 'cam-0' already exists");

        let err = Error::NotChild {
            component: "cam-0".into(),
            parent: "main".into(),
        };
        assert_eq!(err.to_string(), "component 'cam-0' is not a child of 'main'");
    }
}
