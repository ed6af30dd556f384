//! Error taxonomy for document storage.
//!
//! The first four variants are part of the [`DocumentStore`] contract and
//! must be produced by every backend under the documented conditions.
//! Everything else is backend-specific: callers may only discriminate on
//! the contract variants and must treat any other value as an opaque
//! failure.
//!
//! [`DocumentStore`]: crate::DocumentStore

use thiserror::Error;

use crate::document::MAX_CONTENT_SIZE;

/// Errors produced by document stores and the store registry.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation targeted a Name with no existing version.
    #[error("document {name:?} not found")]
    NotFound { name: String },

    /// An operation's Name argument failed validation.
    #[error("invalid document name {name:?}")]
    InvalidName { name: String },

    /// Write content met or exceeded [`MAX_CONTENT_SIZE`].
    #[error("content is {size} bytes, at or over the {max} byte maximum", max = MAX_CONTENT_SIZE)]
    ContentTooLarge { size: usize },

    /// The store handle (or its lineage) has been closed.
    #[error("store is closed")]
    Closed,

    /// The string passed to [`new_store`](crate::new_store) is not a URI.
    #[error("{uri:?} is not a store URI: {message}")]
    Uri { uri: String, message: String },

    /// No factory has been registered for the URI scheme.
    #[error("unknown store scheme {scheme:?} (forgotten registration?)")]
    UnknownScheme { scheme: String },

    /// Backend-specific failure: I/O, driver, or malformed stored data.
    /// Opaque to callers; the shape of the source error is not part of the
    /// contract.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn not_found(name: impl Into<String>) -> Error {
        Error::NotFound { name: name.into() }
    }

    pub fn invalid_name(name: impl Into<String>) -> Error {
        Error::InvalidName { name: name.into() }
    }

    /// Wraps a backend-specific failure in the opaque [`Error::Backend`]
    /// bucket.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::Backend(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_invalid_name(&self) -> bool {
        matches!(self, Error::InvalidName { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Backend(Box::new(err))
    }
}
