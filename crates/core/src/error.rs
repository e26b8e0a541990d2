//! Error taxonomy shared by the metrics engine, the cart service and the
//! store adapters.
//!
//! An empty result is never an error: metrics over empty tables return
//! zero-valued answers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two backing stores an operation ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// The relational store (`PostgreSQL`).
    Relational,
    /// The document store (`MongoDB`).
    Document,
}

impl StoreKind {
    /// Lowercase name used in routes and payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Document => "document",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "relational" | "postgres" => Ok(Self::Relational),
            "document" | "mongodb" => Ok(Self::Document),
            _ => Err(Error::Validation(format!("unknown store: {s}"))),
        }
    }
}

/// Errors produced by metric computations and cart operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The store could not be reached or a query failed.
    #[error("{store} store unavailable: {message}")]
    DataUnavailable {
        /// The store that failed.
        store: StoreKind,
        /// Human-readable cause.
        message: String,
    },

    /// Malformed input, rejected before reaching a store.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced product, cart, cart item or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data violates a domain invariant.
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
}

impl Error {
    /// Build a [`Error::DataUnavailable`] from any displayable cause.
    pub fn unavailable(store: StoreKind, cause: impl std::fmt::Display) -> Self {
        Self::DataUnavailable {
            store,
            message: cause.to_string(),
        }
    }

    /// Whether this error means the store itself is unreachable.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::DataUnavailable { .. })
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message_names_store() {
        let err = Error::unavailable(StoreKind::Document, "connection refused");
        assert!(err.is_unavailable());
        assert_eq!(
            err.to_string(),
            "document store unavailable: connection refused"
        );
    }

    #[test]
    fn test_store_kind_parses_aliases() {
        assert!(matches!("postgres".parse(), Ok(StoreKind::Relational)));
        assert!(matches!("document".parse(), Ok(StoreKind::Document)));
        assert!(matches!(
            "redis".parse::<StoreKind>(),
            Err(Error::Validation(_))
        ));
    }
}
