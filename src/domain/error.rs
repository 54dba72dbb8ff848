//! Domain validation errors for core domain types.
//!
//! These errors are returned by `FromStr` implementations and `try_new`
//! constructors when a domain invariant is violated.
//!
//! # Examples
//!
//! ```
//! use stackforge::domain::error::DomainError;
//! use stackforge::domain::routing::RoutingMode;
//!
//! let result = "tunnel".parse::<RoutingMode>();
//! assert!(matches!(result, Err(DomainError::UnknownRoutingMode { .. })));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Service name is not part of the stack.
    #[error("unknown service '{name}'")]
    UnknownService {
        /// The name that failed to parse.
        name: String,
    },

    /// Routing mode is not one of subdomain, path or port.
    #[error("unknown routing mode '{value}' (expected subdomain, path or port)")]
    UnknownRoutingMode {
        /// The value that failed to parse.
        value: String,
    },

    /// Certificate authority is not supported.
    #[error("unknown certificate authority '{value}'")]
    UnknownCertificateAuthority {
        /// The value that failed to parse.
        value: String,
    },

    /// Hardware snapshots always report at least one core.
    #[error("cpu core count must be at least 1")]
    ZeroCores,
}
