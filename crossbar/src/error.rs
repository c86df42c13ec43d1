//! Error types for the call-dispatch layer.
//!
//! Two families live here:
//! - [`DispatchError`]: the per-call failure taxonomy surfaced through a
//!   reply. These are serializable so the transport can encode them into
//!   the wire format.
//! - [`RegistryError`]: construction-time failures raised while wiring up
//!   the service registry.

use serde::{Deserialize, Serialize};

/// Failures surfaced to the caller through a failed reply.
///
/// Resolution failures intentionally collapse "unknown service" and
/// "unknown method" into a single [`DispatchError::UnknownMethod`]: the
/// caller is not told which part of the name was wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchError {
    /// No service/method pair matches the call's method name.
    UnknownMethod {
        /// The full method name as received from the transport.
        method: String,
    },

    /// Constructing the typed argument container from the decoded
    /// argument list failed. Marshaling errors are never retried.
    InvalidArguments {
        /// The method whose arguments failed to marshal.
        method: String,
        /// Human-readable description of the marshaling failure.
        message: String,
    },

    /// The service implementation failed during execution.
    ///
    /// For oneway calls this error never reaches the reply; it is only
    /// logged, since the caller was already told "accepted".
    ServiceFailure {
        /// The method whose implementation failed.
        method: String,
        /// Human-readable description of the failure.
        message: String,
    },
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::UnknownMethod { method } => {
                write!(f, "unknown method: {}", method)
            }
            DispatchError::InvalidArguments { method, message } => {
                write!(f, "invalid arguments for {}: {}", method, message)
            }
            DispatchError::ServiceFailure { method, message } => {
                write!(f, "service failure in {}: {}", method, message)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Errors raised while building a [`ServiceRegistry`](crate::ServiceRegistry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registration mapping contained no service implementations.
    #[error("no service implementations registered")]
    Empty,
}
