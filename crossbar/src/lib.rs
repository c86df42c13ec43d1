//! # Crossbar
//!
//! Call-dispatch core for multiplexed RPC services.
//!
//! Crossbar sits between a transport-agnostic request/response layer and
//! generated service implementations. Given a decoded call — a flat
//! `[service ":"] method` name plus an ordered argument list — it:
//!
//! - resolves the target service and method against an immutable
//!   registry built once at construction,
//! - bridges three execution styles (synchronous-blocking,
//!   asynchronous-callback, and fire-and-forget oneway) into one uniform
//!   reply contract,
//! - translates every invocation failure into a small application-level
//!   error taxonomy delivered through a single-assignment reply.
//!
//! It does not frame, serialize, authenticate, or time out calls; those
//! belong to the surrounding transport.
//!
//! # Example
//!
//! ```rust,ignore
//! let dispatcher = CallDispatcher::builder()
//!     .service(Arc::new(hello_impl))          // default service
//!     .named_service("calc", Arc::new(calc))  // multiplexed service
//!     .build()?;
//!
//! // Transport loop:
//! let call = Call::new("calc:add", params);
//! let outcome = dispatcher.serve(&call).await;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Invocation bridge normalizing execution styles into one reply.
mod bridge;

/// Per-method metadata and invocation hooks.
pub mod descriptor;

/// Top-level dispatcher and its builder.
pub mod dispatcher;

/// Error taxonomy for dispatch and registry construction.
pub mod error;

/// Blocking-task executor boundary.
pub mod executor;

/// Immutable service registry.
pub mod registry;

/// Single-assignment reply promise/future.
pub mod reply;

/// Flat method-name resolution.
pub mod router;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use descriptor::{CallArgs, Completion, FunctionDescriptor};
pub use dispatcher::{Call, CallDispatcher, CallDispatcherBuilder};
pub use error::{DispatchError, RegistryError};
pub use executor::{BlockingExecutor, TokioBlockingExecutor};
pub use registry::{RpcService, ServiceEntry, ServiceRegistry};
pub use reply::{ReplyFuture, ReplyPromise, reply_channel};
pub use router::{resolve, split_method_name};

/// Decoded argument and result representation exchanged with the
/// transport layer.
pub use serde_json::Value;

pub use bridge::invoke;
