//! Top-level call dispatcher: registry + router + bridge behind one
//! `serve` entry point.
//!
//! The transport decodes a call into a [`Call`] (flat method name plus
//! ordered argument values), hands it to [`CallDispatcher::serve`], and
//! awaits the returned [`ReplyFuture`]. The dispatcher holds no mutable
//! state: one instance serves unbounded concurrent calls.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::bridge;
use crate::error::RegistryError;
use crate::executor::{BlockingExecutor, TokioBlockingExecutor};
use crate::registry::{RpcService, ServiceRegistry};
use crate::reply::{ReplyFuture, reply_channel};
use crate::router;

/// A decoded incoming call as supplied by the transport.
#[derive(Debug, Clone)]
pub struct Call {
    method: String,
    params: Vec<Value>,
}

impl Call {
    /// Create a call from a flat method name and its decoded arguments.
    ///
    /// The method name may carry a `service:` prefix to address a
    /// multiplexed service; without one it targets the default service.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Call {
            method: method.into(),
            params,
        }
    }

    /// The flat method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The ordered decoded argument values.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Stateless call dispatcher over an immutable service registry.
///
/// Cheap to clone; clones share the registry and the executor.
#[derive(Clone)]
pub struct CallDispatcher {
    registry: Arc<ServiceRegistry>,
    executor: Arc<dyn BlockingExecutor>,
}

impl CallDispatcher {
    /// Create a dispatcher from an already-built registry and executor.
    pub fn new(registry: ServiceRegistry, executor: Arc<dyn BlockingExecutor>) -> Self {
        CallDispatcher {
            registry: Arc::new(registry),
            executor,
        }
    }

    /// Start building a dispatcher.
    pub fn builder() -> CallDispatcherBuilder {
        CallDispatcherBuilder::new()
    }

    /// The registry of services being served.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Dispatch one call and return its reply future.
    ///
    /// Always returns a future; resolution and invocation failures are
    /// delivered through it, never raised here. The future resolves when
    /// the call completes — or immediately for oneway calls and
    /// resolution failures.
    pub fn serve(&self, call: &Call) -> ReplyFuture {
        let (promise, future) = reply_channel();

        match router::resolve(&self.registry, call.method()) {
            Ok((_entry, descriptor)) => {
                trace!(method = call.method(), oneway = descriptor.is_oneway(), "dispatching call");
                bridge::invoke(
                    descriptor,
                    self.executor.as_ref(),
                    call.method(),
                    call.params(),
                    promise,
                );
            }
            Err(error) => {
                debug!(method = call.method(), "call resolution failed");
                promise.fail(error);
            }
        }

        future
    }
}

impl std::fmt::Debug for CallDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallDispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

/// Builder wiring service implementations and the blocking executor into
/// a [`CallDispatcher`].
///
/// Registration accepts either a single unqualified implementation
/// ([`service`](CallDispatcherBuilder::service)) or named implementations
/// for multiplexing ([`named_service`](CallDispatcherBuilder::named_service));
/// the two forms can be mixed. Without an explicit executor the Tokio
/// blocking pool is used.
#[derive(Default)]
pub struct CallDispatcherBuilder {
    implementations: HashMap<String, Vec<Arc<dyn RpcService>>>,
    executor: Option<Arc<dyn BlockingExecutor>>,
}

impl CallDispatcherBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation under the default (unqualified) service.
    pub fn service(self, implementation: Arc<dyn RpcService>) -> Self {
        self.named_service("", implementation)
    }

    /// Register an implementation under a service name for multiplexing.
    ///
    /// Several implementations may share one name; their function tables
    /// are merged, last registration winning on method-name collisions.
    pub fn named_service(
        mut self,
        name: impl Into<String>,
        implementation: Arc<dyn RpcService>,
    ) -> Self {
        self.implementations
            .entry(name.into())
            .or_default()
            .push(implementation);
        self
    }

    /// Use a specific blocking executor instead of the Tokio default.
    pub fn blocking_executor(mut self, executor: Arc<dyn BlockingExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Empty`] if no implementation was
    /// registered.
    pub fn build(self) -> Result<CallDispatcher, RegistryError> {
        let registry = ServiceRegistry::multiplexed(self.implementations)?;
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(TokioBlockingExecutor));
        Ok(CallDispatcher {
            registry: Arc::new(registry),
            executor,
        })
    }
}

impl std::fmt::Debug for CallDispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallDispatcherBuilder")
            .field("service_count", &self.implementations.len())
            .field("has_executor", &self.executor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::descriptor::{CallArgs, FunctionDescriptor};
    use crate::error::DispatchError;

    struct EchoService;

    impl RpcService for EchoService {
        fn function_table(self: Arc<Self>) -> Vec<FunctionDescriptor> {
            vec![FunctionDescriptor::blocking(
                "echo",
                false,
                |raw| Ok(CallArgs::new(raw.to_vec())),
                |args| {
                    let raw: Vec<Value> = args.downcast().ok_or(DispatchError::ServiceFailure {
                        method: "echo".to_string(),
                        message: "argument container mismatch".to_string(),
                    })?;
                    Ok(Value::Array(raw))
                },
            )]
        }
    }

    #[tokio::test]
    async fn test_builder_without_services_fails() {
        let result = CallDispatcher::builder().build();
        assert!(matches!(result, Err(RegistryError::Empty)));
    }

    #[tokio::test]
    async fn test_serve_default_service_with_tokio_executor() {
        let dispatcher = CallDispatcher::builder()
            .service(Arc::new(EchoService))
            .build()
            .expect("dispatcher");

        let call = Call::new("echo", vec![json!(1), json!("two")]);
        let result = dispatcher.serve(&call).await;
        assert_eq!(result, Ok(json!([1, "two"])));
    }

    #[tokio::test]
    async fn test_serve_unknown_method_fails_reply() {
        let dispatcher = CallDispatcher::builder()
            .service(Arc::new(EchoService))
            .build()
            .expect("dispatcher");

        let call = Call::new("nope", vec![]);
        let result = dispatcher.serve(&call).await;
        assert_eq!(
            result,
            Err(DispatchError::UnknownMethod {
                method: "nope".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_dispatcher_clones_share_registry() {
        let dispatcher = CallDispatcher::builder()
            .service(Arc::new(EchoService))
            .build()
            .expect("dispatcher");
        let clone = dispatcher.clone();

        let call = Call::new("echo", vec![json!("shared")]);
        assert_eq!(clone.serve(&call).await, Ok(json!(["shared"])));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let dispatcher = CallDispatcher::builder()
            .service(Arc::new(EchoService))
            .build()
            .expect("dispatcher");

        let mut futures = Vec::new();
        for i in 0..16 {
            let call = Call::new("echo", vec![json!(i)]);
            futures.push(dispatcher.serve(&call));
        }

        for (i, future) in futures.into_iter().enumerate() {
            assert_eq!(future.await, Ok(json!([i])));
        }
    }

    #[test]
    fn test_call_accessors() {
        let call = Call::new("calc:add", vec![json!(1), json!(2)]);
        assert_eq!(call.method(), "calc:add");
        assert_eq!(call.params(), &[json!(1), json!(2)]);
    }
}
