//! Per-method metadata and invocation hooks.
//!
//! A [`FunctionDescriptor`] is built once at registration time by generated
//! service code and never changes afterwards. It carries everything the
//! bridge needs to run one call:
//!
//! - the oneway flag,
//! - a factory turning the decoded argument list into the method's typed
//!   argument container ([`CallArgs`]),
//! - the invocation strategy, modeled as a tagged variant selected at
//!   registration time (blocking function vs. callback starter) rather
//!   than re-derived per call,
//! - a hook converting the raw result into its wire-level representation.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;

use crate::bridge::log_oneway_failure;
use crate::error::DispatchError;
use crate::reply::ReplyPromise;

/// Type-erased argument container for one call.
///
/// Generated code constructs this from the decoded argument list and
/// downcasts it back to the concrete argument struct inside the
/// invocation closure. The two sides are generated together, so a
/// downcast mismatch indicates a code-generation bug.
pub struct CallArgs(Box<dyn Any + Send>);

impl CallArgs {
    /// Wrap a concrete argument struct.
    pub fn new<T: Any + Send>(args: T) -> Self {
        CallArgs(Box::new(args))
    }

    /// Recover the concrete argument struct, or `None` on type mismatch.
    pub fn downcast<T: Any>(self) -> Option<T> {
        self.0.downcast::<T>().ok().map(|boxed| *boxed)
    }
}

impl std::fmt::Debug for CallArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallArgs(..)")
    }
}

/// Completion handle passed to callback-style implementations.
///
/// Exactly one of [`complete`](Completion::complete) or
/// [`fail`](Completion::fail) should be invoked per the contract of the
/// async implementation; the handle is consumed either way. The callback
/// may fire on any thread.
pub struct Completion {
    kind: CompletionKind,
}

enum CompletionKind {
    /// Forward the outcome into the call's reply.
    Reply { promise: ReplyPromise, method: String },
    /// Oneway variant: the reply was already acknowledged at dispatch
    /// time, so success is dropped and failure is only logged.
    OnewayLog { method: String },
}

impl Completion {
    pub(crate) fn reply(promise: ReplyPromise, method: String) -> Self {
        Completion {
            kind: CompletionKind::Reply { promise, method },
        }
    }

    pub(crate) fn oneway_log(method: String) -> Self {
        Completion {
            kind: CompletionKind::OnewayLog { method },
        }
    }

    /// Report a successful result.
    pub fn complete(self, value: Value) {
        match self.kind {
            CompletionKind::Reply { promise, .. } => {
                promise.complete(value);
            }
            CompletionKind::OnewayLog { .. } => {}
        }
    }

    /// Report a failure.
    pub fn fail(self, error: DispatchError) {
        match self.kind {
            CompletionKind::Reply { promise, .. } => {
                promise.fail(error);
            }
            CompletionKind::OnewayLog { method } => {
                log_oneway_failure(Some(&method), &error);
            }
        }
    }

    /// The method name this completion belongs to.
    pub fn method(&self) -> &str {
        match &self.kind {
            CompletionKind::Reply { method, .. } => method,
            CompletionKind::OnewayLog { method } => method,
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("method", &self.method())
            .finish()
    }
}

type ArgsFactory = Arc<dyn Fn(&[Value]) -> Result<CallArgs, DispatchError> + Send + Sync>;
type ResultConversion = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub(crate) type BlockingFn = Arc<dyn Fn(CallArgs) -> Result<Value, DispatchError> + Send + Sync>;
pub(crate) type CallbackFn = Arc<dyn Fn(CallArgs, Completion) + Send + Sync>;

/// Invocation strategy, fixed at registration time.
#[derive(Clone)]
pub(crate) enum Invoker {
    /// Synchronous function; runs on the blocking executor.
    Blocking(BlockingFn),
    /// Callback starter; returns immediately and completes via [`Completion`].
    Callback(CallbackFn),
}

/// Immutable per-method metadata plus the hooks needed to marshal
/// arguments, invoke the implementation, and convert results.
#[derive(Clone)]
pub struct FunctionDescriptor {
    name: String,
    oneway: bool,
    new_args: ArgsFactory,
    invoker: Option<Invoker>,
    convert_result: ResultConversion,
}

impl FunctionDescriptor {
    /// Describe a synchronous (blocking) method.
    ///
    /// `call` runs on the blocking executor, never on the dispatch thread.
    pub fn blocking<A, F>(name: impl Into<String>, oneway: bool, new_args: A, call: F) -> Self
    where
        A: Fn(&[Value]) -> Result<CallArgs, DispatchError> + Send + Sync + 'static,
        F: Fn(CallArgs) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        FunctionDescriptor {
            name: name.into(),
            oneway,
            new_args: Arc::new(new_args),
            invoker: Some(Invoker::Blocking(Arc::new(call))),
            convert_result: Arc::new(|value| value),
        }
    }

    /// Describe an asynchronous (callback) method.
    ///
    /// `start` must return promptly; the eventual outcome is delivered
    /// through the [`Completion`] handle, possibly from another thread.
    pub fn callback<A, F>(name: impl Into<String>, oneway: bool, new_args: A, start: F) -> Self
    where
        A: Fn(&[Value]) -> Result<CallArgs, DispatchError> + Send + Sync + 'static,
        F: Fn(CallArgs, Completion) + Send + Sync + 'static,
    {
        FunctionDescriptor {
            name: name.into(),
            oneway,
            new_args: Arc::new(new_args),
            invoker: Some(Invoker::Callback(Arc::new(start))),
            convert_result: Arc::new(|value| value),
        }
    }

    /// Describe a method declared in the IDL but not backed by any
    /// implementation.
    ///
    /// Registering such a descriptor violates the registry contract; the
    /// router answers calls to it with `UnknownMethod` defensively instead
    /// of panicking. Exists so metadata-only function tables stay
    /// representable.
    pub fn without_implementation<A>(name: impl Into<String>, oneway: bool, new_args: A) -> Self
    where
        A: Fn(&[Value]) -> Result<CallArgs, DispatchError> + Send + Sync + 'static,
    {
        FunctionDescriptor {
            name: name.into(),
            oneway,
            new_args: Arc::new(new_args),
            invoker: None,
            convert_result: Arc::new(|value| value),
        }
    }

    /// Attach a conversion from the raw result object to its wire-level
    /// representation. Applied on the blocking non-oneway path; callback
    /// implementations deliver the final value themselves.
    pub fn with_result_conversion<F>(mut self, convert: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.convert_result = Arc::new(convert);
        self
    }

    /// The bare method name this descriptor was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the caller is acknowledged at dispatch time rather than
    /// at completion time.
    pub fn is_oneway(&self) -> bool {
        self.oneway
    }

    /// Whether the method uses the callback execution style.
    pub fn is_async(&self) -> bool {
        matches!(self.invoker, Some(Invoker::Callback(_)))
    }

    /// Whether the descriptor is backed by an implementation.
    pub fn has_implementation(&self) -> bool {
        self.invoker.is_some()
    }

    pub(crate) fn new_args(&self, raw: &[Value]) -> Result<CallArgs, DispatchError> {
        (self.new_args)(raw)
    }

    pub(crate) fn invoker(&self) -> Option<&Invoker> {
        self.invoker.as_ref()
    }

    pub(crate) fn result_conversion(&self) -> ResultConversion {
        self.convert_result.clone()
    }
}

impl std::fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let style = match self.invoker {
            Some(Invoker::Blocking(_)) => "blocking",
            Some(Invoker::Callback(_)) => "callback",
            None => "unimplemented",
        };
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("oneway", &self.oneway)
            .field("style", &style)
            .finish()
    }
}
