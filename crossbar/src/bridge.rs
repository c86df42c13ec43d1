//! Invocation bridge: one descriptor + decoded arguments → one reply.
//!
//! [`invoke`] normalizes the three execution styles into a single reply
//! contract:
//!
//! - **Callback style**: the implementation's starter is called on the
//!   dispatch thread and completes the reply through a [`Completion`]
//!   handle, possibly from another thread.
//! - **Blocking style**: the call is submitted to the blocking executor
//!   and completes the reply from the worker thread.
//! - **Oneway** (either style): the reply is completed with a null value
//!   when the call is accepted, not when it finishes; later failures are
//!   only logged.
//!
//! Nothing escapes to the caller of `invoke`: marshaling failures,
//! implementation errors, and panics all funnel into the reply (or the
//! log, for oneway). A reply that is already terminal — typically because
//! an external timeout fired — suppresses the blocking call entirely and
//! turns any late completion into a no-op.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;
use tracing::{trace, warn};

use crate::descriptor::{
    BlockingFn, CallArgs, CallbackFn, Completion, FunctionDescriptor, Invoker,
};
use crate::error::DispatchError;
use crate::executor::BlockingExecutor;
use crate::reply::ReplyPromise;

/// Execute one resolved call and deliver its outcome to the reply.
///
/// `method` is the full method name as received from the transport, used
/// for error messages and log context. Never panics and never returns an
/// error: every outcome reaches the reply, except oneway execution
/// failures, which are logged and suppressed.
pub fn invoke(
    descriptor: &FunctionDescriptor,
    executor: &dyn BlockingExecutor,
    method: &str,
    params: &[Value],
    reply: ReplyPromise,
) {
    // Argument marshaling errors fail the reply immediately; they are
    // never retried. A panicking factory counts as a marshaling failure
    // and must not unwind into the transport.
    let args = match catch_unwind(AssertUnwindSafe(|| descriptor.new_args(params))) {
        Ok(Ok(args)) => args,
        Ok(Err(error)) => {
            reply.fail(error);
            return;
        }
        Err(panic) => {
            reply.fail(DispatchError::InvalidArguments {
                method: method.to_string(),
                message: panic_message(panic),
            });
            return;
        }
    };

    match descriptor.invoker() {
        Some(Invoker::Callback(start)) => {
            invoke_callback(start, descriptor.is_oneway(), method, args, reply);
        }
        Some(Invoker::Blocking(call)) => {
            let call = Arc::clone(call);
            invoke_blocking(descriptor, call, method, args, reply, executor);
        }
        // The router filters unbacked descriptors; answer consistently if
        // one slips through anyway.
        None => {
            reply.fail(DispatchError::UnknownMethod {
                method: method.to_string(),
            });
        }
    }
}

fn invoke_callback(
    start: &CallbackFn,
    oneway: bool,
    method: &str,
    args: CallArgs,
    reply: ReplyPromise,
) {
    if oneway {
        let completion = Completion::oneway_log(method.to_string());
        match catch_unwind(AssertUnwindSafe(|| start(args, completion))) {
            Ok(()) => {
                // Acknowledged at dispatch time; the call may still be
                // running and will only ever reach the log from here on.
                reply.complete(Value::Null);
            }
            Err(panic) => {
                reply.fail(DispatchError::ServiceFailure {
                    method: method.to_string(),
                    message: panic_message(panic),
                });
            }
        }
    } else {
        let completion = Completion::reply(reply.clone(), method.to_string());
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| start(args, completion))) {
            // No-op if the starter already completed the reply before
            // panicking.
            reply.fail(DispatchError::ServiceFailure {
                method: method.to_string(),
                message: panic_message(panic),
            });
        }
    }
}

fn invoke_blocking(
    descriptor: &FunctionDescriptor,
    call: BlockingFn,
    method: &str,
    args: CallArgs,
    reply: ReplyPromise,
    executor: &dyn BlockingExecutor,
) {
    let oneway = descriptor.is_oneway();
    let convert = descriptor.result_conversion();
    let method = method.to_string();

    executor.submit(Box::new(move || {
        if reply.is_done() {
            // Closed already, most likely by an external timeout.
            trace!(method = %method, "reply already terminal, skipping blocking call");
            return;
        }

        if oneway {
            // Acknowledge before running; the caller is told "accepted".
            reply.complete(Value::Null);
            match catch_unwind(AssertUnwindSafe(|| call(args))) {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => log_oneway_failure(Some(&method), &error),
                Err(panic) => log_oneway_failure(Some(&method), &panic_message(panic)),
            }
        } else {
            match catch_unwind(AssertUnwindSafe(|| call(args).map(|raw| convert(raw)))) {
                Ok(Ok(result)) => {
                    reply.complete(result);
                }
                Ok(Err(error)) => {
                    reply.fail(error);
                }
                Err(panic) => {
                    reply.fail(DispatchError::ServiceFailure {
                        method,
                        message: panic_message(panic),
                    });
                }
            }
        }
    }));
}

/// Log a failure from a oneway call. The reply was already completed at
/// dispatch time, so the log is the only place the failure is visible.
pub(crate) fn log_oneway_failure(method: Option<&str>, cause: &dyn std::fmt::Display) {
    match method {
        Some(method) => {
            warn!(method = %method, cause = %cause, "unexpected failure from a one-way call");
        }
        // Should never happen, but losing the failure entirely is worse
        // than logging it without context.
        None => warn!(cause = %cause, "unexpected failure from a one-way call"),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "implementation panicked".to_string()
    }
}
