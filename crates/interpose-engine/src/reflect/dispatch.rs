//! Dispatch Core
//!
//! The single path every proxy call takes:
//!
//! 1. resolve the proxy's binding
//! 2. `before_invoke`
//! 3. resolve the method identity, check the arguments, call the target
//! 4. `after_invoke`, whether or not step 3 failed
//! 5. return the result
//!
//! A failing `before_invoke` aborts the call; the target and `after_invoke`
//! never run. A target panic is caught and surfaced as a
//! `TargetInvocationFailure`. When both step 3 and `after_invoke` fail, the
//! step 3 failure is returned and the hook failure is logged.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{Hook, ProxyError, ProxyResult};
use crate::reflect::binding::TargetRef;
use crate::reflect::contract::MethodId;
use crate::reflect::marshal::ArgumentPack;
use crate::reflect::proxy::ProxyHandle;
use crate::value::Value;

/// A target method panicked during dispatch
#[derive(Debug, thiserror::Error)]
#[error("target panicked: {message}")]
pub struct TargetPanic {
    /// Panic payload rendered as text
    pub message: String,
}

impl TargetPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Self { message }
    }
}

/// Route one call through the proxy's interceptor to its target.
pub fn invoke(method: MethodId, proxy: &ProxyHandle, args: ArgumentPack) -> ProxyResult<Value> {
    let binding = proxy.store().lookup(proxy.id())?;

    tracing::trace!(proxy = %proxy.id(), method = %method, "dispatching proxy call");

    let interceptor = binding.interceptor();
    interceptor
        .before_invoke()
        .map_err(|source| ProxyError::InterceptorFailure {
            hook: Hook::Before,
            source,
        })?;

    let outcome = call_target(method, proxy, binding.target(), args);
    let after = interceptor.after_invoke();

    match (outcome, after) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(source)) => Err(ProxyError::InterceptorFailure {
            hook: Hook::After,
            source,
        }),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(hook_err)) => {
            tracing::warn!(
                method = %method,
                error = %hook_err,
                "after_invoke failed after a failed call"
            );
            Err(err)
        }
    }
}

/// Resolve the method, check the arguments and run the target.
fn call_target(
    method: MethodId,
    proxy: &ProxyHandle,
    target: &TargetRef,
    args: ArgumentPack,
) -> ProxyResult<Value> {
    let factory = proxy.factory();
    let signature = factory
        .descriptor()
        .method(method)
        .ok_or_else(|| ProxyError::unknown_method(method))?;
    args.check(signature)?;

    catch_unwind(AssertUnwindSafe(|| {
        factory.invoke_target(&**target, signature, args)
    }))
    .unwrap_or_else(|payload| {
        Err(ProxyError::TargetInvocationFailure {
            method: signature.name().to_string(),
            source: Box::new(TargetPanic::from_payload(payload)),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(TargetPanic::from_payload(payload).message, "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(TargetPanic::from_payload(payload).message, "bang");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(TargetPanic::from_payload(payload).message, "Unknown panic");
    }
}
