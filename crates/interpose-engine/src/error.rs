//! Error types for the proxy engine

use std::fmt;

use crate::reflect::{MethodId, ProxyId};

/// Type-erased error raised by targets and interceptor hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for engine operations
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Which interceptor hook failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// `before_invoke`
    Before,
    /// `after_invoke`
    After,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Before => write!(f, "before_invoke"),
            Hook::After => write!(f, "after_invoke"),
        }
    }
}

/// Proxy engine errors
///
/// Synthesis-time errors (`UnsupportedContractKind`, `SynthesisFailure`)
/// abort proxy creation. Everything else aborts only the call that raised it.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The contract has members that cannot be expressed as method calls
    #[error("Unsupported contract kind '{contract}': {reason}")]
    UnsupportedContractKind {
        /// Contract name
        contract: String,
        /// What made it unsupported
        reason: String,
    },

    /// Building the proxy factory was rejected by the host configuration
    #[error("Synthesis failed for contract '{contract}': {reason}")]
    SynthesisFailure {
        /// Contract name
        contract: String,
        /// Why synthesis was rejected
        reason: String,
    },

    /// A value could not be converted to the expected type
    #[error("Type mismatch: expected {expected}, got {found}")]
    MarshalTypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual runtime shape
        found: String,
    },

    /// The proxy already has a target binding
    #[error("Proxy {0} is already bound")]
    AlreadyBound(ProxyId),

    /// The proxy has no target binding
    #[error("Proxy {0} is not bound to a target")]
    UnboundProxy(ProxyId),

    /// A method identity or name does not resolve against the proxy's contract
    #[error("Unknown method {0}")]
    UnknownMethod(String),

    /// The target cannot serve the contract it is being bound to
    #[error("Target does not conform to contract '{contract}': {reason}")]
    NonConformingTarget {
        /// Contract name
        contract: String,
        /// What is missing or mismatched
        reason: String,
    },

    /// The target method failed; the original failure is the source
    #[error("Target method '{method}' failed: {source}")]
    TargetInvocationFailure {
        /// Method name
        method: String,
        /// Original failure raised by the target
        #[source]
        source: BoxError,
    },

    /// An interceptor hook failed
    #[error("Interceptor {hook} failed: {source}")]
    InterceptorFailure {
        /// The failing hook
        hook: Hook,
        /// Failure raised by the hook
        #[source]
        source: BoxError,
    },
}

impl ProxyError {
    /// Wrap a failure raised by a target method
    pub fn target_failure<E>(method: &str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ProxyError::TargetInvocationFailure {
            method: method.to_string(),
            source: Box::new(error),
        }
    }

    /// Build an unknown-method error for an identity
    pub fn unknown_method(method: MethodId) -> Self {
        ProxyError::UnknownMethod(method.to_string())
    }

    /// Build a type mismatch error
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ProxyError::MarshalTypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Check whether this error was raised by the target itself
    pub fn is_target_failure(&self) -> bool {
        matches!(self, ProxyError::TargetInvocationFailure { .. })
    }

    /// Check whether this error came from a given interceptor hook
    pub fn is_hook_failure(&self, hook: Hook) -> bool {
        matches!(self, ProxyError::InterceptorFailure { hook: h, .. } if *h == hook)
    }
}
