//! Runtime contracts
//!
//! Contracts assembled at runtime have no Rust trait to implement, so their
//! targets are method tables: a name-keyed set of handlers, linked against
//! the contract's descriptor when the proxy is bound. After linking,
//! dispatch is a direct indexed call by slot with no name lookup.
//!
//! ```rust,ignore
//! let target = DynamicTarget::new()
//!     .with_method("greet", |_, mut args| {
//!         let name: String = args.take(0)?;
//!         Ok(Value::string(format!("hello {}", name)))
//!     });
//! let proxy = generator.create_dynamic_proxy(&definition, Arc::new(target), interceptor)?;
//! let reply = proxy.call("greet", ("world".to_string(),))?;
//! ```

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{BoxError, ProxyError, ProxyResult};
use crate::interceptor::Interceptor;
use crate::reflect::contract::{ContractDescriptor, MethodId, MethodSignature};
use crate::reflect::marshal::{ArgumentPack, PackArgs};
use crate::reflect::proxy::ProxyHandle;
use crate::value::Value;

/// Handler serving one method name of a runtime contract.
///
/// Receives the resolved signature, so one handler can serve every overload
/// of a name.
pub type MethodHandler =
    Arc<dyn Fn(&MethodSignature, ArgumentPack) -> Result<Value, BoxError> + Send + Sync>;

/// Name-keyed method table serving as the target of a runtime contract
#[derive(Default, Clone)]
pub struct DynamicTarget {
    handlers: FxHashMap<String, MethodHandler>,
}

impl DynamicTarget {
    /// Create an empty method table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler by method name
    pub fn register(
        &mut self,
        name: &str,
        handler: impl Fn(&MethodSignature, ArgumentPack) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) {
        self.handlers.insert(name.to_string(), Arc::new(handler));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_method(
        mut self,
        name: &str,
        handler: impl Fn(&MethodSignature, ArgumentPack) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.register(name, handler);
        self
    }

    /// Get a handler by name
    pub fn get(&self, name: &str) -> Option<MethodHandler> {
        self.handlers.get(name).cloned()
    }

    /// Check if a handler is registered
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for DynamicTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("DynamicTarget").field("methods", &names).finish()
    }
}

/// A method table resolved against one contract, indexed by slot
pub struct LinkedTarget {
    handlers: Vec<MethodHandler>,
}

impl LinkedTarget {
    /// Resolve every contract method to a handler.
    ///
    /// Fails with `NonConformingTarget` if any method name has no handler.
    pub fn link(descriptor: &ContractDescriptor, target: &DynamicTarget) -> ProxyResult<Self> {
        let mut handlers = Vec::with_capacity(descriptor.len());
        for method in descriptor.methods() {
            match target.get(method.name()) {
                Some(handler) => handlers.push(handler),
                None => {
                    return Err(ProxyError::NonConformingTarget {
                        contract: descriptor.name().to_string(),
                        reason: format!("no handler for method '{}'", method.name()),
                    });
                }
            }
        }
        Ok(Self { handlers })
    }

    /// Call the handler linked at the method's slot.
    ///
    /// The returned value must fit the declared return type.
    pub fn call(&self, method: &MethodSignature, args: ArgumentPack) -> ProxyResult<Value> {
        let handler = self
            .handlers
            .get(method.id().slot() as usize)
            .ok_or_else(|| ProxyError::unknown_method(method.id()))?;

        let value = handler(method, args).map_err(|source| handler_failure(method, source))?;

        if !method.return_type().accepts(&value) {
            return Err(ProxyError::mismatch(
                format!("{} returned from '{}'", method.return_type(), method.name()),
                value.type_name(),
            ));
        }
        Ok(value)
    }

    /// Number of linked handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handler is linked
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A marshaling failure raised while the handler unpacks its arguments is a
/// call failure, not a target failure.
fn handler_failure(method: &MethodSignature, source: BoxError) -> ProxyError {
    match source.downcast::<ProxyError>() {
        Ok(err) if matches!(*err, ProxyError::MarshalTypeMismatch { .. }) => *err,
        Ok(err) => ProxyError::TargetInvocationFailure {
            method: method.name().to_string(),
            source: err,
        },
        Err(source) => ProxyError::TargetInvocationFailure {
            method: method.name().to_string(),
            source,
        },
    }
}

impl fmt::Debug for LinkedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedTarget")
            .field("count", &self.handlers.len())
            .finish()
    }
}

/// Proxy over a runtime contract.
///
/// Calls go by [`MethodId`] or by name; both take the same dispatch path as
/// generated proxies.
#[derive(Debug)]
pub struct DynamicProxy {
    handle: ProxyHandle,
}

impl DynamicProxy {
    pub(crate) fn new(handle: ProxyHandle) -> Self {
        Self { handle }
    }

    /// Descriptor of the contract this proxy satisfies
    pub fn descriptor(&self) -> &ContractDescriptor {
        self.handle.descriptor()
    }

    /// Underlying proxy handle
    pub fn proxy_handle(&self) -> &ProxyHandle {
        &self.handle
    }

    /// Identity of the first method with the given name
    pub fn method(&self, name: &str) -> Option<MethodId> {
        self.descriptor().find(name).map(|m| m.id())
    }

    /// Bind an unbound proxy to a method table
    pub fn bind(&self, target: Arc<DynamicTarget>, interceptor: Arc<dyn Interceptor>) -> ProxyResult<()> {
        let linked = LinkedTarget::link(self.descriptor(), &target)?;
        self.handle.bind_erased(Arc::new(linked), interceptor)
    }

    /// Invoke a method by identity
    pub fn invoke(&self, method: MethodId, args: impl PackArgs) -> ProxyResult<Value> {
        self.handle.invoke(method, args)
    }

    /// Invoke a method by name.
    ///
    /// With overloads, the first one whose parameters accept the arguments
    /// is chosen.
    pub fn call(&self, name: &str, args: impl PackArgs) -> ProxyResult<Value> {
        let args = args.pack_args();
        let mut overloads = self.descriptor().overloads(name).peekable();
        let first = overloads
            .peek()
            .copied()
            .ok_or_else(|| ProxyError::UnknownMethod(name.to_string()))?;

        let chosen = overloads
            .find(|m| args.check(m).is_ok())
            .unwrap_or(first)
            .id();
        // A mismatch against the first overload is reported by the dispatch check
        self.handle.invoke(chosen, args)
    }
}
