//! Proxy instances
//!
//! Every synthesized proxy, generated or dynamic, wraps a [`ProxyHandle`]:
//! the proxy's identity, the factory it was built from, and the binding
//! store holding its target and interceptor. The handle exclusively owns the
//! binding; dropping it releases the association.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ProxyError, ProxyResult};
use crate::interceptor::Interceptor;
use crate::reflect::binding::{BindingStore, TargetRef};
use crate::reflect::contract::{Contract, ContractDescriptor, MethodId};
use crate::reflect::dispatch;
use crate::reflect::marshal::{ArgumentPack, PackArgs};
use crate::reflect::synthesizer::ProxyFactory;
use crate::value::Value;

/// Global counter for proxy IDs
static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one proxy instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u64);

impl ProxyId {
    /// Creates a proxy ID from a raw integer.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer identifier.
    pub fn raw(self) -> u64 {
        self.0
    }

    fn next() -> Self {
        Self(NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The state every proxy instance carries
pub struct ProxyHandle {
    id: ProxyId,
    factory: Arc<ProxyFactory>,
    store: Arc<BindingStore>,
}

impl ProxyHandle {
    pub(crate) fn new(factory: Arc<ProxyFactory>, store: Arc<BindingStore>) -> Self {
        Self {
            id: ProxyId::next(),
            factory,
            store,
        }
    }

    /// Proxy identity
    pub fn id(&self) -> ProxyId {
        self.id
    }

    /// The factory this proxy was constructed from
    pub fn factory(&self) -> &Arc<ProxyFactory> {
        &self.factory
    }

    /// Descriptor of the contract this proxy satisfies
    pub fn descriptor(&self) -> &ContractDescriptor {
        self.factory.descriptor()
    }

    /// Check whether the proxy currently has a binding
    pub fn is_bound(&self) -> bool {
        self.store.contains(self.id)
    }

    /// Bind an unbound proxy to a target of its contract.
    ///
    /// Fails with `AlreadyBound` on a second call and with
    /// `NonConformingTarget` if `C` is not the proxy's contract.
    pub fn bind<C>(&self, target: Arc<C>, interceptor: Arc<dyn Interceptor>) -> ProxyResult<()>
    where
        C: Contract + ?Sized,
    {
        if self.factory.target_type() != TypeId::of::<Arc<C>>() {
            return Err(ProxyError::NonConformingTarget {
                contract: self.descriptor().name().to_string(),
                reason: format!("target type {} belongs to another contract", std::any::type_name::<C>()),
            });
        }
        self.bind_erased(Arc::new(target), interceptor)
    }

    pub(crate) fn bind_erased(
        &self,
        target: TargetRef,
        interceptor: Arc<dyn Interceptor>,
    ) -> ProxyResult<()> {
        self.store.bind(self.id, target, interceptor)
    }

    pub(crate) fn store(&self) -> &BindingStore {
        &self.store
    }

    /// Invoke a contract method through the dispatch core
    pub fn invoke(&self, method: MethodId, args: impl PackArgs) -> ProxyResult<Value> {
        dispatch::invoke(method, self, args.pack_args())
    }

    /// Invoke the method declared at `slot`; used by generated proxy methods
    pub fn invoke_slot(&self, slot: usize, args: ArgumentPack) -> ProxyResult<Value> {
        let method = self
            .descriptor()
            .method_at(slot)
            .map(|m| m.id())
            .ok_or_else(|| {
                ProxyError::UnknownMethod(format!("{}#{}", self.descriptor().id(), slot))
            })?;
        dispatch::invoke(method, self, args)
    }
}

impl Drop for ProxyHandle {
    fn drop(&mut self) {
        self.store.unbind(self.id);
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("id", &self.id)
            .field("contract", &self.descriptor().name())
            .field("bound", &self.is_bound())
            .finish()
    }
}
