//! Binding Store
//!
//! Associates each proxy instance with exactly one target and exactly one
//! interceptor. Keyed by proxy identity, never by value. Bindings are
//! set-once; the entry disappears when the proxy is dropped.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{ProxyError, ProxyResult};
use crate::interceptor::Interceptor;
use crate::reflect::proxy::ProxyId;

/// Type-erased reference to a bound target
pub type TargetRef = Arc<dyn Any + Send + Sync>;

/// An immutable (target, interceptor) pair
#[derive(Clone)]
pub struct Binding {
    target: TargetRef,
    interceptor: Arc<dyn Interceptor>,
}

impl Binding {
    /// Create a binding
    pub fn new(target: TargetRef, interceptor: Arc<dyn Interceptor>) -> Self {
        Self {
            target,
            interceptor,
        }
    }

    /// The bound target
    pub fn target(&self) -> &TargetRef {
        &self.target
    }

    /// The bound interceptor
    pub fn interceptor(&self) -> &Arc<dyn Interceptor> {
        &self.interceptor
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("target", &Arc::as_ptr(&self.target))
            .field("interceptor", &Arc::as_ptr(&self.interceptor))
            .finish()
    }
}

/// Concurrent proxy-id -> binding map
#[derive(Debug, Default)]
pub struct BindingStore {
    bindings: DashMap<ProxyId, Binding>,
}

impl BindingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            bindings: DashMap::new(),
        }
    }

    /// Bind a proxy to its target and interceptor.
    ///
    /// Fails with `AlreadyBound` if the proxy already has a binding.
    pub fn bind(
        &self,
        proxy: ProxyId,
        target: TargetRef,
        interceptor: Arc<dyn Interceptor>,
    ) -> ProxyResult<()> {
        match self.bindings.entry(proxy) {
            Entry::Occupied(_) => Err(ProxyError::AlreadyBound(proxy)),
            Entry::Vacant(slot) => {
                slot.insert(Binding::new(target, interceptor));
                tracing::trace!(proxy = %proxy, "bound proxy");
                Ok(())
            }
        }
    }

    /// Resolve the binding of a proxy.
    ///
    /// The binding is cloned out so no shard lock is held across the call.
    pub fn lookup(&self, proxy: ProxyId) -> ProxyResult<Binding> {
        self.bindings
            .get(&proxy)
            .map(|entry| entry.value().clone())
            .ok_or(ProxyError::UnboundProxy(proxy))
    }

    /// Release the association; returns whether a binding existed
    pub fn unbind(&self, proxy: ProxyId) -> bool {
        let removed = self.bindings.remove(&proxy).is_some();
        if removed {
            tracing::trace!(proxy = %proxy, "unbound proxy");
        }
        removed
    }

    /// Check whether a proxy is bound
    pub fn contains(&self, proxy: ProxyId) -> bool {
        self.bindings.contains_key(&proxy)
    }

    /// Number of live bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if no proxy is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::NoopInterceptor;

    fn target() -> TargetRef {
        Arc::new(String::from("target"))
    }

    #[test]
    fn test_bind_and_lookup() {
        let store = BindingStore::new();
        let proxy = ProxyId::new(1);
        let target = target();

        store
            .bind(proxy, Arc::clone(&target), Arc::new(NoopInterceptor))
            .unwrap();

        let binding = store.lookup(proxy).unwrap();
        assert!(Arc::ptr_eq(binding.target(), &target));
        assert!(store.contains(proxy));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_bind_is_set_once() {
        let store = BindingStore::new();
        let proxy = ProxyId::new(2);
        store.bind(proxy, target(), Arc::new(NoopInterceptor)).unwrap();

        let err = store.bind(proxy, target(), Arc::new(NoopInterceptor)).unwrap_err();
        assert!(matches!(err, ProxyError::AlreadyBound(id) if id == proxy));
    }

    #[test]
    fn test_lookup_unbound() {
        let store = BindingStore::new();
        let err = store.lookup(ProxyId::new(3)).unwrap_err();
        assert!(matches!(err, ProxyError::UnboundProxy(_)));
    }

    #[test]
    fn test_unbind() {
        let store = BindingStore::new();
        let proxy = ProxyId::new(4);
        store.bind(proxy, target(), Arc::new(NoopInterceptor)).unwrap();

        assert!(store.unbind(proxy));
        assert!(!store.unbind(proxy));
        assert!(store.is_empty());
        assert!(store.lookup(proxy).is_err());

        // A released id can be bound again
        store.bind(proxy, target(), Arc::new(NoopInterceptor)).unwrap();
    }

    #[test]
    fn test_concurrent_binds_one_winner() {
        let store = Arc::new(BindingStore::new());
        let proxy = ProxyId::new(5);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.bind(proxy, target(), Arc::new(NoopInterceptor)).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
