//! Proxy Generator
//!
//! The public entry point: create a proxy for a contract, bound to a target
//! and an interceptor.
//!
//! ```rust,ignore
//! #[contract]
//! pub trait Greeter {
//!     fn greet(&self, name: String) -> Result<String, ProxyError>;
//! }
//!
//! let proxy = ProxyGenerator::global()
//!     .create_interface_proxy_with_target::<dyn Greeter>(Arc::new(English), Arc::new(TracingInterceptor))?;
//! proxy.greet("world".to_string())?;
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::ProxyResult;
use crate::interceptor::Interceptor;
use crate::options::EngineOptions;
use crate::reflect::{
    describe, BindingStore, Contract, ContractDefinition, ContractDescriptor, DynamicProxy,
    DynamicTarget, LinkedTarget, ProxySynthesizer,
};

static GLOBAL: Lazy<ProxyGenerator> = Lazy::new(ProxyGenerator::default);

/// Creates proxies, caching one factory per contract
#[derive(Debug)]
pub struct ProxyGenerator {
    synthesizer: ProxySynthesizer,
    store: Arc<BindingStore>,
}

impl ProxyGenerator {
    /// Create a generator with its own factory cache and binding store
    pub fn new(options: EngineOptions) -> Self {
        Self {
            synthesizer: ProxySynthesizer::new(options),
            store: Arc::new(BindingStore::new()),
        }
    }

    /// Process-wide generator with default options
    pub fn global() -> &'static ProxyGenerator {
        &GLOBAL
    }

    /// Options this generator enforces
    pub fn options(&self) -> &EngineOptions {
        self.synthesizer.options()
    }

    /// The factory cache
    pub fn synthesizer(&self) -> &ProxySynthesizer {
        &self.synthesizer
    }

    /// The binding store shared by every proxy of this generator
    pub fn bindings(&self) -> &BindingStore {
        &self.store
    }

    /// Create a proxy implementing contract `C` that routes every call
    /// through `interceptor` to `target`.
    ///
    /// Synthesizes the contract's factory on first use. Fails with
    /// `UnsupportedContractKind` or `SynthesisFailure` if it cannot be built.
    pub fn create_interface_proxy_with_target<C>(
        &self,
        target: Arc<C>,
        interceptor: Arc<dyn Interceptor>,
    ) -> ProxyResult<C::Proxy>
    where
        C: Contract + ?Sized,
    {
        let factory = self.synthesizer.synthesize::<C>()?;
        let handle = factory.construct(Arc::clone(&self.store));
        handle.bind(target, interceptor)?;
        Ok(C::into_proxy(handle))
    }

    /// Create a proxy of contract `C` with no binding yet.
    ///
    /// Calls fail with `UnboundProxy` until `bind` is called on its handle.
    pub fn create_unbound_proxy<C>(&self) -> ProxyResult<C::Proxy>
    where
        C: Contract + ?Sized,
    {
        let factory = self.synthesizer.synthesize::<C>()?;
        Ok(C::into_proxy(factory.construct(Arc::clone(&self.store))))
    }

    /// Create a proxy over a contract assembled at runtime.
    ///
    /// Fails with `NonConformingTarget` if `target` lacks a handler for any
    /// contract method.
    pub fn create_dynamic_proxy(
        &self,
        definition: &ContractDefinition,
        target: Arc<DynamicTarget>,
        interceptor: Arc<dyn Interceptor>,
    ) -> ProxyResult<DynamicProxy> {
        let factory = self.synthesizer.synthesize_dynamic(definition)?;
        let linked = LinkedTarget::link(factory.descriptor(), &target)?;
        let handle = factory.construct(Arc::clone(&self.store));
        handle.bind_erased(Arc::new(linked), interceptor)?;
        Ok(DynamicProxy::new(handle))
    }

    /// Create an unbound proxy over a runtime contract
    pub fn create_unbound_dynamic_proxy(&self, definition: &ContractDefinition) -> ProxyResult<DynamicProxy> {
        let factory = self.synthesizer.synthesize_dynamic(definition)?;
        Ok(DynamicProxy::new(factory.construct(Arc::clone(&self.store))))
    }

    /// Describe contract `C` without synthesizing it
    pub fn describe<C>(&self) -> ProxyResult<ContractDescriptor>
    where
        C: Contract + ?Sized,
    {
        describe(&C::definition())
    }
}

impl Default for ProxyGenerator {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
