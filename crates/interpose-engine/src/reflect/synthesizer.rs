//! Proxy Synthesizer
//!
//! Turns a contract into a reusable [`ProxyFactory`]. Compile-time contracts
//! (`#[contract]` traits) are keyed by their Rust type; runtime contracts are
//! keyed by their fingerprint, so two definitions with the same name and
//! signature set share one factory.
//!
//! ## Lifecycle
//!
//! Each contract moves through `Unsynthesized -> Synthesizing -> Ready`.
//! `Ready` is terminal: the factory is never invalidated and every proxy
//! built from it keeps resolving its method identities. Concurrent first use
//! serializes on the contract's `OnceCell`, so a contract is synthesized at
//! most once. A failed synthesis leaves the slot `Unsynthesized`.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::error::{ProxyError, ProxyResult};
use crate::options::EngineOptions;
use crate::reflect::binding::BindingStore;
use crate::reflect::contract::{describe, Contract, ContractDefinition, ContractDescriptor, ContractId, MethodSignature};
use crate::reflect::dynamic::LinkedTarget;
use crate::reflect::marshal::ArgumentPack;
use crate::reflect::proxy::ProxyHandle;
use crate::value::Value;

/// Resolves a method identity against an erased target and performs the call
type TargetInvoker =
    Box<dyn Fn(&(dyn Any + Send + Sync), &MethodSignature, ArgumentPack) -> ProxyResult<Value> + Send + Sync>;

/// Synthesis state of one contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisState {
    /// Never synthesized (or the last attempt failed)
    Unsynthesized,
    /// A thread is building the factory
    Synthesizing,
    /// Factory available
    Ready,
}

/// Reusable factory constructing proxy instances of one contract
pub struct ProxyFactory {
    descriptor: ContractDescriptor,
    invoker: TargetInvoker,
    target_type: TypeId,
    constructed: AtomicU64,
}

impl ProxyFactory {
    /// Descriptor of the contract
    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    /// Number of proxy instances constructed so far
    pub fn instances_created(&self) -> u64 {
        self.constructed.load(Ordering::Relaxed)
    }

    /// Construct a new, unbound proxy handle
    pub(crate) fn construct(self: &Arc<Self>, store: Arc<BindingStore>) -> ProxyHandle {
        self.constructed.fetch_add(1, Ordering::Relaxed);
        ProxyHandle::new(Arc::clone(self), store)
    }

    pub(crate) fn target_type(&self) -> TypeId {
        self.target_type
    }

    pub(crate) fn invoke_target(
        &self,
        target: &(dyn Any + Send + Sync),
        method: &MethodSignature,
        args: ArgumentPack,
    ) -> ProxyResult<Value> {
        (self.invoker)(target, method, args)
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("contract", &self.descriptor.name())
            .field("methods", &self.descriptor.len())
            .field("instances", &self.instances_created())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CacheKey {
    Static(TypeId),
    Dynamic(ContractId),
}

#[derive(Default)]
struct SynthesisSlot {
    factory: OnceCell<Arc<ProxyFactory>>,
    in_flight: AtomicBool,
}

impl SynthesisSlot {
    fn state(&self) -> SynthesisState {
        if self.factory.get().is_some() {
            SynthesisState::Ready
        } else if self.in_flight.load(Ordering::Acquire) {
            SynthesisState::Synthesizing
        } else {
            SynthesisState::Unsynthesized
        }
    }
}

/// Process-wide contract -> factory cache
pub struct ProxySynthesizer {
    options: EngineOptions,
    slots: DashMap<CacheKey, Arc<SynthesisSlot>>,
}

impl ProxySynthesizer {
    /// Create a synthesizer with the given options
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            slots: DashMap::new(),
        }
    }

    /// Options this synthesizer enforces
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Synthesize (or fetch the cached) factory of a compile-time contract
    pub fn synthesize<C>(&self) -> ProxyResult<Arc<ProxyFactory>>
    where
        C: Contract + ?Sized,
    {
        self.get_or_build(CacheKey::Static(TypeId::of::<C>()), || {
            let descriptor = describe(&C::definition())?;
            self.build(descriptor, TypeId::of::<Arc<C>>(), static_invoker::<C>())
        })
    }

    /// Synthesize (or fetch the cached) factory of a runtime contract.
    ///
    /// Fails with `SynthesisFailure` if runtime contracts are disabled.
    pub fn synthesize_dynamic(&self, definition: &ContractDefinition) -> ProxyResult<Arc<ProxyFactory>> {
        if !self.options.allow_dynamic_contracts {
            return Err(ProxyError::SynthesisFailure {
                contract: definition.name().to_string(),
                reason: "runtime contracts are disabled".to_string(),
            });
        }
        let descriptor = describe(definition)?;
        self.get_or_build(CacheKey::Dynamic(descriptor.id()), || {
            self.build(descriptor, TypeId::of::<LinkedTarget>(), dynamic_invoker())
        })
    }

    /// Synthesis state of a compile-time contract
    pub fn state<C>(&self) -> SynthesisState
    where
        C: Contract + ?Sized,
    {
        self.state_of(CacheKey::Static(TypeId::of::<C>()))
    }

    /// Synthesis state of a runtime contract
    pub fn dynamic_state(&self, contract: ContractId) -> SynthesisState {
        self.state_of(CacheKey::Dynamic(contract))
    }

    /// Number of ready factories
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().state() == SynthesisState::Ready)
            .count()
    }

    /// Check if no factory is ready
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state_of(&self, key: CacheKey) -> SynthesisState {
        self.slots
            .get(&key)
            .map(|slot| slot.value().state())
            .unwrap_or(SynthesisState::Unsynthesized)
    }

    fn get_or_build<F>(&self, key: CacheKey, build: F) -> ProxyResult<Arc<ProxyFactory>>
    where
        F: FnOnce() -> ProxyResult<Arc<ProxyFactory>>,
    {
        // Clone the slot out so the shard lock is not held while building
        let slot = Arc::clone(self.slots.entry(key).or_default().value());
        slot.factory
            .get_or_try_init(|| {
                slot.in_flight.store(true, Ordering::Release);
                let result = build();
                slot.in_flight.store(false, Ordering::Release);
                result
            })
            .cloned()
    }

    fn build(
        &self,
        descriptor: ContractDescriptor,
        target_type: TypeId,
        invoker: TargetInvoker,
    ) -> ProxyResult<Arc<ProxyFactory>> {
        if let Some(max) = self.options.max_methods_per_contract {
            if descriptor.len() > max {
                return Err(ProxyError::SynthesisFailure {
                    contract: descriptor.name().to_string(),
                    reason: format!("{} methods exceed the limit of {}", descriptor.len(), max),
                });
            }
        }

        tracing::debug!(
            contract = %descriptor.name(),
            id = %descriptor.id(),
            methods = descriptor.len(),
            "synthesized proxy factory"
        );

        Ok(Arc::new(ProxyFactory {
            descriptor,
            invoker,
            target_type,
            constructed: AtomicU64::new(0),
        }))
    }
}

impl Default for ProxySynthesizer {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl fmt::Debug for ProxySynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySynthesizer")
            .field("options", &self.options)
            .field("ready", &self.len())
            .finish()
    }
}

fn static_invoker<C>() -> TargetInvoker
where
    C: Contract + ?Sized,
{
    Box::new(|target: &(dyn Any + Send + Sync), method: &MethodSignature, args: ArgumentPack| {
        let target = target.downcast_ref::<Arc<C>>().ok_or_else(|| {
            ProxyError::mismatch(std::any::type_name::<Arc<C>>(), "foreign target")
        })?;
        C::invoke_target(target, method, args)
    })
}

fn dynamic_invoker() -> TargetInvoker {
    Box::new(|target: &(dyn Any + Send + Sync), method: &MethodSignature, args: ArgumentPack| {
        let target = target
            .downcast_ref::<LinkedTarget>()
            .ok_or_else(|| ProxyError::mismatch("DynamicTarget", "foreign target"))?;
        target.call(method, args)
    })
}
