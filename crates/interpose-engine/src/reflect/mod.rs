//! Proxy Runtime
//!
//! This module implements the runtime side of proxy synthesis: contract
//! description, argument marshaling, the factory cache, the binding store and
//! the dispatch core every proxy call passes through.
//!
//! ## Call path
//!
//! ```text
//! proxy.method(a, b)
//!   -> pack (a, b)                      marshal
//!   -> invoke(MethodId, proxy, args)    dispatch
//!        lookup binding                 binding
//!        before_invoke
//!        target adapter                 synthesizer
//!        after_invoke
//!   -> unpack result                    marshal
//! ```

mod binding;
mod contract;
mod dispatch;
mod dynamic;
mod marshal;
mod proxy;
mod synthesizer;

pub use binding::{Binding, BindingStore, TargetRef};
pub use contract::{
    describe, Contract, ContractDefinition, ContractDescriptor, ContractId, MemberDefinition,
    MethodDefinition, MethodId, MethodSignature, ParameterDefinition, ParameterInfo,
    PropertyDefinition, TypeInfo, TypeKind,
};
pub use dispatch::{invoke, TargetPanic};
pub use dynamic::{DynamicProxy, DynamicTarget, LinkedTarget, MethodHandler};
pub use marshal::{pack, unpack, ArgumentPack, Bytes, Marshal, PackArgs};
pub use proxy::{ProxyHandle, ProxyId};
pub use synthesizer::{ProxyFactory, ProxySynthesizer, SynthesisState};
