//! Interpose - dynamic proxies and method interception
//!
//! Given a capability contract (a set of method signatures) and a concrete
//! target satisfying it, this crate produces a proxy that satisfies the same
//! contract and routes every call through an [`Interceptor`] before and after
//! forwarding to the target.
//!
//! Contracts come in two forms:
//!
//! - Rust traits annotated with [`#[contract]`](contract). The macro emits
//!   the proxy type, so calls are fully typed.
//! - [`ContractDefinition`]s assembled at runtime, served by a
//!   [`DynamicTarget`] method table and called through a [`DynamicProxy`].
//!
//! Both go through the same synthesizer cache and dispatch core.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use interpose_engine::{contract, ProxyError, ProxyGenerator, TracingInterceptor, Value};
//!
//! #[contract]
//! pub trait MyInterface {
//!     fn my_method(&self, foo: String, bar: Value) -> Result<String, ProxyError>;
//! }
//!
//! struct MyClass;
//!
//! impl MyInterface for MyClass {
//!     fn my_method(&self, foo: String, bar: Value) -> Result<String, ProxyError> {
//!         println!("{} {}", foo, bar);
//!         Ok("123".to_string())
//!     }
//! }
//!
//! let proxy = ProxyGenerator::global().create_interface_proxy_with_target::<dyn MyInterface>(
//!     Arc::new(MyClass),
//!     Arc::new(TracingInterceptor),
//! )?;
//! assert_eq!(proxy.my_method("foo".into(), Value::i32(1))?, "123");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// `#[contract]` expands to `::interpose_engine::` paths; the unit tests use it in-crate
#[cfg(test)]
extern crate self as interpose_engine;

pub mod error;
pub mod generator;
pub mod interceptor;
pub mod options;
pub mod reflect;
pub mod value;

pub use error::{BoxError, Hook, ProxyError, ProxyResult};
pub use generator::ProxyGenerator;
pub use interceptor::{
    HookEvent, HookResult, Interceptor, NoopInterceptor, RecordingInterceptor, TracingInterceptor,
};
pub use interpose_macros::contract;
pub use options::EngineOptions;
pub use reflect::{
    describe, pack, unpack, ArgumentPack, Bytes, Contract, ContractDefinition, ContractDescriptor,
    ContractId, DynamicProxy, DynamicTarget, Marshal, MethodDefinition, MethodId, MethodSignature,
    PackArgs, ParameterDefinition, PropertyDefinition, ProxyHandle, ProxyId, TypeInfo, TypeKind,
};
pub use value::{ObjectRef, Value};
