//! Demo contracts, target and interceptor.
//!
//! `MyInterface` takes two strings; `MyIntInterface` takes a string and an
//! integer, so one scenario exercises reference-typed arguments and the
//! other value-typed ones. `MyClass` implements both and always answers
//! `"123"`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use interpose_engine::{
    contract, HookResult, Interceptor, ProxyError, ProxyGenerator, ProxyResult,
};

/// The demo contract with a string second argument
#[contract]
pub trait MyInterface {
    /// Echo the arguments and answer
    fn my_method(&self, foo: String, bar: String) -> Result<String, ProxyError>;
}

/// The demo contract with an integer second argument
#[contract]
pub trait MyIntInterface {
    /// Echo the arguments and answer
    fn my_method(&self, foo: String, bar: i32) -> Result<String, ProxyError>;
}

/// Demo target; counts how often it was really called
#[derive(Debug, Default)]
pub struct MyClass {
    calls: AtomicUsize,
}

impl MyClass {
    /// Create a target with a zero call count
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls that reached the target
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, foo: &str, bar: &dyn std::fmt::Display) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        println!("{} {}", foo, bar);
        "123".to_string()
    }
}

impl MyInterface for MyClass {
    fn my_method(&self, foo: String, bar: String) -> Result<String, ProxyError> {
        Ok(self.answer(&foo, &bar))
    }
}

impl MyIntInterface for MyClass {
    fn my_method(&self, foo: String, bar: i32) -> Result<String, ProxyError> {
        Ok(self.answer(&foo, &bar))
    }
}

/// Interceptor printing each hook to stdout
#[derive(Debug, Default)]
pub struct ConsoleInterceptor {
    reject_before: bool,
}

impl ConsoleInterceptor {
    /// Interceptor whose hooks always succeed
    pub fn new() -> Self {
        Self::default()
    }

    /// Interceptor whose `before_invoke` rejects every call
    pub fn rejecting() -> Self {
        Self {
            reject_before: true,
        }
    }
}

impl Interceptor for ConsoleInterceptor {
    fn before_invoke(&self) -> HookResult {
        println!("Before invoking method");
        if self.reject_before {
            return Err("call rejected by before_invoke".into());
        }
        Ok(())
    }

    fn after_invoke(&self) -> HookResult {
        println!("After invoking method");
        Ok(())
    }
}

/// Which demo contract a scenario calls through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// `my_method("aaa", "bar")`
    Text,
    /// `my_method("aaa", 1234)`
    Integer,
}

/// Call `my_method` once through a fresh proxy of the scenario's contract
pub fn run(
    generator: &ProxyGenerator,
    scenario: Scenario,
    target: Arc<MyClass>,
    interceptor: Arc<dyn Interceptor>,
) -> ProxyResult<String> {
    match scenario {
        Scenario::Text => {
            let proxy = generator
                .create_interface_proxy_with_target::<dyn MyInterface>(target, interceptor)?;
            proxy.my_method("aaa".to_string(), "bar".to_string())
        }
        Scenario::Integer => {
            let proxy = generator
                .create_interface_proxy_with_target::<dyn MyIntInterface>(target, interceptor)?;
            proxy.my_method("aaa".to_string(), 1234)
        }
    }
}
