// interpose-macros: compile-time proxy synthesis for capability contracts
//
// Provides the #[contract] attribute. Applied to a trait, it emits:
// - the trait itself, with Send + Sync supertraits
// - `impl Contract for dyn Trait`: the contract definition and the target adapter
// - a `TraitProxy` struct implementing the trait by routing through the
//   dispatch core
//
// Example:
// ```
// use interpose_engine::{contract, ProxyError};
//
// #[contract]
// pub trait Greeter {
//     fn greet(&self, name: String) -> Result<String, ProxyError>;
// }
// ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemTrait};

mod contract;
mod method;

/// Turns a trait into a capability contract with a synthesized proxy type.
///
/// Every method must take `&self`, bind its arguments to plain identifiers,
/// and return a `Result<T, E>` (or an alias whose name ends in `Result`)
/// where `E: std::error::Error + Send + Sync + From<ProxyError>`. Argument
/// and return types must implement `Marshal`.
///
/// The proxy type is named `<Trait>Proxy` unless overridden:
///
/// ```ignore
/// #[contract(proxy = AuditedStore)]
/// pub trait Store {
///     fn get(&self, key: String) -> Result<Option<String>, ProxyError>;
///     fn put(&self, key: String, value: String) -> Result<(), ProxyError>;
/// }
/// ```
///
/// Associated types, associated constants, generic methods, `async fn` and
/// borrowed argument types are rejected at compile time.
#[proc_macro_attribute]
pub fn contract(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = contract::ContractArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);

    let input = parse_macro_input!(item as ItemTrait);
    contract::expand_contract(args, input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
