// #[contract] proc-macro implementation
//
// Generates the contract impl and the proxy type for a trait.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::{parse_quote, Ident, ItemTrait, Result, TraitItem, TypeParamBound};

use crate::method::ContractMethod;

/// Arguments of `#[contract(...)]`
#[derive(Default)]
pub struct ContractArgs {
    proxy: Option<Ident>,
}

impl ContractArgs {
    pub fn parse(&mut self, meta: ParseNestedMeta<'_>) -> Result<()> {
        if meta.path.is_ident("proxy") {
            self.proxy = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported contract property; expected `proxy = Name`"))
        }
    }
}

/// Expands the #[contract] attribute macro.
///
/// Example expansion:
/// ```ignore
/// // Input:
/// #[contract]
/// pub trait Greeter {
///     fn greet(&self, name: String) -> Result<String, ProxyError>;
/// }
///
/// // Output:
/// pub trait Greeter: Send + Sync {
///     fn greet(&self, name: String) -> Result<String, ProxyError>;
/// }
///
/// impl ::interpose_engine::Contract for dyn Greeter {
///     type Proxy = GreeterProxy;
///     fn definition() -> ContractDefinition { /* one add_method per method */ }
///     fn invoke_target(__target: &Self, __method: &MethodSignature, __args: ArgumentPack)
///         -> ProxyResult<Value>
///     {
///         match __method.id().slot() {
///             0u16 => { let __arg0: String = __args.take(0usize)?; /* call, pack */ }
///             _ => Err(ProxyError::unknown_method(__method.id())),
///         }
///     }
///     fn into_proxy(handle: ProxyHandle) -> GreeterProxy { GreeterProxy { handle } }
/// }
///
/// pub struct GreeterProxy { handle: ProxyHandle }
///
/// impl Greeter for GreeterProxy {
///     fn greet(&self, name: String) -> Result<String, ProxyError> {
///         let __result = self.handle.invoke_slot(0usize, pack(name))?;
///         Ok(unpack::<String>(__result)?)
///     }
/// }
/// ```
pub fn expand_contract(args: ContractArgs, mut item: ItemTrait) -> Result<TokenStream> {
    validate_trait(&item)?;

    let mut methods = Vec::new();
    for trait_item in &item.items {
        match trait_item {
            TraitItem::Fn(method) => {
                let slot = u16::try_from(methods.len()).map_err(|_| {
                    syn::Error::new_spanned(&method.sig.ident, "too many methods in one contract")
                })?;
                methods.push(ContractMethod::parse(method, slot)?);
            }
            TraitItem::Const(item) => {
                return Err(syn::Error::new_spanned(
                    item,
                    "associated constants are not expressible as method calls",
                ));
            }
            TraitItem::Type(item) => {
                return Err(syn::Error::new_spanned(
                    item,
                    "associated types are not supported in a contract",
                ));
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "only methods are supported in a contract",
                ));
            }
        }
    }

    add_thread_safety_bounds(&mut item);

    let vis = &item.vis;
    let trait_ident = &item.ident;
    let contract_name = trait_ident.to_string();
    let proxy_ident = args
        .proxy
        .unwrap_or_else(|| format_ident!("{}Proxy", trait_ident));
    let proxy_doc = format!("Proxy implementing [`{}`] through the dispatch core", trait_ident);

    let definitions = methods.iter().map(ContractMethod::definition);
    let arms = methods.iter().map(ContractMethod::adapter_arm);
    let proxy_methods = methods.iter().map(ContractMethod::proxy_method);

    let expanded = quote! {
        #item

        impl ::interpose_engine::Contract for dyn #trait_ident {
            type Proxy = #proxy_ident;

            fn definition() -> ::interpose_engine::ContractDefinition {
                ::interpose_engine::ContractDefinition::new(#contract_name)
                    #(#definitions)*
            }

            #[allow(unused_variables, unused_mut)]
            fn invoke_target(
                __target: &Self,
                __method: &::interpose_engine::MethodSignature,
                mut __args: ::interpose_engine::ArgumentPack,
            ) -> ::interpose_engine::ProxyResult<::interpose_engine::Value> {
                match __method.id().slot() {
                    #(#arms)*
                    _ => ::std::result::Result::Err(
                        ::interpose_engine::ProxyError::unknown_method(__method.id()),
                    ),
                }
            }

            fn into_proxy(handle: ::interpose_engine::ProxyHandle) -> #proxy_ident {
                #proxy_ident { handle }
            }
        }

        #[doc = #proxy_doc]
        #[derive(Debug)]
        #vis struct #proxy_ident {
            handle: ::interpose_engine::ProxyHandle,
        }

        impl #proxy_ident {
            /// Identity, contract and binding of this proxy
            #[allow(dead_code)]
            #vis fn proxy_handle(&self) -> &::interpose_engine::ProxyHandle {
                &self.handle
            }
        }

        impl #trait_ident for #proxy_ident {
            #(#proxy_methods)*
        }
    };

    Ok(expanded)
}

fn validate_trait(item: &ItemTrait) -> Result<()> {
    if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic traits are not supported as contracts",
        ));
    }
    if item.unsafety.is_some() || item.auto_token.is_some() {
        return Err(syn::Error::new_spanned(
            &item.ident,
            "unsafe and auto traits cannot be contracts",
        ));
    }
    Ok(())
}

/// Proxies are shared across threads, so every contract is `Send + Sync`.
fn add_thread_safety_bounds(item: &mut ItemTrait) {
    let has_bound = |item: &ItemTrait, name: &str| {
        item.supertraits.iter().any(|bound| match bound {
            TypeParamBound::Trait(bound) => bound
                .path
                .segments
                .last()
                .map_or(false, |segment| segment.ident == name),
            _ => false,
        })
    };

    if !has_bound(item, "Send") {
        item.supertraits.push(parse_quote!(::std::marker::Send));
    }
    if !has_bound(item, "Sync") {
        item.supertraits.push(parse_quote!(::std::marker::Sync));
    }
    if item.colon_token.is_none() {
        item.colon_token = Some(Default::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(item: ItemTrait) -> Result<String> {
        expand_contract(ContractArgs::default(), item).map(|tokens| tokens.to_string())
    }

    #[test]
    fn test_expands_proxy_and_contract() {
        let output = expand(parse_quote! {
            pub trait Greeter {
                fn greet(&self, name: String) -> Result<String, ProxyError>;
                fn reset(&self) -> Result<(), ProxyError>;
            }
        })
        .unwrap();
        assert!(output.contains("GreeterProxy"));
        assert!(output.contains("Contract for dyn Greeter"));
        assert!(output.contains("\"greet\""));
        assert!(output.contains("\"reset\""));
        assert!(output.contains("Send"));
    }

    #[test]
    fn test_proxy_name_override() {
        let args = ContractArgs {
            proxy: Some(format_ident!("AuditedGreeter")),
        };
        let output = expand_contract(
            args,
            parse_quote! {
                trait Greeter {
                    fn greet(&self) -> Result<String, ProxyError>;
                }
            },
        )
        .unwrap()
        .to_string();
        assert!(output.contains("AuditedGreeter"));
        assert!(!output.contains("GreeterProxy"));
    }

    #[test]
    fn test_existing_bounds_not_duplicated() {
        let mut item: ItemTrait = parse_quote! {
            trait Store: Send + Sync {
                fn get(&self) -> Result<u8, ProxyError>;
            }
        };
        add_thread_safety_bounds(&mut item);
        assert_eq!(item.supertraits.len(), 2);
    }

    #[test]
    fn test_rejects_associated_items() {
        let with_type = expand(parse_quote! {
            trait Store {
                type Key;
                fn get(&self) -> Result<u8, ProxyError>;
            }
        });
        let with_const = expand(parse_quote! {
            trait Store {
                const LIMIT: usize;
            }
        });
        assert!(with_type.is_err());
        assert!(with_const.is_err());
    }

    #[test]
    fn test_rejects_generic_trait() {
        let err = expand(parse_quote! {
            trait Store<K> {
                fn get(&self, key: K) -> Result<u8, ProxyError>;
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("generic traits"));
    }

    #[test]
    fn test_empty_trait_is_a_contract() {
        let output = expand(parse_quote! { trait Marker {} }).unwrap();
        assert!(output.contains("MarkerProxy"));
    }
}
