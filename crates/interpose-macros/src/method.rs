// Per-method analysis and code generation for #[contract]
//
// Each trait method yields three pieces:
// - its MethodDefinition inside `Contract::definition()`
// - a match arm of the target adapter, keyed by slot
// - the method body of the proxy type

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    FnArg, GenericArgument, Ident, Pat, PathArguments, Result, ReturnType, TraitItemFn, Type,
};

/// A validated contract method
pub struct ContractMethod {
    pub ident: Ident,
    pub args: Vec<(Ident, Type)>,
    pub output: ReturnType,
    pub ok_type: Type,
    pub slot: u16,
}

impl ContractMethod {
    /// Validates a trait method and extracts what the generators need.
    pub fn parse(method: &TraitItemFn, slot: u16) -> Result<Self> {
        let sig = &method.sig;

        if sig.asyncness.is_some() {
            return Err(syn::Error::new_spanned(
                sig.asyncness,
                "async methods cannot be intercepted synchronously",
            ));
        }
        if sig.unsafety.is_some() || sig.constness.is_some() || sig.abi.is_some() {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                "contract methods must be plain safe methods",
            ));
        }
        if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
            return Err(syn::Error::new_spanned(
                &sig.generics,
                "generic methods are not supported in a contract",
            ));
        }
        if sig.variadic.is_some() {
            return Err(syn::Error::new_spanned(&sig.variadic, "variadic methods are not supported"));
        }

        let mut inputs = sig.inputs.iter();
        match inputs.next() {
            Some(FnArg::Receiver(receiver))
                if receiver.reference.is_some() && receiver.mutability.is_none() => {}
            Some(other) => {
                return Err(syn::Error::new_spanned(
                    other,
                    "contract methods must take `&self`",
                ));
            }
            None => {
                return Err(syn::Error::new_spanned(
                    &sig.ident,
                    "contract methods must take `&self`; static methods have no receiver to proxy",
                ));
            }
        }

        let mut args = Vec::new();
        for arg in inputs {
            let FnArg::Typed(pat_type) = arg else {
                return Err(syn::Error::new_spanned(arg, "unexpected receiver"));
            };
            let ident = match &*pat_type.pat {
                Pat::Ident(pat_ident) if pat_ident.by_ref.is_none() && pat_ident.subpat.is_none() => {
                    pat_ident.ident.clone()
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        &pat_type.pat,
                        "Only simple identifiers are supported as arguments",
                    ));
                }
            };
            check_argument_type(&pat_type.ty)?;
            args.push((ident, (*pat_type.ty).clone()));
        }

        let ok_type = result_ok_type(&sig.output)?;

        Ok(Self {
            ident: sig.ident.clone(),
            args,
            output: sig.output.clone(),
            ok_type,
            slot,
        })
    }

    /// `.add_method(...)` call for `Contract::definition()`
    pub fn definition(&self) -> TokenStream {
        let name = self.ident.to_string();
        let params = self.args.iter().map(|(ident, ty)| {
            let param = ident.to_string();
            quote! {
                .with_param(::interpose_engine::ParameterDefinition::new(
                    #param,
                    <#ty as ::interpose_engine::Marshal>::type_info(),
                ))
            }
        });
        let ok_type = &self.ok_type;

        quote! {
            .add_method(
                ::interpose_engine::MethodDefinition::new(#name)
                    #(#params)*
                    .returns(<#ok_type as ::interpose_engine::Marshal>::type_info())
            )
        }
    }

    /// Target adapter arm: unpack arguments, call the target, pack the result
    pub fn adapter_arm(&self) -> TokenStream {
        let slot = self.slot;
        let ident = &self.ident;
        // Generated locals so contract parameter names never shadow the adapter's own
        let locals: Vec<Ident> = (0..self.args.len())
            .map(|index| format_ident!("__arg{}", index))
            .collect();
        let extractions = self.args.iter().zip(&locals).enumerate().map(|(index, ((_, ty), local))| {
            quote! {
                let #local: #ty = __args.take(#index)?;
            }
        });

        quote! {
            #slot => {
                #(#extractions)*
                match __target.#ident(#(#locals),*) {
                    ::std::result::Result::Ok(__value) => {
                        ::std::result::Result::Ok(::interpose_engine::Marshal::pack(__value))
                    }
                    ::std::result::Result::Err(__err) => ::std::result::Result::Err(
                        ::interpose_engine::ProxyError::target_failure(__method.name(), __err),
                    ),
                }
            }
        }
    }

    /// Method of the proxy type: pack, dispatch by slot, unpack
    pub fn proxy_method(&self) -> TokenStream {
        let slot = self.slot as usize;
        let ident = &self.ident;
        let output = &self.output;
        let ok_type = &self.ok_type;
        let params = self.args.iter().map(|(name, ty)| quote! { #name: #ty });
        let names = self.args.iter().map(|(name, _)| name);

        quote! {
            fn #ident(&self, #(#params),*) #output {
                let __args = ::interpose_engine::ArgumentPack::from_values(::std::vec![
                    #(::interpose_engine::Marshal::pack(#names)),*
                ]);
                let __result = self.handle.invoke_slot(#slot, __args)?;
                ::std::result::Result::Ok(::interpose_engine::unpack::<#ok_type>(__result)?)
            }
        }
    }
}

/// Rejects argument types that cannot be boxed into an owned `Value`.
fn check_argument_type(ty: &Type) -> Result<()> {
    match ty {
        Type::Reference(_) => Err(syn::Error::new_spanned(
            ty,
            "borrowed arguments are not supported; take the value by ownership or wrap it in Arc",
        )),
        Type::ImplTrait(_) => Err(syn::Error::new_spanned(
            ty,
            "`impl Trait` arguments are not supported in a contract",
        )),
        _ => Ok(()),
    }
}

/// Extracts `T` from `Result<T, E>` (or any `...Result<T, ..>` alias).
fn result_ok_type(output: &ReturnType) -> Result<Type> {
    let error = || {
        syn::Error::new_spanned(
            output,
            "contract methods must return `Result<T, E>` so proxy failures can be reported",
        )
    };

    let ReturnType::Type(_, ty) = output else {
        return Err(error());
    };
    let Type::Path(type_path) = &**ty else {
        return Err(error());
    };
    let segment = type_path.path.segments.last().ok_or_else(error)?;
    if !segment.ident.to_string().ends_with("Result") {
        return Err(error());
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return Err(error());
    };
    match generics.args.first() {
        Some(GenericArgument::Type(ok)) => Ok(ok.clone()),
        _ => Err(error()),
    }
}
