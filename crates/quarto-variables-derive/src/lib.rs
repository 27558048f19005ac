/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `#[derive(Variables)]` for quarto-variables.
//!
//! Generates `Reflect` and `Record` implementations for a struct so the
//! struct converter can walk its fields.
//!
//! ```ignore
//! #[derive(Variables)]
//! #[variables(implements = "stringer")]
//! pub struct Meta {
//!     #[variable("title,omitempty")]
//!     pub title: String,
//!     #[variable("-")]
//!     pub cache: Vec<u8>,
//! }
//! ```
//!
//! Field attributes:
//! - `#[variable("name,option,...")]` - the field's annotation string
//!
//! Only `pub` fields not tagged `"-"` are listed, so other fields may hold
//! any type.
//!
//! Container attributes:
//! - `#[variables(self_describing)]` - convert through the type's
//!   `ToVariable` implementation instead of walking fields
//! - `#[variables(implements = "a, b")]` - capabilities the type offers to
//!   capability-keyed converters

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Data, DeriveInput, Fields, GenericParam, LitStr, Visibility,
};

#[proc_macro_derive(Variables, attributes(variable, variables))]
pub fn derive_variables(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct ContainerOptions {
    self_describing: bool,
    implements: Vec<String>,
}

fn container_options(input: &DeriveInput) -> syn::Result<ContainerOptions> {
    let mut options = ContainerOptions::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("variables")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("self_describing") {
                options.self_describing = true;
                Ok(())
            } else if meta.path.is_ident("implements") {
                let list: LitStr = meta.value()?.parse()?;
                options.implements.extend(
                    list.value()
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
                Ok(())
            } else {
                Err(meta.error("expected `self_describing` or `implements = \"...\"`"))
            }
        })?;
    }
    Ok(options)
}

fn field_tag(attrs: &[syn::Attribute]) -> syn::Result<Option<LitStr>> {
    let mut tag = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("variable")) {
        if tag.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate `variable` attribute"));
        }
        tag = Some(attr.parse_args::<LitStr>()?);
    }
    Ok(tag)
}

fn expand(mut input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(data) => {
            return Err(syn::Error::new_spanned(
                data.enum_token,
                "Variables can only be derived for structs",
            ));
        }
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "Variables can only be derived for structs",
            ));
        }
    };

    let mut entries = Vec::new();
    let members: Vec<(String, TokenStream2, &syn::Field)> = match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|f| f.ident.as_ref().map(|ident| (ident.to_string(), quote!(#ident), f)))
            .collect(),
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let index = syn::Index::from(i);
                (i.to_string(), quote!(#index), f)
            })
            .collect(),
        Fields::Unit => Vec::new(),
    };

    for (name, member, field) in members {
        let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
        let tag = field_tag(&field.attrs)?;
        // Private and omitted fields never reach the converter, so their
        // types need not implement Reflect.
        if matches!(field.vis, Visibility::Inherited)
            || tag.as_ref().is_some_and(|lit| lit.value() == "-")
        {
            continue;
        }
        let tag = match tag {
            Some(lit) => quote!(::core::option::Option::Some(#lit)),
            None => quote!(::core::option::Option::None),
        };
        entries.push(quote! {
            ::quarto_variables::Field {
                name: #name,
                tag: #tag,
                exported: true,
                value: &self.#member,
            }
        });
    }

    let options = container_options(&input)?;

    for param in &input.generics.params {
        if let GenericParam::Lifetime(lifetime) = param {
            return Err(syn::Error::new_spanned(
                lifetime,
                "Variables cannot be derived for types with lifetime parameters",
            ));
        }
    }
    for param in input.generics.type_params_mut() {
        param.bounds.push(parse_quote!(::quarto_variables::Reflect));
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let describe = options.self_describing.then(|| {
        quote! {
            fn describe(
                &self,
            ) -> ::core::option::Option<
                ::core::result::Result<::quarto_variables::Variable, ::quarto_variables::ConversionError>,
            > {
                ::core::option::Option::Some(::quarto_variables::ToVariable::to_variable(self))
            }
        }
    });

    let implements = (!options.implements.is_empty()).then(|| {
        let names = &options.implements;
        quote! {
            fn implements(&self, capability: &str) -> bool {
                matches!(capability, #(#names)|*)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::quarto_variables::Reflect for #ident #ty_generics #where_clause {
            fn shape(&self) -> ::quarto_variables::Shape<'_> {
                ::quarto_variables::Shape::Record(self)
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            #describe
            #implements
        }

        impl #impl_generics ::quarto_variables::Record for #ident #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<::quarto_variables::Field<'_>> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}
