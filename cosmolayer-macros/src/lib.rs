//! Procedural macros for the cosmolayer project.
//!
//! This crate provides `#[derive(Document)]`, which implements
//! `cosmolayer::document::Document` for structs with named fields.
//!
//! ```ignore
//! use cosmolayer::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! pub struct Order {
//!     #[document(id)]
//!     pub id: String,
//!     #[document(partition_key)]
//!     pub customer: String,
//! }
//! ```
//!
//! Field attributes:
//!
//! - `#[document(id)]` marks the identifier field. Without it a field named `id` is used.
//!   Add `rename = "..."` when the field serializes under another name.
//! - `#[document(partition_key)]` marks the field the partition key is read from.
//!   Without it the id is the partition key.

#[allow(unused_extern_crates)]
extern crate self as cosmolayer_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr, parse_macro_input, spanned::Spanned};

#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_document(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct FieldOptions {
    id: bool,
    rename: Option<LitStr>,
    partition_key: bool,
}

fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                options.id = true;
                Ok(())
            } else if meta.path.is_ident("partition_key") {
                options.partition_key = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                options.rename = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `id`, `rename = \"...\"` or `partition_key`"))
            }
        })?;
    }

    if options.rename.is_some() && !options.id {
        return Err(syn::Error::new(field.span(), "`rename` is only allowed on the id field"));
    }

    Ok(options)
}

fn expand_document(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(syn::Error::new(input.span(), "Document can only be derived for structs with named fields")),
        },
        _ => return Err(syn::Error::new(input.span(), "Document can only be derived for structs")),
    };

    let mut id: Option<(&Ident, Option<LitStr>)> = None;
    let mut partition_key: Option<&Ident> = None;

    for field in fields {
        let options = field_options(field)?;
        let Some(ident) = field.ident.as_ref() else { continue };

        if options.id {
            if id.is_some() {
                return Err(syn::Error::new(field.span(), "only one field can be marked `#[document(id)]`"));
            }
            id = Some((ident, options.rename));
        }
        if options.partition_key {
            if partition_key.is_some() {
                return Err(syn::Error::new(field.span(), "only one field can be marked `#[document(partition_key)]`"));
            }
            partition_key = Some(ident);
        }
    }

    let (id_ident, id_name) = match id {
        Some((ident, rename)) => {
            let name = rename.unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
            (ident, name)
        }
        None => {
            let ident = fields
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .find(|ident| *ident == "id")
                .ok_or_else(|| syn::Error::new(input.span(), "no `id` field; mark one with `#[document(id)]`"))?;
            (ident, LitStr::new("id", ident.span()))
        }
    };

    let partition_key_fn = partition_key.map(|field| {
        quote! {
            fn partition_key(&self) -> ::cosmolayer::document::PartitionKey {
                ::core::convert::From::from(::core::clone::Clone::clone(&self.#field))
            }
        }
    });

    let name = &input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::cosmolayer::document::Document for #name #type_generics #where_clause {
            const ID_FIELD: &'static str = #id_name;

            fn id(&self) -> &str {
                ::core::convert::AsRef::<str>::as_ref(&self.#id_ident)
            }

            #partition_key_fn
        }
    })
}
