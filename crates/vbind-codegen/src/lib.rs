// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Derive macros used by generated bindings.
//!
//! - `#[derive(Extern)]` marks a `repr(C)` / `repr(transparent)` record as
//!   safe to materialize from native bytes, after checking every field type
//!   is itself `Extern`.
//! - `#[derive(CallbackPayload)]` records the callback id and the
//!   offset/size/alignment of every field so the validating decoder can copy
//!   field by field.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Expr, Fields, LitInt};

/// Representation hints collected from `#[repr(...)]`.
#[derive(Default)]
struct ReprInfo {
    c: bool,
    transparent: bool,
}

impl ReprInfo {
    fn is_extern(&self) -> bool {
        self.c || self.transparent
    }
}

fn parse_repr(input: &DeriveInput) -> syn::Result<ReprInfo> {
    let mut info = ReprInfo::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                info.c = true;
            } else if meta.path.is_ident("transparent") {
                info.transparent = true;
            }
            // packed(N) / align(N) carry a parenthesized argument
            if meta.input.peek(syn::token::Paren) {
                let _: proc_macro2::TokenTree = meta.input.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(info)
}

/// `#[derive(Extern)]`: implements `vbind::Extern` for a flat native record.
///
/// Fails to compile when the type has no `repr(C)` / `repr(transparent)`,
/// is generic, or has a field whose type is not `Extern`.
///
/// ```ignore
/// #[repr(C)]
/// #[derive(Clone, Copy, vbind::Extern)]
/// pub struct SteamIPAddress_t {
///     pub m_rgubIPv6: [u8; 16],
///     pub m_eType: ESteamIPType,
/// }
/// ```
#[proc_macro_derive(Extern)]
pub fn derive_extern(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_extern(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_extern(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "extern records cannot be generic",
        ));
    }

    let repr = parse_repr(input)?;
    if !repr.is_extern() {
        return Err(syn::Error::new_spanned(
            name,
            "extern records need #[repr(C)] or #[repr(transparent)]",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "only structs can be extern records",
            ))
        }
    };

    let field_types: Vec<&syn::Type> = fields.iter().map(|f| &f.ty).collect();

    Ok(quote! {
        // SAFETY: the record is repr(C)/repr(transparent) and every field is
        // checked to be `Extern` below.
        unsafe impl ::vbind::Extern for #name {}

        const _: () = {
            fn assert_extern<T: ::vbind::Extern>() {}
            #[allow(dead_code, deprecated)]
            fn assert_fields() {
                #(assert_extern::<#field_types>();)*
            }
        };
    })
}

/// `#[derive(CallbackPayload)]`: implements `vbind::CallbackPayload`.
///
/// Requires `#[vbind(callback_id = N)]` on the struct. Each field may carry
/// `#[vbind(align = EXPR)]` with the reconciled field alignment; fields
/// without it report no declared alignment.
///
/// ```ignore
/// #[repr(C)]
/// #[derive(Clone, Copy, vbind::Extern, vbind::CallbackPayload)]
/// #[vbind(callback_id = 101)]
/// pub struct FooCallback_t {
///     #[vbind(align = 4)]
///     pub m_a: i32,
/// }
/// ```
#[proc_macro_derive(CallbackPayload, attributes(vbind))]
pub fn derive_callback_payload(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_callback_payload(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_callback_payload(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();

    let repr = parse_repr(input)?;
    if !repr.c {
        return Err(syn::Error::new_spanned(
            name,
            "callback payloads are decoded by reinterpretation and need #[repr(C)]",
        ));
    }

    let mut callback_id: Option<LitInt> = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("vbind") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("callback_id") {
                callback_id = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `callback_id = <int>`"))
            }
        })?;
    }
    let Some(callback_id) = callback_id else {
        return Err(syn::Error::new_spanned(
            name,
            "missing #[vbind(callback_id = <int>)]",
        ));
    };

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "callback payloads need named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "only structs can be callback payloads",
            ))
        }
    };

    let mut spans = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "field must have a name"));
        };
        let field_type = &field.ty;
        let name_str = field_name.to_string();

        let mut align: Option<Expr> = None;
        for attr in &field.attrs {
            if !attr.path().is_ident("vbind") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("align") {
                    align = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `align = <expr>`"))
                }
            })?;
        }
        let align_tokens = match align {
            Some(expr) => quote! { ::core::option::Option::Some((#expr) as usize) },
            None => quote! { ::core::option::Option::None },
        };

        spans.push(quote! {
            ::vbind::FieldSpan {
                name: #name_str,
                offset: ::core::mem::offset_of!(#name, #field_name),
                size: ::core::mem::size_of::<#field_type>(),
                align: #align_tokens,
            }
        });
    }

    Ok(quote! {
        #[allow(deprecated)]
        impl ::vbind::CallbackPayload for #name {
            const CALLBACK_ID: i32 = #callback_id;
            const NAME: &'static str = #type_name;
            const FIELDS: &'static [::vbind::FieldSpan] = &[#(#spans),*];
        }
    })
}
