/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use venial::{Fields, Item};

use crate::ParseResult;
use crate::util::{bail, find_int_repr};

pub fn derive_engine_enum(item: Item) -> ParseResult<TokenStream> {
    let Item::Enum(enum_) = item else {
        return Err(venial::Error::new("EngineEnum can only be derived on enums"));
    };

    if enum_.generic_params.is_some() {
        return bail("EngineEnum cannot be derived on generic enums", &enum_.generic_params);
    }

    if enum_.variants.is_empty() {
        return bail("EngineEnum needs at least one enumerator", &enum_.name);
    }

    let mut names = Vec::new();
    for variant in enum_.variants.items() {
        if !matches!(variant.fields, Fields::Unit) {
            return bail("EngineEnum only supports fieldless enumerators", &variant.name);
        }
        names.push(variant.name.clone());
    }

    let name = &enum_.name;
    let repr = find_int_repr(&enum_.attributes).unwrap_or_else(|| Ident::new("i32", Span::call_site()));

    Ok(quote! {
        impl ::gdinterop::meta::EngineEnum for #name {
            type Repr = #repr;

            fn ord(self) -> #repr {
                self as #repr
            }

            fn try_from_ord(ord: #repr) -> Option<Self> {
                #(
                    if ord == Self::#names as #repr {
                        return Some(Self::#names);
                    }
                )*
                None
            }
        }

        impl ::gdinterop::meta::Marshal for #name {
            const VIA_REGISTRY: bool = false;

            fn variant_type() -> ::gdinterop::meta::VariantType {
                ::gdinterop::meta::VariantType::Int
            }

            fn to_variant(&self) -> ::gdinterop::builtin::Variant {
                ::gdinterop::meta::enum_to_variant(self)
            }

            fn try_from_variant(
                variant: &::gdinterop::builtin::Variant,
            ) -> Result<Self, ::gdinterop::meta::error::ConvertError> {
                ::gdinterop::meta::enum_try_from_variant(variant)
            }

            unsafe fn write_to_ptr(&self, dst: ::gdinterop::sys::GDExtensionUninitializedTypePtr) {
                unsafe { ::gdinterop::meta::enum_write_to_ptr(self, dst) }
            }

            unsafe fn try_read_from_ptr(
                src: ::gdinterop::sys::GDExtensionConstTypePtr,
            ) -> Result<Self, ::gdinterop::meta::error::ConvertError> {
                unsafe { ::gdinterop::meta::enum_try_read_from_ptr(src) }
            }
        }
    })
}
