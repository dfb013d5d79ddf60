/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use proc_macro2::{Ident, Literal, TokenStream};
use quote::{format_ident, quote};

use crate::conv;
use crate::generator::build_struct;
use crate::models::domain::{Enumerator, ExtensionApi};

pub fn make_sys_central_code(api: &ExtensionApi) -> TokenStream {
    let VariantEnums {
        variant_ty_enumerators_pascal,
        variant_ty_enumerators_ord,
        variant_op_enumerators_pascal,
        variant_op_enumerators_ord,
    } = make_variant_enums(api);

    let precision = if cfg!(feature = "double-precision") {
        "double"
    } else {
        "single"
    };
    let build_config_struct = build_struct::make_build_struct(&api.godot_version, precision);
    let [opaque_32bit, opaque_64bit] = make_opaque_types(api);

    quote! {
        use crate::{GDExtensionVariantOperator, GDExtensionVariantType};

        #[cfg(target_pointer_width = "32")]
        pub mod types {
            #(#opaque_32bit)*
        }
        #[cfg(target_pointer_width = "64")]
        pub mod types {
            #(#opaque_64bit)*
        }

        // ----------------------------------------------------------------------------------------------------------------------------------------------

        #build_config_struct

        // ----------------------------------------------------------------------------------------------------------------------------------------------

        /// Tag of a `Variant`, stored as `i32` at offset 0 of the native value.
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
        #[repr(i32)]
        pub enum VariantType {
            #[default]
            #(
                #variant_ty_enumerators_pascal = #variant_ty_enumerators_ord,
            )*
        }

        impl VariantType {
            /// All variant types, in tag order.
            pub const ALL: &'static [VariantType] = &[
                #( Self::#variant_ty_enumerators_pascal, )*
            ];

            #[doc(hidden)]
            pub fn from_sys(enumerator: GDExtensionVariantType) -> Self {
                // Annoying, but only stable alternative is transmute(), which dictates enum size.
                match enumerator {
                    #(
                        #variant_ty_enumerators_ord => Self::#variant_ty_enumerators_pascal,
                    )*
                    _ => unreachable!("invalid variant type {}", enumerator)
                }
            }

            /// Like [`from_sys`](Self::from_sys), but returns `None` for values outside the enum.
            pub fn try_from_ord(ord: i32) -> Option<Self> {
                match ord {
                    #(
                        #variant_ty_enumerators_ord => Some(Self::#variant_ty_enumerators_pascal),
                    )*
                    _ => None
                }
            }

            #[doc(hidden)]
            pub fn sys(self) -> GDExtensionVariantType {
                self as _
            }
        }

        // ----------------------------------------------------------------------------------------------------------------------------------------------

        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[repr(i32)]
        pub enum VariantOperator {
            #(
                #variant_op_enumerators_pascal = #variant_op_enumerators_ord,
            )*
        }

        impl VariantOperator {
            #[doc(hidden)]
            pub fn from_sys(enumerator: GDExtensionVariantOperator) -> Self {
                match enumerator {
                    #(
                        #variant_op_enumerators_ord => Self::#variant_op_enumerators_pascal,
                    )*
                    _ => unreachable!("invalid variant operator {}", enumerator)
                }
            }

            #[doc(hidden)]
            pub fn sys(self) -> GDExtensionVariantOperator {
                self as _
            }
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Implementation

pub(crate) struct VariantEnums {
    pub variant_ty_enumerators_pascal: Vec<Ident>,
    pub variant_ty_enumerators_ord: Vec<Literal>,
    pub variant_op_enumerators_pascal: Vec<Ident>,
    pub variant_op_enumerators_ord: Vec<Literal>,
}

pub(crate) fn make_opaque_types(api: &ExtensionApi) -> [Vec<TokenStream>; 2] {
    let mut opaque_types = [Vec::new(), Vec::new()];

    for b in api.builtin_sizes.iter() {
        let index = b.config.is_64bit() as usize;
        let type_def = make_opaque_type(&b.builtin_original_name, b.size);

        opaque_types[index].push(type_def);
    }

    opaque_types
}

fn make_opaque_type(godot_original_name: &str, size: usize) -> TokenStream {
    let name = conv::to_pascal_case(godot_original_name);

    // "int" -> "OpaqueInt".
    let ident = format_ident!("Opaque{}", name);
    quote! {
        pub type #ident = crate::opaque::Opaque<#size>;
    }
}

pub(crate) fn make_variant_enums(api: &ExtensionApi) -> VariantEnums {
    let (variant_ty_enumerators_pascal, variant_ty_enumerators_ord) =
        split_enumerators(&api.variant_types, |pascal| pascal);

    // "Module" is the manifest's name for modulo.
    let (variant_op_enumerators_pascal, variant_op_enumerators_ord) =
        split_enumerators(&api.variant_operators, |pascal| {
            if pascal == "Module" {
                "Modulo".to_string()
            } else {
                pascal
            }
        });

    VariantEnums {
        variant_ty_enumerators_pascal,
        variant_ty_enumerators_ord,
        variant_op_enumerators_pascal,
        variant_op_enumerators_ord,
    }
}

fn split_enumerators(
    enumerators: &[Enumerator],
    rename: impl Fn(String) -> String,
) -> (Vec<Ident>, Vec<Literal>) {
    enumerators
        .iter()
        .map(|e| {
            let pascal = rename(conv::shout_to_pascal(&e.name));
            let ord = i32::try_from(e.value)
                .unwrap_or_else(|_| panic!("enumerator {} out of i32 range", e.name));

            (conv::ident(&pascal), Literal::i32_unsuffixed(ord))
        })
        .unzip()
}
