/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use proc_macro2::{Ident, TokenTree};
use quote::ToTokens;
use venial::Attribute;

use crate::ParseResult;

pub fn bail<R>(msg: impl AsRef<str>, tokens: impl ToTokens) -> ParseResult<R> {
    Err(venial::Error::new_at_tokens(tokens, msg.as_ref()))
}

/// Integer type named in `#[repr(...)]`, if any.
///
/// Other representation hints (`C`, `align`) are skipped.
pub fn find_int_repr(attributes: &[Attribute]) -> Option<Ident> {
    attributes
        .iter()
        .filter(|attr| {
            attr.get_single_path_segment()
                .is_some_and(|segment| segment == "repr")
        })
        .flat_map(|attr| attr.value.get_value_tokens().iter())
        .find_map(|tt| match tt {
            TokenTree::Ident(ident) if is_int_type(ident) => Some(ident.clone()),
            _ => None,
        })
}

fn is_int_type(ident: &Ident) -> bool {
    matches!(
        ident.to_string().as_str(),
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64"
    )
}
