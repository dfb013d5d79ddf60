/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! # Internal crate of **gdinterop**
//!
//! Do not depend on this crate directly, instead use the `gdinterop` crate.
//! No SemVer or other guarantees are provided.

mod derive_engine_enum;
mod gdextension;
mod util;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;

/// Derive macro for [`EngineEnum`](../meta/trait.EngineEnum.html) and [`Marshal`](../meta/trait.Marshal.html) on fieldless enums.
///
/// Values cross the boundary as integers. The storage width follows `#[repr]`, defaulting to `i32`; the enum must also be `Copy`.
/// Converting an integer that names no enumerator fails.
///
/// ```no_run
/// use gdinterop::prelude::*;
///
/// #[derive(EngineEnum, Copy, Clone, Eq, PartialEq, Debug)]
/// #[repr(u8)]
/// enum Layer {
///     Ground = 1,
///     Sky = 200,
/// }
///
/// let variant = Layer::Sky.to_variant();
/// assert_eq!(variant.get_type(), VariantType::Int);
/// assert_eq!(Layer::from_variant(&variant), Layer::Sky);
/// ```
#[proc_macro_derive(EngineEnum)]
pub fn derive_engine_enum(input: TokenStream) -> TokenStream {
    translate(input, derive_engine_enum::derive_engine_enum)
}

/// Exports the entry symbol of the extension, for use on the [`ExtensionLibrary`](../init/trait.ExtensionLibrary.html) impl.
///
/// The symbol is `gdinterop_init` unless overridden with `#[gdextension(entry_point = my_symbol)]`. It must match the
/// `entry_symbol` of the `.gdextension` file.
///
/// ```no_run
/// use gdinterop::init::{ExtensionLibrary, gdextension};
///
/// struct MyExtension;
///
/// #[gdextension(entry_point = my_extension_init)]
/// impl ExtensionLibrary for MyExtension {}
/// ```
#[proc_macro_attribute]
pub fn gdextension(meta: TokenStream, input: TokenStream) -> TokenStream {
    let meta = TokenStream2::from(meta);
    translate(input, |item| gdextension::attribute_gdextension(meta, item))
}

type ParseResult<T> = Result<T, venial::Error>;

fn translate<F>(input: TokenStream, transform: F) -> TokenStream
where
    F: FnOnce(venial::Item) -> ParseResult<TokenStream2>,
{
    let input2 = TokenStream2::from(input);

    let result2 = venial::parse_item(input2)
        .and_then(transform)
        .unwrap_or_else(|e| e.to_compile_error());

    TokenStream::from(result2)
}
