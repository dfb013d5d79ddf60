/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use proc_macro2::{Ident, Span, TokenStream, TokenTree};
use quote::quote;
use venial::Item;

use crate::ParseResult;
use crate::util::bail;

pub fn attribute_gdextension(meta: TokenStream, item: Item) -> ParseResult<TokenStream> {
    let Item::Impl(impl_decl) = item else {
        return Err(venial::Error::new("#[gdextension] can only be applied to trait impls"));
    };

    let is_extension_library = impl_decl
        .trait_ty
        .as_ref()
        .and_then(|ty| ty.as_path())
        .and_then(|mut path| path.segments.pop())
        .is_some_and(|segment| segment.ident == "ExtensionLibrary");

    if !is_extension_library {
        return bail("#[gdextension] requires an `impl ExtensionLibrary for ...` block", &impl_decl.tk_impl);
    }

    if impl_decl.impl_generic_params.is_some() {
        return bail("#[gdextension] does not support generic impls", &impl_decl.impl_generic_params);
    }

    let entry_point = parse_entry_point(meta)?.unwrap_or_else(|| Ident::new("gdinterop_init", Span::call_site()));
    let impl_ty = &impl_decl.self_ty;

    Ok(quote! {
        #impl_decl

        #[unsafe(no_mangle)]
        unsafe extern "C" fn #entry_point(
            get_proc_address: ::gdinterop::sys::GDExtensionInterfaceGetProcAddress,
            library: ::gdinterop::sys::GDExtensionClassLibraryPtr,
            init: *mut ::gdinterop::sys::GDExtensionInitialization,
        ) -> ::gdinterop::sys::GDExtensionBool {
            // SAFETY: the engine calls this symbol with its own loader arguments.
            unsafe { ::gdinterop::init::__gdinterop_load_library::<#impl_ty>(get_proc_address, library, init) }
        }

        // Ensures that the entry point matches the signature of the C header.
        const _: ::gdinterop::sys::GDExtensionInitializationFunction = Some(#entry_point);
    })
}

/// Parses `entry_point = name`, the only accepted key.
fn parse_entry_point(meta: TokenStream) -> ParseResult<Option<Ident>> {
    let mut tokens = meta.into_iter();
    let Some(first) = tokens.next() else {
        return Ok(None);
    };

    match (first, tokens.next(), tokens.next(), tokens.next()) {
        (TokenTree::Ident(key), Some(TokenTree::Punct(eq)), Some(TokenTree::Ident(name)), None)
            if key == "entry_point" && eq.as_char() == '=' =>
        {
            Ok(Some(name))
        }
        (first, ..) => bail("expected `#[gdextension]` or `#[gdextension(entry_point = name)]`", first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(meta: TokenStream, input: TokenStream) -> Option<String> {
        venial::parse_item(input)
            .and_then(|item| attribute_gdextension(meta, item))
            .ok()
            .map(|tokens| tokens.to_string())
    }

    #[test]
    fn default_entry_symbol() {
        let out = expand(quote! {}, quote! { impl ExtensionLibrary for MyExtension {} }).expect("expands");

        assert!(out.contains("fn gdinterop_init"), "{out}");
        assert!(out.contains("__gdinterop_load_library"), "{out}");
        assert!(out.contains("MyExtension"), "{out}");
    }

    #[test]
    fn custom_entry_symbol() {
        let out = expand(
            quote! { entry_point = my_init },
            quote! { impl gdinterop::init::ExtensionLibrary for MyExtension {} },
        )
        .expect("expands");

        assert!(out.contains("fn my_init"), "{out}");
        assert!(!out.contains("gdinterop_init"), "{out}");
    }

    #[test]
    fn rejects_other_items() {
        assert!(expand(quote! {}, quote! { impl Drop for MyExtension {} }).is_none());
        assert!(expand(quote! {}, quote! { impl MyExtension {} }).is_none());
        assert!(expand(quote! {}, quote! { struct MyExtension; }).is_none());
        assert!(expand(quote! { entry = my_init }, quote! { impl ExtensionLibrary for E {} }).is_none());
    }
}
