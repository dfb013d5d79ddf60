/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use proc_macro2::TokenStream;
use quote::quote;

use crate::models::domain::GodotApiVersion;

pub fn make_build_struct(header: &GodotApiVersion, precision: &str) -> TokenStream {
    let GodotApiVersion {
        major,
        minor,
        patch,
        version_string,
    } = header;

    quote! {
        /// Meta-information about the API manifest this crate was compiled against.
        pub struct InteropBuild;

        impl InteropBuild {
            /// Godot version of the manifest.
            ///
            /// Example format: `v4.3.stable.official`
            pub const fn godot_static_version_string() -> &'static str {
                #version_string
            }

            /// Godot version of the manifest, as `(major, minor, patch)` triple.
            pub const fn godot_static_version_triple() -> (u8, u8, u8) {
                (#major, #minor, #patch)
            }

            /// `"single"` or `"double"`, depending on which layout set was selected.
            pub const fn precision() -> &'static str {
                #precision
            }
        }
    }
}
