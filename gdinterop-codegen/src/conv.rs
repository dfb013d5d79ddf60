/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use proc_macro2::Ident;
use quote::format_ident;

/// Converts a builtin name such as `PackedInt32Array`, `int` or `AABB` to PascalCase.
pub fn to_pascal_case(name: &str) -> String {
    use heck::ToPascalCase;

    fix_dimensions(name.to_pascal_case())
}

/// Converts `STRING_NAME` to `StringName`.
pub fn shout_to_pascal(shout_case: &str) -> String {
    let mut result = String::with_capacity(shout_case.len());
    let mut next_upper = true;

    for ch in shout_case.chars() {
        if next_upper {
            assert_ne!(ch, '_', "double underscore in {shout_case}");
            result.push(ch);
            next_upper = false;
        } else if ch == '_' {
            next_upper = true;
        } else {
            result.push(ch.to_ascii_lowercase());
        }
    }

    fix_dimensions(result)
}

pub fn ident(s: &str) -> Ident {
    format_ident!("{}", s)
}

// "Transform2d" -> "Transform2D". Integer vectors keep their lowercase suffix ("Vector2i").
fn fix_dimensions(name: String) -> String {
    name.replace("2d", "2D").replace("3d", "3D")
}
