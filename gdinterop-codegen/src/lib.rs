/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Build-time generator for `gdinterop-ffi`.
//!
//! Produces a single "central" file containing the opaque layout types (sized per build configuration), the `VariantType` and
//! `VariantOperator` enums, and static build information.

mod conv;
mod generator;
mod models;

#[cfg(test)]
mod tests;

use std::path::Path;

use crate::generator::central_files::make_sys_central_code;
use crate::models::domain::ExtensionApi;
use crate::models::json::load_extension_api;

/// Generates `central.rs` into `out_dir`.
pub fn generate_sys_central_file(out_dir: &Path) {
    let json = gdinterop_bindings::load_extension_api_json();
    gdinterop_bindings::validate_header(&json);

    let json_api = load_extension_api(&json);
    let api = ExtensionApi::from_json(&json_api);

    let code = make_sys_central_code(&api);
    write_file(&out_dir.join("central.rs"), code.to_string());
}

fn write_file(path: &Path, contents: String) {
    let contents = format!("// Generated by gdinterop-codegen. Do not edit.\n\n{contents}\n");

    std::fs::write(path, contents)
        .unwrap_or_else(|e| panic!("failed to write code file to {}: {e}", path.display()));
}
