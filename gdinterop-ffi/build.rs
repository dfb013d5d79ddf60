/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::path::PathBuf;

fn main() {
    let out_dir = std::env::var("OUT_DIR").map(PathBuf::from).unwrap_or_else(|e| {
        panic!("OUT_DIR not set by cargo: {e}");
    });

    gdinterop_codegen::generate_sys_central_file(&out_dir);

    gdinterop_bindings::emit_checks_cfgs();
    gdinterop_bindings::emit_godot_version_cfg();

    println!("cargo:rerun-if-changed=build.rs");
}
