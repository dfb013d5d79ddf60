/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Provides the `extension_api.json` manifest to build scripts, and derives version `cfg`s from it.
//!
//! The manifest is bundled with the crate (`res/extension_api.json`). Setting the environment variable
//! `GDINTEROP_EXTENSION_JSON` to a path overrides it, e.g. to build against a custom engine.

mod godot_json;

pub use godot_json::{read_godot_version, validate_header};

/// Environment variable that overrides the bundled manifest.
pub const EXTENSION_JSON_ENV: &str = "GDINTEROP_EXTENSION_JSON";

const BUNDLED_EXTENSION_JSON: &str = include_str!("../res/extension_api.json");

/// Highest minor version known to this crate; `before_api` cfgs are emitted up to this one.
const NEXT_MINOR_VERSION: u8 = 5;

#[derive(Eq, PartialEq, Debug)]
pub struct GodotVersion {
    /// The original string, e.g. `Godot Engine v4.3.stable.official`.
    pub full_string: String,

    pub major: u8,
    pub minor: u8,

    /// 0 if none
    pub patch: u8,

    /// alpha|beta|dev|stable
    pub status: String,

    /// Build tag such as `official` or `custom_build`, if available.
    pub custom_rev: Option<String>,
}

/// Returns the manifest JSON text, honoring the override env var.
///
/// Build scripts calling this are re-run when the env var changes.
pub fn load_extension_api_json() -> String {
    println!("cargo:rerun-if-env-changed={EXTENSION_JSON_ENV}");

    match std::env::var(EXTENSION_JSON_ENV) {
        Ok(path) => {
            println!("cargo:rerun-if-changed={path}");
            godot_json::load_custom_extension_json(std::path::Path::new(&path))
        }
        Err(_) => BUNDLED_EXTENSION_JSON.to_string(),
    }
}

/// Emits `since_api` and `before_api` cfgs for the manifest version.
pub fn emit_godot_version_cfg() {
    let GodotVersion {
        major,
        minor,
        patch,
        ..
    } = read_godot_version(&load_extension_api_json());

    // Start at 1; checking for "since/before 4.0" makes no sense.
    for m in 1..=minor {
        println!(r#"cargo:rustc-cfg=since_api="{major}.{m}""#);
    }
    for m in minor + 1..=NEXT_MINOR_VERSION {
        println!(r#"cargo:rustc-cfg=before_api="{major}.{m}""#);
    }

    // Godot drops the patch version if it is 0.
    if patch != 0 {
        println!(r#"cargo:rustc-cfg=gdextension_exact_api="{major}.{minor}.{patch}""#);
    } else {
        println!(r#"cargo:rustc-cfg=gdextension_exact_api="{major}.{minor}""#);
    }
}

/// Declares the custom cfgs above, so that `unexpected_cfgs` does not fire in dependent crates.
pub fn emit_checks_cfgs() {
    let mut since = Vec::new();
    let mut before = Vec::new();
    for m in 1..=NEXT_MINOR_VERSION {
        since.push(format!(r#""4.{m}""#));
        before.push(format!(r#""4.{m}""#));
    }

    println!(
        "cargo:rustc-check-cfg=cfg(since_api, values({}))",
        since.join(", ")
    );
    println!(
        "cargo:rustc-check-cfg=cfg(before_api, values({}))",
        before.join(", ")
    );
    println!("cargo:rustc-check-cfg=cfg(gdextension_exact_api, values(any()))");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_manifest_version() {
        let version = read_godot_version(BUNDLED_EXTENSION_JSON);

        assert_eq!(version.major, 4);
        assert!(version.minor >= 2, "bundled manifest must be 4.2+");
        assert_eq!(version.status, "stable");
        assert!(version.full_string.starts_with("Godot Engine v4."));
    }

    #[test]
    fn bundled_manifest_below_known_minor() {
        let version = read_godot_version(BUNDLED_EXTENSION_JSON);

        assert!(version.minor < NEXT_MINOR_VERSION);
    }
}
