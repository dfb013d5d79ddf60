/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Reads the `header` section of a manifest.
//!
//! Only the header is parsed here; `gdinterop-codegen` owns the full JSON model. Keeping this minimal means a manifest from a newer
//! engine with extra keys still yields a version.

use std::fs;
use std::path::Path;

use nanoserde::DeJson;

use crate::GodotVersion;

#[derive(DeJson)]
struct JsonExtensionApi {
    pub header: JsonHeader,
}

#[derive(DeJson)]
struct JsonHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub version_patch: u8,
    pub version_status: String,
    pub version_build: String,
    pub version_full_name: String,
}

impl JsonHeader {
    fn into_godot_version(self) -> GodotVersion {
        GodotVersion {
            full_string: self.version_full_name,
            major: self.version_major,
            minor: self.version_minor,
            patch: self.version_patch,
            status: self.version_status,
            custom_rev: Some(self.version_build),
        }
    }
}

pub(crate) fn load_custom_extension_json(json_path: &Path) -> String {
    let json = fs::read_to_string(json_path).unwrap_or_else(|e| {
        panic!(
            "failed to open custom extension JSON {}: {e}",
            json_path.display()
        )
    });

    validate_header(&json);
    json
}

/// Parses the version out of the manifest's header.
///
/// # Panics
/// If the JSON has no valid header.
pub fn read_godot_version(json: &str) -> GodotVersion {
    let api = JsonExtensionApi::deserialize_json(json)
        .unwrap_or_else(|e| panic!("failed to parse extension API header: {e}"));

    api.header.into_godot_version()
}

/// Panics if the manifest was produced by an engine this crate does not support.
pub fn validate_header(json: &str) {
    let version = read_godot_version(json);

    assert_eq!(
        version.major, 4,
        "only Godot 4 manifests are supported, got {}",
        version.full_string
    );
    assert!(
        version.minor >= 2,
        "extension API 4.2+ required (get_proc_address interface), got {}",
        version.full_string
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_extra_keys() {
        let json = r#"{
            "header": {
                "version_major": 4,
                "version_minor": 4,
                "version_patch": 1,
                "version_status": "rc",
                "version_build": "custom_build",
                "version_full_name": "Godot Engine v4.4.1.rc.custom_build",
                "precision": "double"
            },
            "classes": []
        }"#;

        let version = read_godot_version(json);
        assert_eq!(
            version,
            GodotVersion {
                full_string: "Godot Engine v4.4.1.rc.custom_build".to_string(),
                major: 4,
                minor: 4,
                patch: 1,
                status: "rc".to_string(),
                custom_rev: Some("custom_build".to_string()),
            }
        );
    }

    #[test]
    #[should_panic(expected = "4.2+")]
    fn reject_legacy_manifest() {
        let json = r#"{"header": {
            "version_major": 4, "version_minor": 1, "version_patch": 0,
            "version_status": "stable", "version_build": "official",
            "version_full_name": "Godot Engine v4.1.stable.official"
        }}"#;

        validate_header(json);
    }
}
