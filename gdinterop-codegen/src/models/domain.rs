/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::models::json::{JsonEnum, JsonExtensionApi, JsonHeader};

pub struct ExtensionApi {
    pub godot_version: GodotApiVersion,
    pub builtin_sizes: Vec<BuiltinSize>,
    pub variant_types: Vec<Enumerator>,
    pub variant_operators: Vec<Enumerator>,
}

impl ExtensionApi {
    pub fn from_json(json: &JsonExtensionApi) -> Self {
        let mut builtin_sizes = Vec::new();
        for config_sizes in json.builtin_class_sizes.iter() {
            let config = BuildConfiguration::from_json(&config_sizes.build_configuration);
            if !config.is_applicable() {
                continue;
            }

            for size in config_sizes.sizes.iter() {
                builtin_sizes.push(BuiltinSize {
                    builtin_original_name: size.name.clone(),
                    config,
                    size: size.size,
                });
            }
        }

        Self {
            godot_version: GodotApiVersion::from_json(&json.header),
            builtin_sizes,
            variant_types: Enumerator::collect(json, "Variant.Type", "TYPE_"),
            variant_operators: Enumerator::collect(json, "Variant.Operator", "OP_"),
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Enums

pub struct Enumerator {
    /// SHOUT_CASE name without prefix, e.g. `STRING_NAME`.
    pub name: String,
    pub value: i64,
}

impl Enumerator {
    fn collect(json: &JsonExtensionApi, enum_name: &str, prefix: &str) -> Vec<Self> {
        let json_enum: &JsonEnum = json
            .global_enums
            .iter()
            .find(|e| e.name == enum_name)
            .unwrap_or_else(|| panic!("missing enum {enum_name} in JSON"));

        json_enum
            .values
            .iter()
            .filter_map(|c| {
                let name = c.name.strip_prefix(prefix).unwrap_or(&c.name);

                // Sentinel, not a real enumerator.
                (name != "MAX").then(|| Self {
                    name: name.to_string(),
                    value: c.value,
                })
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Build config + version

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BuildConfiguration {
    Float32,
    Float64,
    Double32,
    Double64,
}

impl BuildConfiguration {
    pub fn from_json(json: &str) -> Self {
        match json {
            "float_32" => Self::Float32,
            "float_64" => Self::Float64,
            "double_32" => Self::Double32,
            "double_64" => Self::Double64,
            _ => panic!("invalid build configuration: {json}"),
        }
    }

    #[cfg(feature = "double-precision")]
    pub fn is_applicable(self) -> bool {
        matches!(self, Self::Double32 | Self::Double64)
    }

    #[cfg(not(feature = "double-precision"))]
    pub fn is_applicable(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_64bit(self) -> bool {
        matches!(self, Self::Float64 | Self::Double64)
    }
}

pub struct BuiltinSize {
    pub builtin_original_name: String,
    pub config: BuildConfiguration,
    pub size: usize,
}

/// Godot API version (from the JSON; not runtime version).
#[derive(Clone)]
pub struct GodotApiVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,

    /// Without "Godot Engine " prefix.
    pub version_string: String,
}

impl GodotApiVersion {
    pub fn from_json(json: &JsonHeader) -> Self {
        let version_string = json
            .version_full_name
            .strip_prefix("Godot Engine ")
            .unwrap_or(&json.version_full_name)
            .to_string();

        Self {
            major: json.version_major,
            minor: json.version_minor,
            patch: json.version_patch,
            version_string,
        }
    }
}
