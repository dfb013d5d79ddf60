/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

// In #[derive(DeJson)]: "this block may be rewritten with the `?` operator"
#![allow(clippy::question_mark)]

// Only the parts of the manifest that describe the value layer are modeled. Unknown keys (classes, utility functions, ...) are skipped.

use nanoserde::DeJson;

#[derive(DeJson)]
pub struct JsonExtensionApi {
    pub header: JsonHeader,
    pub builtin_class_sizes: Vec<JsonBuiltinSizes>,
    pub global_enums: Vec<JsonEnum>,
}

#[derive(DeJson, Clone, Debug)]
pub struct JsonHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub version_patch: u8,
    pub version_full_name: String,
}

#[derive(DeJson)]
pub struct JsonBuiltinSizes {
    pub build_configuration: String,
    pub sizes: Vec<JsonBuiltinSizeForConfig>,
}

#[derive(DeJson)]
pub struct JsonBuiltinSizeForConfig {
    pub name: String,
    pub size: usize,
}

#[derive(DeJson)]
pub struct JsonEnum {
    pub name: String,
    pub values: Vec<JsonEnumConstant>,
}

#[derive(DeJson)]
pub struct JsonEnumConstant {
    pub name: String,
    pub value: i64,
}

pub fn load_extension_api(json: &str) -> JsonExtensionApi {
    JsonExtensionApi::deserialize_json(json)
        .unwrap_or_else(|e| panic!("failed to deserialize extension API JSON: {e}"))
}
