/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use gdinterop::builtin::*;
use gdinterop::global;
use gdinterop::meta::Marshal;
use gdinterop::{godot_error, godot_print, godot_script_error, godot_warn};
use itest::framework::engine::Message;
use itest::framework::{IntegrationTests, initialize, messages_during};

#[test]
fn macros_reach_engine_console() {
    initialize::<IntegrationTests>();

    let needle = "macro-marker";
    let messages = messages_during(needle, || {
        godot_print!("{needle}: print {}", 1);
        godot_warn!("{needle}: warn {}", 2);
        godot_error!("{needle}: error {}", 3);
        godot_script_error!("{needle}: script error {}", 4);
    });

    assert_eq!(
        messages,
        vec![
            Message::Print("macro-marker: print 1".to_string()),
            Message::Warning("macro-marker: warn 2".to_string()),
            Message::Error("macro-marker: error 3".to_string()),
            Message::ScriptError("macro-marker: script error 4".to_string()),
        ]
    );
}

#[test]
fn print_concatenates_stringified_args() {
    initialize::<IntegrationTests>();

    let messages = messages_during("concat-marker", || {
        global::print(&[
            GString::from("concat-marker:").to_variant(),
            7i64.to_variant(),
            2.5f64.to_variant(),
            true.to_variant(),
            Variant::nil(),
            Vector2::new(1.0, -2.0).to_variant(),
        ]);
    });

    assert_eq!(messages.len(), 1, "{messages:?}");
    assert_eq!(messages[0].text(), "concat-marker:72.5true<null>(1, -2)");
}

#[test]
fn print_quotes_strings_only_inside_containers() {
    initialize::<IntegrationTests>();

    let array = VarArray::from(&[GString::from("nested").to_variant(), 1i64.to_variant()][..]);

    let messages = messages_during("container-marker", || {
        global::print(&[GString::from("container-marker ").to_variant(), array.to_variant()]);
    });

    assert_eq!(messages.len(), 1, "{messages:?}");
    assert_eq!(messages[0].text(), "container-marker [\"nested\", 1]");
}
