/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

// Loads the library through its exported entry symbol, the way the engine does. Initialization happens once per process,
// so only one test performs the load, and `framework::initialize()` is not used here.

use std::sync::Mutex;

use gdinterop::builtin::VarArray;
use gdinterop::meta::Marshal;
use gdinterop::init::{ExtensionLibrary, InitLevel, gdextension};
use gdinterop::lifetime::registry;
use gdinterop::sys;
use itest::framework::engine;

static EVENTS: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn record(event: String) {
    EVENTS.lock().expect("events lock").push(event);
}

struct SceneExtension;

#[gdextension(entry_point = scene_extension_init)]
impl ExtensionLibrary for SceneExtension {
    fn min_level() -> InitLevel {
        InitLevel::Scene
    }

    fn on_level_init(level: InitLevel) {
        record(format!("init {level:?}"));
    }

    fn on_level_deinit(level: InitLevel) {
        record(format!("deinit {level:?}"));
    }

    fn on_shutdown() {
        record("shutdown".to_string());
    }
}

#[test]
fn entry_point_drives_init_levels() {
    let mut init = sys::GDExtensionInitialization {
        minimum_initialization_level: sys::GDEXTENSION_INITIALIZATION_CORE,
        userdata: std::ptr::null_mut(),
        initialize: None,
        deinitialize: None,
    };

    // SAFETY: the engine double provides all interface functions; the symbol is called once, with a writable struct.
    let loaded = unsafe { scene_extension_init(Some(engine::get_proc_address), engine::library(), &mut init) };

    assert_eq!(loaded, sys::SYS_TRUE);
    assert!(sys::is_initialized());
    assert_eq!(init.minimum_initialization_level, sys::GDEXTENSION_INITIALIZATION_SCENE);

    let initialize = init.initialize.expect("initialize callback");
    let deinitialize = init.deinitialize.expect("deinitialize callback");

    let levels = [
        sys::GDEXTENSION_INITIALIZATION_CORE,
        sys::GDEXTENSION_INITIALIZATION_SERVERS,
        sys::GDEXTENSION_INITIALIZATION_SCENE,
        sys::GDEXTENSION_INITIALIZATION_EDITOR,
    ];

    for level in levels {
        // SAFETY: callbacks were filled in by the entry point; levels are loaded in ascending order.
        unsafe { initialize(init.userdata, level) };
    }

    let mut leftover = VarArray::new();
    leftover.push(&7i64.to_variant());

    for level in levels.into_iter().rev() {
        // SAFETY: as above, in descending order.
        unsafe { deinitialize(init.userdata, level) };
    }

    let events = EVENTS.lock().expect("events lock").clone();
    assert_eq!(
        events,
        ["init Scene", "init Editor", "deinit Editor", "deinit Scene", "shutdown"],
    );

    // Unloading the lowest level shut the library down.
    assert!(sys::is_shutting_down());
    assert!(leftover.is_disposed());
    assert!(registry().is_empty());
}

#[test]
fn entry_point_rejects_missing_initialization_struct() {
    // Fails before touching the engine, so it can share the process with the test above.
    // SAFETY: null init pointer is checked before anything else happens.
    let loaded = unsafe {
        scene_extension_init(Some(engine::get_proc_address), engine::library(), std::ptr::null_mut())
    };

    assert_eq!(loaded, sys::SYS_FALSE);
}
