/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::panic;
use std::sync::Once;

use gdinterop::init::ExtensionLibrary;

pub mod engine;

/// Extension used by tests that do not register anything of their own.
pub struct IntegrationTests;

impl ExtensionLibrary for IntegrationTests {}

/// Connects the library to the in-process engine, once per test binary.
///
/// Every test calls this first; the first caller's `E` wins, so a test binary should stick to one extension type.
pub fn initialize<E: ExtensionLibrary>() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: the engine double provides all interface functions with their C signatures; runs once per process.
        let ok = unsafe { gdinterop::init::initialize::<E>(engine::get_proc_address, engine::library()) };
        assert!(ok, "failed to initialize gdinterop against the engine double");
    });
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Toolbox for tests

pub fn expect_panic(context: &str, code: impl FnOnce()) {
    // Generally, types should be unwind safe, and this helps ergonomics in testing (especially around &mut in expect_panic closures).
    let code = panic::AssertUnwindSafe(code);
    let panic = panic::catch_unwind(code);

    assert!(
        panic.is_err(),
        "code should have panicked but did not: {context}",
    );
}

/// Messages printed while `code` runs whose text contains `needle`.
///
/// Tests run in parallel, so other tests' messages may interleave; filter by a needle unique to the test.
pub fn messages_during(needle: &str, code: impl FnOnce()) -> Vec<engine::Message> {
    let before = engine::messages().len();
    code();

    engine::messages()
        .into_iter()
        .skip(before)
        .filter(|message| message.text().contains(needle))
        .collect()
}
