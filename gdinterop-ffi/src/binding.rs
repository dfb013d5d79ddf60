/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Process-wide storage of the loaded interface table.
//!
//! Initialization happens once per process; there is no way to swap the binding afterwards.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{GDExtensionClassLibraryPtr, GDExtensionInterface};

pub(crate) struct GodotBinding {
    interface: GDExtensionInterface,
    library: ClassLibraryPtr,
    runtime_version: RuntimeVersion,
    config: InteropConfig,
}

/// Newtype around `GDExtensionClassLibraryPtr` so we can implement `Sync` and `Send` manually for this.
struct ClassLibraryPtr(GDExtensionClassLibraryPtr);

// SAFETY: only the pointer value is shared. Dereferencing is up to the engine, which owns the pointee.
unsafe impl Sync for ClassLibraryPtr {}
// SAFETY: See `Sync` impl safety doc.
unsafe impl Send for ClassLibraryPtr {}

// SAFETY: the interface only holds function pointers, which are valid from any thread.
unsafe impl Sync for GodotBinding {}
// SAFETY: See `Sync` impl safety doc.
unsafe impl Send for GodotBinding {}

static BINDING: OnceLock<GodotBinding> = OnceLock::new();
static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Runtime configuration, decided by the extension at startup.
#[derive(Clone, Debug)]
pub struct InteropConfig {
    /// Print progress of the shutdown disposal sweep.
    pub verbose_disposal: bool,

    /// Whether handles still alive at shutdown are disposed by the sweep. If `false`, they are leaked to the engine.
    pub dispose_on_shutdown: bool,
}

impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            verbose_disposal: false,
            dispose_on_shutdown: true,
        }
    }
}

/// Engine version reported at runtime.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuntimeVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub string: String,
}

impl RuntimeVersion {
    pub fn triple(&self) -> (u8, u8, u8) {
        (self.major, self.minor, self.patch)
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Public API

/// Stores the binding for the rest of the process.
///
/// # Panics
/// If called a second time.
pub(crate) fn initialize_binding(
    interface: GDExtensionInterface,
    library: GDExtensionClassLibraryPtr,
    runtime_version: RuntimeVersion,
    config: InteropConfig,
) {
    let binding = GodotBinding {
        interface,
        library: ClassLibraryPtr(library),
        runtime_version,
        config,
    };

    assert!(
        BINDING.set(binding).is_ok(),
        "gdinterop binding must only be initialized once per process"
    );
}

pub fn is_initialized() -> bool {
    BINDING.get().is_some()
}

/// Marks the start of extension shutdown. Irreversible.
pub fn begin_shutdown() {
    SHUTTING_DOWN.store(true, Ordering::Release);
}

pub fn is_shutting_down() -> bool {
    SHUTTING_DOWN.load(Ordering::Acquire)
}

fn get_binding() -> &'static GodotBinding {
    match BINDING.get() {
        Some(binding) => binding,
        None => panic!(
            "Godot engine not available; make sure you are not calling it from unit/doc tests \
            and that the extension was initialized"
        ),
    }
}

/// Returns the interface table.
///
/// # Panics
/// If the binding has not been initialized.
#[inline]
pub fn get_interface() -> &'static GDExtensionInterface {
    &get_binding().interface
}

#[inline]
pub fn get_library() -> GDExtensionClassLibraryPtr {
    get_binding().library.0
}

pub fn runtime_version() -> &'static RuntimeVersion {
    &get_binding().runtime_version
}

pub fn config() -> &'static InteropConfig {
    &get_binding().config
}

/// Fetches a function from the interface table.
///
/// Panics with the function's name if the engine did not provide it.
#[macro_export]
macro_rules! interface_fn {
    ($name:ident) => {{
        match $crate::get_interface().$name {
            Some(f) => f,
            None => $crate::missing_interface_fn(stringify!($name)),
        }
    }};
}

#[doc(hidden)]
#[cold]
#[track_caller]
pub fn missing_interface_fn(name: &str) -> ! {
    panic!(
        "GDExtension interface function `{name}` not provided by the engine; \
        the engine is older than the API this extension was compiled against"
    )
}
