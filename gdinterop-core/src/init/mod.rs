/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Startup and shutdown of the extension.
//!
//! The engine enters through the function generated by `#[gdextension]`, which calls [`__gdinterop_load_library()`]. That runs
//! [`initialize()`]: it loads the engine interface and runs the registration pass of the
//! [conversion registry](crate::meta::conversion_registry). When the engine unloads the lowest initialization level of the
//! extension, [`deinitialize()`] sweeps the disposal registry, so that no native value outlives the engine.

use crate::lifetime::{DisposalSummary, registry};
use crate::meta::ConversionRegistrar;
use crate::meta::conversion_registry::register_builtin_conversions;
use crate::{godot_error, sys};

pub use sys::{InteropBuild, InteropConfig as ExtensionConfig, RuntimeVersion};

/// Stage of the engine's initialization process, see [`ExtensionLibrary::on_level_init()`].
pub type InitLevel = sys::InitLevel;

#[doc(hidden)]
/// Body of the entry point generated by `#[gdextension]`.
///
/// # Safety
/// Must only be called by the engine, with the arguments it passes to the extension's entry symbol.
pub unsafe fn __gdinterop_load_library<E: ExtensionLibrary>(
    get_proc_address: sys::GDExtensionInterfaceGetProcAddress,
    library: sys::GDExtensionClassLibraryPtr,
    init: *mut sys::GDExtensionInitialization,
) -> sys::GDExtensionBool {
    let Some(get_proc_address) = get_proc_address else {
        godot_error!("engine passed no get_proc_address function to the extension");
        return sys::SYS_FALSE;
    };

    if init.is_null() {
        godot_error!("engine passed no initialization struct to the extension");
        return sys::SYS_FALSE;
    }

    // SAFETY: forwarded to caller.
    if !unsafe { initialize::<E>(get_proc_address, library) } {
        return sys::SYS_FALSE;
    }

    let init_params = sys::GDExtensionInitialization {
        minimum_initialization_level: E::min_level().to_sys(),
        userdata: std::ptr::null_mut(),
        initialize: Some(ffi_initialize_layer::<E>),
        deinitialize: Some(ffi_deinitialize_layer::<E>),
    };

    // SAFETY: the engine passes a writable initialization struct; checked for null above.
    unsafe { *init = init_params };

    sys::SYS_TRUE
}

unsafe extern "C" fn ffi_initialize_layer<E: ExtensionLibrary>(
    _userdata: *mut std::ffi::c_void,
    init_level: sys::GDExtensionInitializationLevel,
) {
    let level = InitLevel::from_sys(init_level);
    if level < E::min_level() {
        return;
    }

    let ctx = || format!("failed to initialize GDExtension level `{level:?}`");

    // Swallow panics.
    let _ = crate::private::handle_panic(ctx, || E::on_level_init(level));
}

unsafe extern "C" fn ffi_deinitialize_layer<E: ExtensionLibrary>(
    _userdata: *mut std::ffi::c_void,
    init_level: sys::GDExtensionInitializationLevel,
) {
    let level = InitLevel::from_sys(init_level);
    if level < E::min_level() {
        return;
    }

    let ctx = || format!("failed to deinitialize GDExtension level `{level:?}`");
    let _ = crate::private::handle_panic(ctx, || E::on_level_deinit(level));

    // The lowest level goes last: release everything that is still tracked.
    if level == E::min_level() && !sys::is_shutting_down() {
        deinitialize::<E>();
    }
}

/// Defines the entry points of an extension.
///
/// All methods have defaults; implement the trait on a unit struct and override what is needed. Combined with the
/// [`#[gdextension]`](attr.gdextension.html) attribute, this exports the symbol that the engine loads.
///
/// ```no_run
/// use gdinterop::init::{ExtensionConfig, ExtensionLibrary, gdextension};
/// use gdinterop::meta::ConversionRegistrar;
/// use gdinterop::builtin::{GString, Vector2};
///
/// struct MyExtension;
///
/// #[gdextension]
/// impl ExtensionLibrary for MyExtension {
///     fn config() -> ExtensionConfig {
///         ExtensionConfig { verbose_disposal: true, ..Default::default() }
///     }
///
///     fn register_conversions(registrar: &mut ConversionRegistrar) {
///         registrar.dictionary::<GString, Vector2>();
///     }
/// }
/// ```
pub trait ExtensionLibrary {
    /// Runtime configuration, read once at startup.
    fn config() -> ExtensionConfig {
        ExtensionConfig::default()
    }

    /// Registers conversions of types that go through the registry (typed containers of user types, user types).
    ///
    /// Called once during [`initialize()`], after the builtin registrations.
    fn register_conversions(registrar: &mut ConversionRegistrar) {
        let _ = registrar;
    }

    /// Lowest initialization level at which the extension is loaded (`Core` by default).
    ///
    /// Levels below it are skipped by the level callbacks. Unloading this level shuts the extension down.
    fn min_level() -> InitLevel {
        InitLevel::Core
    }

    /// Custom logic when an initialization level of the engine is loaded.
    ///
    /// Invoked for levels >= [`Self::min_level()`], in ascending order.
    #[allow(unused_variables)]
    fn on_level_init(level: InitLevel) {}

    /// Custom logic when an initialization level of the engine is unloaded.
    ///
    /// Invoked for levels >= [`Self::min_level()`], in descending order. For the lowest level, this runs before
    /// [`on_shutdown()`](Self::on_shutdown).
    #[allow(unused_variables)]
    fn on_level_deinit(level: InitLevel) {}

    /// Called at the start of [`deinitialize()`], while the engine is still fully available.
    fn on_shutdown() {}
}

/// Connects the library to the engine and runs the registration pass.
///
/// Returns `false` if initialization failed; the error has been printed in that case.
///
/// # Safety
/// - `get_proc_address` must be the function pointer passed by the engine to the extension entry point.
/// - `library` must be the library pointer passed alongside it.
/// - Must be called at most once per process.
pub unsafe fn initialize<E: ExtensionLibrary>(
    get_proc_address: sys::GetProcAddressFn,
    library: sys::GDExtensionClassLibraryPtr,
) -> bool {
    let init_code = || {
        // SAFETY: forwarded to caller.
        unsafe { sys::initialize(get_proc_address, library, E::config()) };

        let mut registrar = ConversionRegistrar::new();
        register_builtin_conversions(&mut registrar);
        E::register_conversions(&mut registrar);

        sys::out!(
            "Registered {} conversion slot sets ({} already present).",
            registrar.added().len(),
            registrar.skipped().len()
        );
    };

    let ctx = || "error when loading GDExtension library";
    crate::private::handle_panic(ctx, init_code).is_ok()
}

/// Shuts the library down: calls [`ExtensionLibrary::on_shutdown()`], then disposes every handle that is still alive.
///
/// Afterwards, dropping leftover handles no longer calls into the engine. Returns how many handles the sweep disposed.
pub fn deinitialize<E: ExtensionLibrary>() -> DisposalSummary {
    let ctx = || "error in ExtensionLibrary::on_shutdown()";
    let _ = crate::private::handle_panic(ctx, E::on_shutdown);

    sys::begin_shutdown();

    if !sys::is_initialized() {
        return DisposalSummary::default();
    }

    let config = sys::config();
    if config.dispose_on_shutdown {
        registry().dispose_all(config.verbose_disposal)
    } else {
        DisposalSummary::default()
    }
}
