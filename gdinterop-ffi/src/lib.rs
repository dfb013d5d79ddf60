/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! # Internal crate of [**gdinterop**](https://docs.rs/gdinterop)
//!
//! Do not depend on this crate directly, instead use the `gdinterop` crate.
//! No SemVer or other guarantees are provided.
//!
//! Contains the GDExtension ABI subset, native value layouts, the interface table and the bind cache.

#![cfg_attr(test, allow(unused))]

// Output of generated code. Mimics the file structure, symbols are re-exported.
#[rustfmt::skip]
#[allow(
    non_camel_case_types,
    non_upper_case_globals,
    non_snake_case,
    clippy::redundant_static_lifetimes
)]
mod central {
    include!(concat!(env!("OUT_DIR"), "/central.rs"));
}

mod assertions;
mod binding;
mod gdextension_interface;
mod global;
mod init_level;
mod interface;
mod interface_init;
mod movable;
mod opaque;
mod toolbox;

pub mod bind_cache;
pub mod conv;
pub mod lifecycle;
pub mod native;

pub use bind_cache::{
    BindCell, MethodBind, PtrBuiltinMethod, PtrConstructor, PtrDestructor, PtrOperatorEvaluator,
    PtrUtilityFunction, resolve_builtin_method, resolve_method_bind, resolve_utility_function,
};
pub use binding::{
    InteropConfig, RuntimeVersion, begin_shutdown, config, get_interface, get_library,
    is_initialized, is_shutting_down, missing_interface_fn, runtime_version,
};
pub use central::*;
pub use conv::{SYS_FALSE, SYS_TRUE};
pub use gdextension_interface::*;
pub use global::{Global, GlobalReadGuard, GlobalWriteGuard};
pub use init_level::InitLevel;
pub use interface::{GDExtensionInterface, GetProcAddressFn};
pub use movable::Movable;
pub use native::*;
pub use toolbox::*;

// The impls only compile if those are different types -- ensures type safety of the opaque pointees.
trait Distinct {}
impl Distinct for GDExtensionVariantPtr {}
impl Distinct for GDExtensionTypePtr {}
impl Distinct for GDExtensionConstTypePtr {}
impl Distinct for GDExtensionStringNamePtr {}

/// Error code for custom call errors, outside the engine's own range. Only meaningful on the Rust side.
pub const GODOT_RUST_CUSTOM_CALL_ERROR: GDExtensionCallErrorType = 40;

/// Loads the interface table, checks the engine version and stores the binding for the process.
///
/// # Safety
/// - `get_proc_address` must be the function pointer passed by the engine to the extension entry point.
/// - `library` must be the pointer given by the engine at initialization.
///
/// # Panics
/// - If called a second time.
/// - If the running engine is older than the API manifest this crate was compiled against.
pub unsafe fn initialize(
    get_proc_address: GetProcAddressFn,
    library: GDExtensionClassLibraryPtr,
    config: InteropConfig,
) {
    out!("Load GDExtension interface...");

    // SAFETY: forwarded to caller.
    let interface = unsafe { GDExtensionInterface::load(get_proc_address) };

    let missing = interface.missing_functions();
    if !missing.is_empty() {
        out!("GDExtension interface functions not provided: {missing:?}");
    }

    let runtime_version = interface_init::ensure_runtime_compatibility(&interface);
    binding::initialize_binding(interface, library, runtime_version, config);

    out!(
        "Initialized gdinterop-ffi ({} precision, manifest {}).",
        InteropBuild::precision(),
        InteropBuild::godot_static_version_string()
    );
}

/// Fresh call error, initialized to "OK".
pub const fn default_call_error() -> GDExtensionCallError {
    GDExtensionCallError {
        error: GDEXTENSION_CALL_OK,
        argument: -1,
        expected: -1,
    }
}
