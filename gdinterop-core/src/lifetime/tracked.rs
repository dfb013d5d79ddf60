/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::lifetime::{Disposable, DisposalToken, engine_available, registry};
use crate::sys;
use crate::sys::{Movable, NativeValue};

/// Owner of one native value, registered in the value bucket of the disposal registry.
///
/// The value is released exactly once: by [`dispose()`](Self::dispose), by `Drop`, or by the shutdown sweep, whichever comes first.
pub(crate) struct Tracked<N: NativeValue> {
    cell: Arc<TrackedCell<N>>,
}

struct TrackedCell<N: NativeValue> {
    slot: Mutex<Option<Movable<N>>>,
    token: DisposalToken,
}

impl<N: NativeValue> Tracked<N> {
    /// Takes ownership of `native`.
    pub fn new(native: N) -> Self {
        let cell = Arc::new_cyclic(|weak: &Weak<TrackedCell<N>>| {
            let weak: Weak<dyn Disposable> = weak.clone();
            TrackedCell {
                slot: Mutex::new(Some(Movable::from_native(native))),
                token: registry().register_disposable(weak),
            }
        });

        Self { cell }
    }

    /// Takes over the value at `src`; the slot must not be destroyed by anyone else.
    ///
    /// # Safety
    /// `src` must point to a live value of type `N`, owned by the caller.
    pub unsafe fn from_sys_taking_ownership(src: sys::GDExtensionTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::new(unsafe { N::take_from_sys(src) })
    }

    /// Copy-constructs from the value at `src`, which stays with its owner.
    ///
    /// # Safety
    /// `src` must point to a live value of type `N`.
    pub unsafe fn from_sys_copying(src: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::new(unsafe { N::copy_from_sys(src) })
    }

    /// Runs `f` on the native value.
    ///
    /// # Panics
    /// If the value has already been disposed.
    pub fn with<R>(&self, f: impl FnOnce(&N) -> R) -> R {
        let guard = self.cell.lock();
        let movable = guard.as_ref().unwrap_or_else(|| Self::panic_disposed());

        // SAFETY: the value is live while it is in the slot; the lock excludes concurrent disposal.
        f(unsafe { movable.native() })
    }

    /// Runs `f` on the native value, with exclusive access.
    ///
    /// # Panics
    /// If the value has already been disposed.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut N) -> R) -> R {
        let mut guard = self.cell.lock();
        let movable = guard.as_mut().unwrap_or_else(|| Self::panic_disposed());

        // SAFETY: see `with()`.
        f(unsafe { movable.native_mut() })
    }

    /// Copy-constructs an independent owner of the same value.
    pub fn clone_native(&self) -> N {
        self.with(|native| native.clone_native())
    }

    /// Releases the native value early. Later calls and the eventual `Drop` do nothing.
    pub fn dispose(&self) {
        self.cell.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.cell.is_disposed()
    }

    #[cfg(test)]
    pub fn token(&self) -> DisposalToken {
        self.cell.token
    }

    fn panic_disposed() -> ! {
        panic!(
            "{} used after it was disposed",
            sys::short_type_name::<N>()
        )
    }
}

impl<N: NativeValue> TrackedCell<N> {
    fn lock(&self) -> MutexGuard<'_, Option<Movable<N>>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<N: NativeValue> Disposable for TrackedCell<N> {
    fn dispose(&self) {
        let Some(mut movable) = self.lock().take() else {
            return;
        };

        // Past shutdown, the engine may already be gone: leak instead of calling into it.
        if engine_available() {
            // SAFETY: the value was live in the slot and is released exactly once, here.
            unsafe { movable.destroy_in_place() };
        }

        let unregistered = registry().unregister(self.token);
        debug_assert!(unregistered.is_ok(), "disposed twice: {unregistered:?}");
    }

    fn is_disposed(&self) -> bool {
        self.lock().is_none()
    }
}

impl<N: NativeValue> Drop for Tracked<N> {
    fn drop(&mut self) {
        self.cell.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifetime::DisposalError;
    use crate::sys::NativeString;

    // No engine is initialized in unit tests, so disposal leaks the value instead of passing it to the engine.
    fn detached_string() -> Tracked<NativeString> {
        // SAFETY: the zeroed value is never handed to the engine.
        Tracked::new(unsafe { NativeString::from_storage(sys::types::OpaqueString::zeroed()) })
    }

    #[test]
    fn dispose_unregisters_exactly_once() {
        let tracked = detached_string();
        let token = tracked.token();

        tracked.dispose();
        tracked.dispose();
        assert!(tracked.is_disposed());

        assert_eq!(registry().unregister(token), Err(DisposalError::NotRegistered(token)));
        drop(tracked);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "disposed twice")]
    fn lost_registration_is_caught() {
        let tracked = detached_string();
        assert_eq!(registry().unregister(tracked.token()), Ok(()));

        tracked.dispose();
    }
}
