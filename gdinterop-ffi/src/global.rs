/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ops::{Deref, DerefMut};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Ergonomic global variables with shared and exclusive access.
///
/// No more `RwLock<Option<...>>` shenanigans with lazy initialization on each use site, or `OnceLock` which limits to immutable access.
///
/// It features:
/// - A `const` constructor, allowing to be used in `static` variables without `Option`.
/// - Initialization function provided in constructor, not in each use site separately.
/// - Concurrent readers through [`read()`](Self::read), a single writer through [`write()`](Self::write).
///
/// Lookup-heavy tables (e.g. conversion slots, read on every marshalled value) take the read path; registration takes the write path.
pub struct Global<T> {
    value: RwLock<InitState<T>>,
}

impl<T> Global<T> {
    /// Create `Global<T>`, providing a lazy initialization function.
    ///
    /// The initialization function is only called once, when the global is first accessed.
    pub const fn new(init_fn: fn() -> T) -> Self {
        Self {
            value: RwLock::new(InitState::Pending(init_fn)),
        }
    }

    /// Create `Global<T>` with `T::default()` as initialization function.
    ///
    /// This is inherent rather than implementing the `Default` trait, because the latter is not `const` and thus useless in static contexts.
    pub const fn default() -> Self
    where
        T: Default,
    {
        Self::new(T::default)
    }

    /// Returns a guard that gives shared access to the value.
    ///
    /// # Panics
    /// If the initialization function panicked, now or in an earlier call.
    pub fn read(&self) -> GlobalReadGuard<'_, T> {
        loop {
            {
                let guard = self.value.read().unwrap_or_else(|e| e.into_inner());
                match &*guard {
                    InitState::Initialized(_) => return GlobalReadGuard { guard },
                    InitState::Failed => panic!("previous Global<T> initialization failed due to panic"),
                    InitState::Pending(_) => {}
                }
            }

            // Initialize under the write lock, then retry the read.
            drop(self.write());
        }
    }

    /// Returns a guard that gives exclusive access to the value.
    ///
    /// # Panics
    /// If the initialization function panicked, now or in an earlier call.
    pub fn write(&self) -> GlobalWriteGuard<'_, T> {
        let mut guard = self.value.write().unwrap_or_else(|e| e.into_inner());

        match &*guard {
            InitState::Initialized(_) => {}
            InitState::Failed => panic!("previous Global<T> initialization failed due to panic"),
            InitState::Pending(init_fn) => {
                let init_fn = *init_fn;

                // Unwinding should be safe here, as there is no unsafe code relying on it.
                match std::panic::catch_unwind(init_fn) {
                    Ok(value) => *guard = InitState::Initialized(value),
                    Err(e) => {
                        eprintln!("panic during Global<T> initialization");
                        *guard = InitState::Failed;
                        std::panic::resume_unwind(e);
                    }
                }
            }
        }

        GlobalWriteGuard { guard }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Guards

/// Guard that temporarily gives shared access to a `Global<T>`'s inner value.
pub struct GlobalReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, InitState<T>>,
}

impl<T> Deref for GlobalReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.guard.unwrap_ref()
    }
}

/// Guard that temporarily gives exclusive access to a `Global<T>`'s inner value.
pub struct GlobalWriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, InitState<T>>,
}

impl<T> Deref for GlobalWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.guard.unwrap_ref()
    }
}

impl<T> DerefMut for GlobalWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.unwrap_mut()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Internals

enum InitState<T> {
    Initialized(T),
    Pending(fn() -> T),
    Failed,
}

impl<T> InitState<T> {
    fn unwrap_ref(&self) -> &T {
        match self {
            InitState::Initialized(t) => t,
            _ => {
                // SAFETY: This method is only called from a guard, which can only be obtained in Initialized state.
                unsafe { std::hint::unreachable_unchecked() }
            }
        }
    }

    fn unwrap_mut(&mut self) -> &mut T {
        match self {
            InitState::Initialized(t) => t,
            _ => {
                // SAFETY: This method is only called from a guard, which can only be obtained in Initialized state.
                unsafe { std::hint::unreachable_unchecked() }
            }
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    static MAP: Global<HashMap<i32, &'static str>> = Global::default();
    static VEC: Global<Vec<i32>> = Global::new(|| vec![1, 2, 3]);
    static FAILING: Global<u8> = Global::new(|| panic!("init failure"));

    #[test]
    fn test_global_map() {
        {
            let mut map = MAP.write();
            map.insert(2, "two");
            map.insert(3, "three");
        }

        {
            let mut map = MAP.write();
            map.insert(1, "one");
        }

        let map = MAP.read();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&1), Some(&"one"));
        assert_eq!(map.get(&2), Some(&"two"));
        assert_eq!(map.get(&3), Some(&"three"));
    }

    #[test]
    fn test_global_vec_read_initializes() {
        assert_eq!(*VEC.read(), &[1, 2, 3]);

        VEC.write().push(4);

        let a = VEC.read();
        let b = VEC.read();
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_global_poisoned_by_init_panic() {
        let first = std::panic::catch_unwind(|| *FAILING.read());
        assert!(first.is_err());

        let second = std::panic::catch_unwind(|| *FAILING.read());
        assert!(second.is_err());
    }
}
