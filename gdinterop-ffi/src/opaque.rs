/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Stores an opaque object of a certain size, with very restricted operations.
///
/// Note: due to `align(4)` / `align(8)` and not `packed` repr, this type may be bigger than `N` bytes
/// (which is OK since the engine just needs to read/write those `N` bytes reliably).
///
/// Sizes come from the manifest's `builtin_class_sizes` for the active build configuration. We have to do a
/// `target_pointer_width` check *after* code generation, see <https://github.com/rust-lang/rust/issues/42587>.
#[cfg_attr(target_pointer_width = "32", repr(C, align(4)))]
#[cfg_attr(target_pointer_width = "64", repr(C, align(8)))]
#[derive(Copy, Clone)]
pub struct Opaque<const N: usize> {
    storage: [u8; N],
    marker: std::marker::PhantomData<*const u8>, // disable Send/Sync
}

impl<const N: usize> Opaque<N> {
    /// All-zero bytes. Only meaningful for types whose zero pattern is a valid value (e.g. `Nil` variant).
    pub const fn zeroed() -> Self {
        Self {
            storage: [0; N],
            marker: std::marker::PhantomData,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_alignment_covers_pointers() {
        assert_eq!(
            std::mem::align_of::<Opaque<8>>(),
            std::mem::align_of::<usize>()
        );
        assert!(std::mem::size_of::<Opaque<3>>() >= 3);
        assert!(Opaque::<16>::zeroed().as_bytes().iter().all(|b| *b == 0));
    }
}
