/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Integration tests of `gdinterop`, run against an in-process double of the engine.
//!
//! Every file in `tests/` is its own process, with its own startup registration and shutdown.

pub mod framework;
