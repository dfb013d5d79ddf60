/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

// Shutdown is irreversible, so this binary holds a single test.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use gdinterop::builtin::*;
use gdinterop::init::{ExtensionConfig, ExtensionLibrary, deinitialize};
use gdinterop::lifetime::{DisposalBucket, registry};
use gdinterop::obj::Gd;
use gdinterop::obj::classes::{Node, RefCounted};
use itest::framework::engine::{self, Message};
use itest::framework::initialize;

static SHUTDOWN_CALLED: AtomicBool = AtomicBool::new(false);
static LIVE_AT_SHUTDOWN: AtomicUsize = AtomicUsize::new(0);

struct ShutdownTests;

impl ExtensionLibrary for ShutdownTests {
    fn config() -> ExtensionConfig {
        ExtensionConfig {
            verbose_disposal: true,
            ..Default::default()
        }
    }

    fn on_shutdown() {
        SHUTDOWN_CALLED.store(true, Ordering::SeqCst);

        // Handles are still usable here.
        LIVE_AT_SHUTDOWN.store(registry().len(DisposalBucket::EngineObject), Ordering::SeqCst);
    }
}

#[test]
fn shutdown_disposes_leftover_handles() {
    initialize::<ShutdownTests>();

    let refcounted = Gd::<RefCounted>::instantiate();
    let refcounted_id = refcounted.instance_id().to_i64() as u64;
    let node = Gd::<Node>::instantiate();
    let node_id = node.instance_id();

    let array = Array::<i64>::from(&[1, 2, 3][..]);
    let name = StringName::from("leftover");
    let packed = PackedByteArray::from(&[0u8, 1, 2][..]);

    let marker = Arc::new(());
    let captured = marker.clone();
    let callable = Callable::from_fn("leftover", move || Arc::strong_count(&captured) as i64);

    // Handles released before shutdown are already unregistered.
    let released = VarArray::new();
    released.dispose();
    drop(Dictionary::new());

    let objects_before = registry().len(DisposalBucket::EngineObject);
    let values_before = registry().len(DisposalBucket::Value);
    assert!(objects_before >= 2);

    let messages_before = engine::messages().len();
    let summary = deinitialize::<ShutdownTests>();

    assert!(SHUTDOWN_CALLED.load(Ordering::SeqCst));
    assert_eq!(LIVE_AT_SHUTDOWN.load(Ordering::SeqCst), objects_before);

    assert_eq!(summary.objects, objects_before);
    assert_eq!(summary.values, values_before);
    assert!(registry().is_empty());

    // Every leftover was released through the engine.
    assert!(refcounted.is_disposed());
    assert!(node.is_disposed());
    assert!(array.is_disposed());
    assert!(name.is_disposed());
    assert!(packed.is_disposed());
    assert!(callable.is_disposed());
    assert_eq!(engine::reference_count(refcounted_id), None);
    assert_eq!(Arc::strong_count(&marker), 1);

    // Manually managed objects are detached, not destroyed.
    assert!(engine::live_objects() >= 1);
    assert!(!node_id.is_ref_counted());

    let progress: Vec<String> = engine::messages()
        .into_iter()
        .skip(messages_before)
        .filter_map(|message| match message {
            Message::Print(text) => Some(text),
            _ => None,
        })
        .collect();
    assert!(progress.iter().any(|text| text == "Disposing tracked instances..."), "{progress:?}");
    assert!(
        progress.iter().any(|text| text.starts_with(&format!(
            "Finished disposing tracked instances ({} objects, {} values)",
            summary.objects, summary.values
        ))),
        "{progress:?}"
    );

    // Dropping after shutdown no longer reaches the engine.
    let destroyed_before = engine::destroyed_objects();
    drop(refcounted);
    drop(node);
    drop(array);
    drop(name);
    drop(packed);
    drop(callable);
    drop(released);
    assert_eq!(engine::destroyed_objects(), destroyed_before);
}
