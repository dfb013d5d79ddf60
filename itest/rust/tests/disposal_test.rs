/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gdinterop::builtin::*;
use gdinterop::lifetime::{
    Disposable, DisposalBucket, DisposalError, DisposalRegistry, DisposalSummary, registry,
};
use gdinterop::meta::Marshal;
use itest::framework::engine::Message;
use itest::framework::{IntegrationTests, expect_panic, initialize, messages_during};

/// Counts its disposals; optionally records them in a shared log.
#[derive(Default)]
struct CountingEntry {
    label: &'static str,
    disposals: AtomicUsize,
    log: Option<Arc<Mutex<Vec<&'static str>>>>,
}

impl CountingEntry {
    fn logged(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
        Arc::new(Self {
            label,
            disposals: AtomicUsize::new(0),
            log: Some(log.clone()),
        })
    }
}

impl Disposable for CountingEntry {
    fn dispose(&self) {
        if self.disposals.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(log) = &self.log {
                log.lock().unwrap().push(self.label);
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposals.load(Ordering::SeqCst) > 0
    }
}

fn weak(counter: &Arc<CountingEntry>) -> std::sync::Weak<dyn Disposable> {
    let counter: Arc<dyn Disposable> = counter.clone();
    Arc::downgrade(&counter)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Disposing values

#[test]
fn containers_dispose_idempotently() {
    initialize::<IntegrationTests>();

    let array = Array::<i64>::from(&[1, 2, 3][..]);
    array.dispose();
    array.dispose();
    assert!(array.is_disposed());

    let mut dict = Dictionary::new();
    dict.set(&1i64, &GString::from("one"));
    dict.dispose();
    dict.dispose();
    assert!(dict.is_disposed());

    let packed = PackedInt32Array::from(&[4, 5][..]);
    packed.dispose();
    assert!(packed.is_disposed());

    // Dropping disposed values is a no-op.
    drop(array);
    drop(dict);
    drop(packed);
}

#[test]
fn disposed_values_panic_on_use() {
    initialize::<IntegrationTests>();

    let array = VarArray::new();
    array.dispose();
    expect_panic("Array::len() after dispose", || {
        let _ = array.len();
    });
    expect_panic("Array::to_variant() after dispose", || {
        let _ = array.to_variant();
    });
    expect_panic("Array::clone() after dispose", || {
        let _ = array.clone();
    });

    let dict = Dictionary::new();
    dict.dispose();
    expect_panic("Dictionary::keys() after dispose", || {
        let _ = dict.keys();
    });

    let name = StringName::from("gone");
    name.dispose();
    expect_panic("StringName::to_string() after dispose", || {
        let _ = name.to_string();
    });

    let path = NodePath::from("a/b");
    path.dispose();
    expect_panic("NodePath::to_variant() after dispose", || {
        let _ = path.to_variant();
    });
}

#[test]
fn disposing_one_copy_keeps_others() {
    initialize::<IntegrationTests>();

    let array = Array::<i64>::from(&[7, 8][..]);
    let shared = array.clone();
    let variant = array.to_variant();

    array.dispose();
    assert!(!shared.is_disposed());
    assert_eq!(shared.to_vec(), vec![7, 8]);
    assert_eq!(variant.to::<Array<i64>>().len(), 2);

    let name = StringName::from("kept");
    let copy = name.clone();
    name.dispose();
    assert_eq!(copy, StringName::from("kept"));
}

#[test]
fn value_handles_register_while_alive() {
    initialize::<IntegrationTests>();

    // Other tests run concurrently, so only check that live handles are visible.
    let values: Vec<VarArray> = (0..16).map(|_| VarArray::new()).collect();
    assert!(registry().len(DisposalBucket::Value) >= values.len());

    let objects: Vec<_> = (0..4)
        .map(|_| gdinterop::obj::Gd::<gdinterop::obj::classes::RefCounted>::instantiate())
        .collect();
    assert!(registry().len(DisposalBucket::EngineObject) >= objects.len());
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Registry bookkeeping

#[test]
fn custom_disposable_in_process_registry() {
    initialize::<IntegrationTests>();

    let counter = Arc::new(CountingEntry::default());
    let token = registry().register_disposable(weak(&counter));

    assert_eq!(registry().unregister(token), Ok(()));
    assert_eq!(counter.disposals.load(Ordering::SeqCst), 0);

    let needle = format!("{token:?}");
    let mut result = None;
    let errors = messages_during(&needle, || {
        result = Some(registry().unregister(token));
    });

    assert_eq!(result, Some(Err(DisposalError::NotRegistered(token))));
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(matches!(&errors[0], Message::Error(text) if text.contains("is not registered")));
}

#[test]
fn sweep_disposes_objects_before_values() {
    initialize::<IntegrationTests>();

    let local = DisposalRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let value = CountingEntry::logged("value", &log);
    let object = CountingEntry::logged("object", &log);
    let dropped = CountingEntry::logged("dropped", &log);
    local.register(DisposalBucket::Value, weak(&value));
    local.register(DisposalBucket::EngineObject, weak(&object));
    local.register(DisposalBucket::Value, weak(&dropped));
    drop(dropped);

    assert!(!local.is_sweeping());
    let summary = local.dispose_all(false);

    assert_eq!(summary, DisposalSummary { objects: 1, values: 1 });
    assert_eq!(*log.lock().unwrap(), vec!["object", "value"]);
    assert!(!local.is_sweeping());

    // Entries of dropped owners are pruned during the sweep.
    assert_eq!(local.len(DisposalBucket::Value), 1);

    // Already disposed entries are not counted again.
    assert_eq!(local.dispose_all(false), DisposalSummary::default());
    assert_eq!(value.disposals.load(Ordering::SeqCst), 1);
}
