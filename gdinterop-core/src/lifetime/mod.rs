/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Lifetime tracking of wrappers that own engine-side resources.
//!
//! Every such wrapper (containers, `StringName`, `NodePath`, `Callable`, `Signal`, object handles) releases its native value on
//! `Drop`. In addition, it registers a weak reference in the process-wide [`DisposalRegistry`], so that handles still alive when
//! the extension shuts down (e.g. stored in leaked statics or thread-locals) can be released while the engine is still loaded.
//!
//! Engine objects are swept before plain values, since releasing an object may still need strings or containers.

mod tracked;

pub(crate) use tracked::Tracked;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, Weak};

use crate::{godot_error, godot_print, sys};

/// A wrapper owning an engine-side resource, which can be released before it is dropped.
pub trait Disposable: Send + Sync {
    /// Releases the native resource. Calling this more than once has no effect.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Identifies one registration in the [`DisposalRegistry`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DisposalToken(u64);

/// Which sweep a registration belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DisposalBucket {
    /// Engine object handles, disposed first.
    EngineObject,

    /// Builtin values such as containers and strings, disposed after all objects.
    Value,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum DisposalError {
    /// The token was never registered, or was already unregistered.
    NotRegistered(DisposalToken),
}

impl fmt::Display for DisposalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered(token) => write!(f, "disposable {token:?} is not registered"),
        }
    }
}

impl std::error::Error for DisposalError {}

/// Outcome of [`DisposalRegistry::dispose_all()`].
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct DisposalSummary {
    /// Engine objects that were still alive and got disposed.
    pub objects: usize,

    /// Builtin values that were still alive and got disposed.
    pub values: usize,
}

type WeakMap = BTreeMap<DisposalToken, Weak<dyn Disposable>>;

/// Registry of live disposables, in two buckets. Thread-safe.
pub struct DisposalRegistry {
    next_token: AtomicU64,
    objects: Mutex<WeakMap>,
    values: Mutex<WeakMap>,
    sweeping: AtomicBool,
}

static REGISTRY: DisposalRegistry = DisposalRegistry::new();

/// The process-wide registry used by all wrappers.
pub fn registry() -> &'static DisposalRegistry {
    &REGISTRY
}

impl DisposalRegistry {
    pub const fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            objects: Mutex::new(BTreeMap::new()),
            values: Mutex::new(BTreeMap::new()),
            sweeping: AtomicBool::new(false),
        }
    }

    pub fn register_engine_object(&self, object: Weak<dyn Disposable>) -> DisposalToken {
        self.register(DisposalBucket::EngineObject, object)
    }

    pub fn register_disposable(&self, value: Weak<dyn Disposable>) -> DisposalToken {
        self.register(DisposalBucket::Value, value)
    }

    pub fn register(&self, bucket: DisposalBucket, entry: Weak<dyn Disposable>) -> DisposalToken {
        let token = DisposalToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.bucket(bucket).insert(token, entry);
        token
    }

    /// Removes a registration. Removing an unknown token is a bookkeeping bug and is reported loudly.
    pub fn unregister(&self, token: DisposalToken) -> Result<(), DisposalError> {
        let removed = self.bucket(DisposalBucket::EngineObject).remove(&token).is_some()
            || self.bucket(DisposalBucket::Value).remove(&token).is_some();

        if removed {
            Ok(())
        } else {
            let err = DisposalError::NotRegistered(token);
            godot_error!("DisposalRegistry: {err}");
            Err(err)
        }
    }

    /// Number of registrations in `bucket`, including entries whose owner is already gone.
    pub fn len(&self, bucket: DisposalBucket) -> usize {
        self.bucket(bucket).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len(DisposalBucket::EngineObject) == 0 && self.len(DisposalBucket::Value) == 0
    }

    /// Disposes every live engine object, then every live value.
    ///
    /// Meant to run once, during extension shutdown. Locks are not held while disposing, so disposal may unregister.
    pub fn dispose_all(&self, verbose: bool) -> DisposalSummary {
        let verbose = verbose && sys::is_initialized();
        if verbose {
            godot_print!("Disposing tracked instances...");
        }

        self.sweeping.store(true, Ordering::Release);
        let summary = DisposalSummary {
            objects: self.dispose_bucket(DisposalBucket::EngineObject),
            values: self.dispose_bucket(DisposalBucket::Value),
        };
        self.sweeping.store(false, Ordering::Release);

        if verbose {
            godot_print!(
                "Finished disposing tracked instances ({} objects, {} values).",
                summary.objects,
                summary.values
            );
        }

        summary
    }

    /// Whether [`dispose_all()`](Self::dispose_all) is currently running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeping.load(Ordering::Acquire)
    }

    fn dispose_bucket(&self, bucket: DisposalBucket) -> usize {
        let snapshot: Vec<(DisposalToken, Weak<dyn Disposable>)> = self
            .bucket(bucket)
            .iter()
            .map(|(token, weak)| (*token, weak.clone()))
            .collect();

        let mut disposed = 0;
        for (token, weak) in snapshot {
            match weak.upgrade() {
                Some(entry) if !entry.is_disposed() => {
                    entry.dispose();
                    disposed += 1;
                }
                Some(_) => {}

                // Owner dropped between snapshot and now, or leaked its registration.
                None => {
                    self.bucket(bucket).remove(&token);
                }
            }
        }

        disposed
    }

    fn bucket(&self, bucket: DisposalBucket) -> MutexGuard<'_, WeakMap> {
        let map = match bucket {
            DisposalBucket::EngineObject => &self.objects,
            DisposalBucket::Value => &self.values,
        };

        // Maps stay consistent under panics (single insert/remove per lock).
        map.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for DisposalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether native values may be released through the engine right now.
///
/// After shutdown has begun, only the registry's own sweep may still call into the engine; later drops leak instead.
pub(crate) fn engine_available() -> bool {
    sys::is_initialized() && (!sys::is_shutting_down() || REGISTRY.is_sweeping())
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    struct CountingEntry {
        bucket: DisposalBucket,
        log: Arc<Mutex<Vec<DisposalBucket>>>,
        disposed: AtomicBool,
    }

    impl Disposable for CountingEntry {
        fn dispose(&self) {
            if !self.disposed.swap(true, Ordering::AcqRel) {
                self.log.lock().unwrap().push(self.bucket);
            }
        }

        fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::Acquire)
        }
    }

    fn counting_entry(bucket: DisposalBucket, log: &Arc<Mutex<Vec<DisposalBucket>>>) -> Arc<CountingEntry> {
        Arc::new(CountingEntry {
            bucket,
            log: log.clone(),
            disposed: AtomicBool::new(false),
        })
    }

    #[test]
    fn unregister_twice_fails() {
        let registry = DisposalRegistry::new();
        let log = Arc::default();
        let entry: Arc<dyn Disposable> = counting_entry(DisposalBucket::Value, &log);

        let token = registry.register_disposable(Arc::downgrade(&entry));
        assert_eq!(registry.unregister(token), Ok(()));
        assert_eq!(registry.unregister(token), Err(DisposalError::NotRegistered(token)));
        assert!(registry.is_empty());
    }

    #[test]
    fn dropped_entries_are_skipped() {
        let registry = DisposalRegistry::new();
        let log = Arc::default();

        let dead: Arc<dyn Disposable> = counting_entry(DisposalBucket::Value, &log);
        registry.register_disposable(Arc::downgrade(&dead));
        drop(dead);

        let summary = registry.dispose_all(false);
        assert_eq!(summary, DisposalSummary::default());
        assert!(registry.is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn second_sweep_disposes_nothing() {
        let registry = DisposalRegistry::new();
        let log = Arc::default();
        let entry: Arc<dyn Disposable> = counting_entry(DisposalBucket::EngineObject, &log);
        registry.register_engine_object(Arc::downgrade(&entry));

        assert_eq!(registry.dispose_all(false).objects, 1);
        assert_eq!(registry.dispose_all(false).objects, 0);
        assert!(entry.is_disposed());
    }

    proptest! {
        #[test]
        fn objects_are_disposed_before_values(buckets in prop::collection::vec(any::<bool>(), 0..40)) {
            let registry = DisposalRegistry::new();
            let log = Arc::new(Mutex::new(Vec::new()));

            let entries: Vec<Arc<dyn Disposable>> = buckets
                .iter()
                .map(|&is_object| {
                    let bucket = if is_object { DisposalBucket::EngineObject } else { DisposalBucket::Value };
                    let entry: Arc<dyn Disposable> = counting_entry(bucket, &log);
                    registry.register(bucket, Arc::downgrade(&entry));
                    entry
                })
                .collect();

            let summary = registry.dispose_all(false);
            let object_count = buckets.iter().filter(|b| **b).count();
            prop_assert_eq!(summary.objects, object_count);
            prop_assert_eq!(summary.values, buckets.len() - object_count);

            let log = log.lock().unwrap();
            let first_value = log.iter().position(|b| *b == DisposalBucket::Value).unwrap_or(log.len());
            prop_assert!(log[first_value..].iter().all(|b| *b == DisposalBucket::Value));
            prop_assert!(entries.iter().all(|e| e.is_disposed()));
        }
    }
}
