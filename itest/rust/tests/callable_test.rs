/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gdinterop::builtin::*;
use gdinterop::meta::Marshal;
use itest::framework::{IntegrationTests, initialize, messages_during};

#[test]
fn callable_invokes_closure() {
    initialize::<IntegrationTests>();

    let add = Callable::from_fn("add", |a: i64, b: i64| a + b);
    assert!(add.is_valid());
    assert_eq!(add.arg_count(), 2);

    let ret = add.callv(&[3i64.to_variant(), 4i64.to_variant()]).expect("call succeeds");
    assert_eq!(ret.to::<i64>(), 7);
}

#[test]
fn callable_converts_parameters_and_return() {
    initialize::<IntegrationTests>();

    let describe = Callable::from_fn("describe", |name: GString, scale: f32, offset: Vector2| {
        format!("{name}: {}", offset * Vector2::splat(scale))
    });

    let ret = describe
        .callv(&[
            GString::from("pos").to_variant(),
            2.0f64.to_variant(),
            Vector2::new(1.0, -3.0).to_variant(),
        ])
        .expect("call succeeds");

    assert_eq!(ret.get_type(), VariantType::String);
    assert_eq!(ret.to::<String>(), "pos: (2, -6)");
}

#[test]
fn callable_without_return_value() {
    initialize::<IntegrationTests>();

    let counter = Arc::new(AtomicUsize::new(0));
    let captured = counter.clone();
    let bump = Callable::from_fn("bump", move |by: u32| {
        captured.fetch_add(by as usize, Ordering::SeqCst);
    });

    let ret = bump.callv(&[5i64.to_variant()]).expect("call succeeds");
    assert!(ret.is_nil());
    assert_eq!(counter.load(Ordering::SeqCst), 5);
}

#[test]
fn callable_with_six_parameters() {
    initialize::<IntegrationTests>();

    let sum = Callable::from_fn("sum6", |a: i8, b: i16, c: i32, d: i64, e: u8, f: u16| {
        a as i64 + b as i64 + c as i64 + d + e as i64 + f as i64
    });
    assert_eq!(sum.arg_count(), 6);

    let args: Vec<Variant> = (1..=6i64).map(|i| i.to_variant()).collect();
    assert_eq!(sum.callv(&args).expect("call succeeds").to::<i64>(), 21);
}

#[test]
fn callable_rejects_wrong_arity() {
    initialize::<IntegrationTests>();

    let neg = Callable::from_fn("neg", |x: i64| -x);

    let err = neg.callv(&[]).expect_err("too few arguments");
    assert_eq!(err.reason(), "function has 1 parameter, but received 0 arguments");

    // Failed calls are also reported to the engine.
    let mut result = None;
    let errors = messages_during("424242", || {
        result = Some(neg.callv(&[424242i64.to_variant(), 2i64.to_variant()]));
    });

    let err = result.expect("closure ran").expect_err("too many arguments");
    assert_eq!(err.reason(), "function has 1 parameter, but received 2 arguments");
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(matches!(errors[0], itest::framework::engine::Message::Error(_)));
}

#[test]
fn callable_rejects_wrong_argument_type() {
    initialize::<IntegrationTests>();

    let not = Callable::from_fn("not", |b: bool| !b);
    let err = not.callv(&[GString::from("yes").to_variant()]).expect_err("string is not bool");

    assert_eq!(err.reason(), "parameter #1 -- cannot convert from String to Bool");
}

#[test]
fn callable_reports_panic_as_error() {
    initialize::<IntegrationTests>();

    let boom = Callable::from_fn("boom", |divisor: i64| {
        if divisor == 0 {
            panic!("division by zero requested");
        }
        100 / divisor
    });

    assert_eq!(boom.callv(&[4i64.to_variant()]).expect("no panic").to::<i64>(), 25);

    let err = boom.callv(&[0i64.to_variant()]).expect_err("panic is an error");
    assert!(err.to_string().contains("division by zero requested"), "{err}");

    // The callable stays usable.
    assert_eq!(boom.callv(&[5i64.to_variant()]).expect("no panic").to::<i64>(), 20);
}

#[test]
fn callable_takes_callable_argument() {
    initialize::<IntegrationTests>();

    let double = Callable::from_fn("double", |x: i64| x * 2);
    let apply = Callable::from_fn("apply", |f: Callable, x: i64| {
        f.callv(&[x.to_variant()]).map(|ret| ret.to::<i64>()).unwrap_or(-1)
    });

    let ret = apply.callv(&[double.to_variant(), 21i64.to_variant()]).expect("call succeeds");
    assert_eq!(ret.to::<i64>(), 42);
}

#[test]
fn callable_equality_and_hash() {
    initialize::<IntegrationTests>();

    let a = Callable::from_fn("same", |x: i64| x);
    let b = Callable::from_fn("same", |x: i64| x);
    let a2 = a.clone();

    assert_eq!(a, a2);
    assert_eq!(a.hash(), a2.hash());
    assert_ne!(a, b);

    // Equality survives a round trip through a variant.
    assert_eq!(a.to_variant().to::<Callable>(), a);
    assert_eq!(a.to_variant(), a2.to_variant());
}

#[test]
fn callable_equals_itself() {
    initialize::<IntegrationTests>();

    let c = Callable::from_fn("id", |a: i64| a);
    let alias = &c;

    assert!(c == *alias);
    assert_eq!(c, c.clone());
    assert_eq!(c.clone(), c);
    assert_eq!(Callable::invalid(), Callable::invalid());
}

#[test]
fn callable_comparisons_in_opposite_order() {
    initialize::<IntegrationTests>();

    let a = Callable::from_fn("left", |x: i64| x);
    let b = Callable::from_fn("right", |x: i64| x);

    std::thread::scope(|s| {
        s.spawn(|| assert!((0..200).all(|_| a != b)));
        s.spawn(|| assert!((0..200).all(|_| b != a)));
    });

    assert_ne!(a, b);
}

#[test]
fn callable_stringifies_as_delegate_name() {
    initialize::<IntegrationTests>();

    let named = Callable::from_fn("on_timeout", || 1i64);
    assert_eq!(named.to_variant().to_string(), "on_timeout");
    assert_eq!(format!("{named:?}"), "Callable(on_timeout)");
}

#[test]
fn callable_gives_back_its_delegate() {
    initialize::<IntegrationTests>();

    let delegate = Delegate::from_fn("square", |x: f64| x * x);
    let callable = Callable::from_delegate(delegate.clone());

    let back = callable.as_delegate().expect("created from a delegate");
    assert_eq!(back, delegate);
    assert_eq!(back.name(), "square");
    assert_eq!(back.arg_count(), 1);

    let ret = back.invoke(&[3.0f64.to_variant()]).expect("invoke succeeds");
    assert_eq!(ret.to::<f64>(), 9.0);

    assert!(Callable::invalid().as_delegate().is_none());
}

#[test]
fn callable_releases_closure_on_drop() {
    initialize::<IntegrationTests>();

    let marker = Arc::new(());
    let captured = marker.clone();
    let callable = Callable::from_fn("holder", move || Arc::strong_count(&captured) as i64);

    let copy = callable.clone();
    let variant = callable.to_variant();
    assert_eq!(Arc::strong_count(&marker), 2);

    drop(callable);
    drop(copy);
    assert_eq!(Arc::strong_count(&marker), 2, "variant still holds the callable");

    drop(variant);
    assert_eq!(Arc::strong_count(&marker), 1);
}

#[test]
fn callable_dispose_releases_closure() {
    initialize::<IntegrationTests>();

    let marker = Arc::new(());
    let captured = marker.clone();
    let callable = Callable::from_fn("disposed", move || Arc::strong_count(&captured) as i64);

    callable.dispose();
    assert!(callable.is_disposed());
    assert_eq!(Arc::strong_count(&marker), 1);

    callable.dispose();
    drop(callable);
}

#[test]
fn invalid_callable() {
    initialize::<IntegrationTests>();

    let invalid = Callable::invalid();
    assert!(!invalid.is_valid());

    let err = invalid.callv(&[]).expect_err("invalid callable cannot be called");
    assert_eq!(err.reason(), "instance is null");
}

#[test]
fn delegate_identity() {
    initialize::<IntegrationTests>();

    let a = Delegate::from_fn("id", |x: i64| x);
    let b = Delegate::from_fn("id", |x: i64| x);

    assert_eq!(a, a.clone());
    assert_ne!(a, b);
    assert_eq!(a.to_string(), "id");

    let mut set = std::collections::HashSet::new();
    set.insert(a.clone());
    set.insert(a.clone());
    set.insert(b);
    assert_eq!(set.len(), 2);
}
