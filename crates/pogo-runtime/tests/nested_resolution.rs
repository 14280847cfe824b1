//! Nested-resolution stack machine tests
//!
//! Deferred calls buried in argument trees must be resolved depth-first,
//! left-to-right, before the enclosing operation runs — and the basic
//! resolver must demonstrably not do that work.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use pogo_runtime::{Args, FeatureSet, RuntimeError, TailFn, Value};
use std::sync::{Arc, Mutex};

fn mul(feature_set: FeatureSet) -> TailFn {
    TailFn::with_feature_set("mul", feature_set, |args| {
        Ok(Value::Number(args.number(0)? * args.number(1)?))
    })
}

/// Multi-function factorial: the recursive call sits in an argument slot of
/// another definition, not in tail position of its own.
fn factorial_via_mul(feature_set: FeatureSet) -> TailFn {
    let mul = mul(FeatureSet::Full);
    TailFn::recursive_with_feature_set("factorial", feature_set, move |this, args| {
        let n = args.number(0)?;
        if n <= 1.0 {
            Ok(Value::Number(1.0))
        } else {
            Ok(mul
                .defer(Args::from_positional(vec![
                    Value::Number(n),
                    this.defer([Value::Number(n - 1.0)]).into(),
                ]))
                .into())
        }
    })
}

#[test]
fn nested_argument_matches_eager_evaluation() {
    // opA.defer(x, opB.defer(y)) must equal eager opA(x, opB(y)).
    let m = mul(FeatureSet::Full);
    let inner = m.defer([num(2.0), num(3.0)]);
    let outer = m.defer(Args::from_positional(vec![num(7.0), inner.into()]));
    assert_eq!(outer.resolve().unwrap(), num(7.0 * (2.0 * 3.0)));
}

#[test]
fn arguments_resolve_depth_first_left_to_right() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let tagged = |tag: &'static str| {
        let order = Arc::clone(&order);
        TailFn::new(tag, move |args| {
            order.lock().unwrap().push(tag);
            Ok(args.get(0).cloned().unwrap_or(Value::Null))
        })
    };
    let a = tagged("a");
    let b = tagged("b");
    let c = tagged("c");
    let d = tagged("d");

    // a(b(x), d=c(d(y))): positional slots first, then named insertion
    // order; depth-first within each slot.
    let call = a.defer(
        Args::from_positional(vec![b.defer([num(1.0)]).into()])
            .with_named("d", c.defer(Args::from_positional(vec![d.defer([num(2.0)]).into()])).into()),
    );
    call.resolve().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["b", "d", "c", "a"]);
}

#[test]
fn multi_function_factorial_succeeds_with_nested_resolution() {
    let factorial = factorial_via_mul(FeatureSet::Full);
    for n in 1..=10 {
        let n = n as f64;
        assert_eq!(expect_number(factorial.call([num(n)])), factorial_ref(n));
    }
}

#[test]
fn multi_function_factorial_diverges_without_nested_resolution() {
    // The same nested-argument shape under the basic resolver must not
    // silently produce the right answer: the multiply sees a deferred call
    // where a number belongs.
    let factorial = factorial_via_mul(FeatureSet::Base);
    let err = factorial.call([num(3.0)]).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::TypeError {
            msg: "expected number, got deferred call".to_string()
        }
    );
}

#[test]
fn deep_nested_chain_succeeds() {
    // Every step nests the recursive call inside mul_mod's argument list,
    // so the frame stack (not the host stack) carries the whole depth.
    let mul_mod = TailFn::new("mul_mod", |args| {
        Ok(Value::Number((args.number(0)? * args.number(1)?) % MODULUS))
    });
    let factorial = TailFn::recursive("factorial_mod", move |this, args| {
        let n = args.number(0)?;
        if n <= 1.0 {
            Ok(Value::Number(1.0))
        } else {
            Ok(mul_mod
                .defer(Args::from_positional(vec![
                    Value::Number(n % MODULUS),
                    this.defer([Value::Number(n - 1.0)]).into(),
                ]))
                .into())
        }
    });
    let n = DEEP + 100.0;
    assert_eq!(
        expect_number(factorial.call([num(n)])),
        factorial_mod_ref(n, MODULUS)
    );
}

#[test]
fn resolved_value_is_spliced_into_the_right_slot() {
    let join = TailFn::new("join", |args| {
        let mut out = String::new();
        for value in args.iter() {
            out.push_str(&value.to_string());
        }
        Ok(Value::string(out))
    });
    let shout = TailFn::new("shout", |args| {
        Ok(Value::string(format!("{}!", args.value(0)?)))
    });
    let call = join.defer(Args::from_positional(vec![
        Value::string("a"),
        shout.defer([Value::string("b")]).into(),
        Value::string("c"),
    ]));
    assert_eq!(call.resolve().unwrap(), Value::string("ab!c"));
}

#[test]
fn factory_call_returns_composite_value() {
    // Deferred calls cannot be smuggled inside a data structure, but a
    // deferred factory receives resolved parts and builds the structure.
    let array_factory = TailFn::new("array_factory", |args| {
        Ok(Value::array(args.iter().cloned().collect()))
    });
    let square = TailFn::new("square", |args| {
        let n = args.number(0)?;
        Ok(Value::Number(n * n))
    });
    let call = array_factory.defer(Args::from_positional(vec![
        square.defer([num(3.0)]).into(),
        num(6.0),
    ]));
    assert_eq!(call.resolve().unwrap(), nums(&[9.0, 6.0]));
}
