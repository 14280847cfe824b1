//! Concurrency tests
//!
//! Each top-level resolution owns an independent resolution stack, so the
//! same definition may be resolved concurrently with distinct inputs and no
//! cross-talk.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use pogo_runtime::FeatureSet;
use rstest::rstest;
use std::thread;

#[rstest]
#[case(FeatureSet::Base)]
#[case(FeatureSet::Full)]
fn concurrent_resolutions_do_not_interfere(#[case] feature_set: FeatureSet) {
    let factorial = factorial_acc_mod(feature_set);
    let inputs: Vec<f64> = vec![6.0, 100.0, 2_000.0, DEEP];

    let handles: Vec<_> = inputs
        .iter()
        .map(|&n| {
            let factorial = factorial.clone();
            thread::spawn(move || expect_number(factorial.call([num(n)])))
        })
        .collect();

    for (handle, &n) in handles.into_iter().zip(&inputs) {
        let result = handle.join().expect("worker thread panicked");
        assert_eq!(result, factorial_mod_ref(n, MODULUS), "factorial({})", n);
    }
}

#[test]
fn concurrent_nested_resolutions_do_not_interfere() {
    let sum = pogo_runtime::TailFn::recursive("sum", |this, args| {
        let n = args.number(0)?;
        if n <= 0.0 {
            Ok(pogo_runtime::Value::Number(0.0))
        } else {
            pogo_runtime::Value::Number(n).add(&this.defer([pogo_runtime::Value::Number(n - 1.0)]).into())
        }
    });

    let handles: Vec<_> = (1..=8)
        .map(|i| {
            let sum = sum.clone();
            let n = (i * 500) as f64;
            thread::spawn(move || (n, expect_number(sum.call([num(n)]))))
        })
        .collect();

    for handle in handles {
        let (n, result) = handle.join().expect("worker thread panicked");
        assert_eq!(result, sum_ref(n), "sum({})", n);
    }
}
