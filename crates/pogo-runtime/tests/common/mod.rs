//! Shared test utilities
//!
//! Common helpers for pogo-runtime integration tests: value shorthands,
//! iterative reference implementations, and shared definitions.

#![allow(dead_code)]

use pogo_runtime::{FeatureSet, TailFn, Value};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Chain length far beyond what a conservative fixed native stack survives.
pub const DEEP: f64 = 100_000.0;

/// Modulus keeping modular products exactly representable in an f64.
pub const MODULUS: f64 = 1_000_000.0;

pub fn num(n: f64) -> Value {
    Value::Number(n)
}

pub fn nums(values: &[f64]) -> Value {
    Value::array(values.iter().copied().map(Value::Number).collect())
}

/// Unwrap a resolution and narrow it to a number.
pub fn expect_number(result: Result<Value, pogo_runtime::RuntimeError>) -> f64 {
    match result {
        Ok(Value::Number(n)) => n,
        other => panic!("expected Number, got {:?}", other),
    }
}

/// Iterative factorial (exact for n <= 18 in an f64).
pub fn factorial_ref(n: f64) -> f64 {
    let mut result = 1.0;
    let mut coefficient = 2.0;
    while coefficient <= n {
        result *= coefficient;
        coefficient += 1.0;
    }
    result
}

/// Iterative factorial with per-step modulus.
pub fn factorial_mod_ref(n: f64, modulus: f64) -> f64 {
    let mut result = 1.0;
    let mut coefficient = 2.0;
    while coefficient <= n {
        result = (result * coefficient) % modulus;
        coefficient += 1.0;
    }
    result
}

/// Iterative Fibonacci (exact for n <= 78 in an f64).
pub fn fibonacci_ref(n: f64) -> f64 {
    let mut current = 0.0;
    let mut next = 1.0;
    let mut i = 0.0;
    while i < n {
        let last = current;
        current = next;
        next = last + current;
        i += 1.0;
    }
    current
}

/// Iterative Fibonacci with per-step modulus.
pub fn fibonacci_mod_ref(n: f64, modulus: f64) -> f64 {
    let mut current = 0.0;
    let mut next = 1.0;
    let mut i = 0.0;
    while i < n {
        let last = current;
        current = next;
        next = (last + current) % modulus;
        i += 1.0;
    }
    current
}

/// Sum of 1..=n.
pub fn sum_ref(n: f64) -> f64 {
    n * (n + 1.0) / 2.0
}

/// Accumulator-style factorial: every recursive step is a tail-position
/// deferral with concrete arguments, so it works under every feature set.
pub fn factorial_acc(feature_set: FeatureSet) -> TailFn {
    TailFn::recursive_with_feature_set("factorial", feature_set, |this, args| {
        let n = args.number(0)?;
        let acc = args.number_or(1, 1.0)?;
        if n <= 1.0 {
            Ok(Value::Number(acc))
        } else {
            Ok(this
                .defer([Value::Number(n - 1.0), Value::Number(n * acc)])
                .into())
        }
    })
}

/// Accumulator-style factorial reducing every product by `MODULUS`, for
/// chains deep enough that the plain product would overflow.
pub fn factorial_acc_mod(feature_set: FeatureSet) -> TailFn {
    TailFn::recursive_with_feature_set("factorial_mod", feature_set, |this, args| {
        let n = args.number(0)?;
        let acc = args.number_or(1, 1.0)?;
        if n <= 1.0 {
            Ok(Value::Number(acc))
        } else {
            Ok(this
                .defer([Value::Number(n - 1.0), Value::Number((n * acc) % MODULUS)])
                .into())
        }
    })
}

/// Accumulator-style Fibonacci with per-step modulus.
pub fn fibonacci_acc_mod(feature_set: FeatureSet) -> TailFn {
    TailFn::recursive_with_feature_set("fibonacci_mod", feature_set, |this, args| {
        let n = args.number(0)?;
        let a = args.number_or(1, 0.0)?;
        let b = args.number_or(2, 1.0)?;
        if n == 0.0 {
            Ok(Value::Number(a))
        } else {
            Ok(this
                .defer([Value::Number(n - 1.0), Value::Number(b), Value::Number((a + b) % MODULUS)])
                .into())
        }
    })
}
