//! Basic trampoline
//!
//! Follows return-value deferral only: invoke, and while the result is
//! another deferred call, invoke that. Arguments are handed to the
//! operation as recorded — a deferred call sitting in an argument slot is
//! passed through unresolved, and whatever the operation does with it is
//! its own business (unsupported usage of this mode, kept cheap on
//! purpose).

use crate::call::DeferredCall;
use crate::value::{RuntimeError, Value};
use tracing::trace;

pub(super) fn resolve(initial: DeferredCall) -> Result<Value, RuntimeError> {
    let mut steps: u64 = 1;
    let mut value = initial.invoke()?;
    while let Value::Deferred(next) = value {
        steps += 1;
        value = next.invoke()?;
    }
    trace!(steps, "trampoline drained");
    Ok(value)
}
