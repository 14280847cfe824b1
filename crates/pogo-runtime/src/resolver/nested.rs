//! Nested-resolution stack machine
//!
//! Resolves deferred calls embedded anywhere in an argument tree,
//! depth-first and left-to-right over the combined argument view
//! (positional order, then named insertion order), before the enclosing
//! operation runs. The machine is an explicit frame stack — host recursion
//! is never used, so stack depth in the host is O(1) regardless of chain
//! length or nesting depth.

use crate::call::DeferredCall;
use crate::value::{RuntimeError, Value};
use tracing::trace;

/// One call awaiting resolution, and which of its argument slots (if any)
/// is currently being resolved by the frames above it.
struct Frame {
    call: DeferredCall,
    resolving: Option<usize>,
}

impl Frame {
    fn new(call: DeferredCall) -> Self {
        Frame {
            call,
            resolving: None,
        }
    }

    /// Scan for the next deferred argument, starting just past the slot
    /// that last resolved. Resolved slots are never re-scanned, so each
    /// slot is visited at most twice over the frame's lifetime.
    fn next_deferred_index(&self) -> Option<usize> {
        let start = self.resolving.map_or(0, |i| i + 1);
        (start..self.call.args().len())
            .find(|&i| matches!(self.call.args().get(i), Some(Value::Deferred(_))))
    }

    /// Move the deferred call out of the given slot. The slot is left
    /// holding Null and is overwritten when the sub-resolution completes.
    fn take_deferred(&mut self, index: usize) -> DeferredCall {
        match self.call.args_mut().take(index) {
            Some(Value::Deferred(call)) => *call,
            _ => unreachable!("slot {} was scanned as deferred", index),
        }
    }
}

/// The resolution stack. Non-empty throughout a resolution; empties exactly
/// once, when the final concrete value is produced.
struct ResolutionStack {
    frames: Vec<Frame>,
}

impl ResolutionStack {
    fn new(initial: DeferredCall) -> Self {
        ResolutionStack {
            frames: vec![Frame::new(initial)],
        }
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("resolution stack is non-empty until completion")
    }

    fn push(&mut self, call: DeferredCall) {
        self.frames.push(Frame::new(call));
    }

    fn pop(&mut self) -> Frame {
        self.frames
            .pop()
            .expect("resolution stack is non-empty until completion")
    }

    /// Splice a resolved sub-result into the top frame's currently
    /// resolving slot. The resolving index itself is left unchanged so the
    /// next scan starts right after it.
    fn splice(&mut self, resolution: Value) {
        let top = self.top_mut();
        let index = top
            .resolving
            .expect("splice target frame has a resolving slot");
        top.call.args_mut().set(index, resolution);
    }
}

pub(super) fn resolve(initial: DeferredCall) -> Result<Value, RuntimeError> {
    let mut stack = ResolutionStack::new(initial);
    let mut max_depth: usize = 1;
    loop {
        // Deepest-first: descend into the first unresolved deferred
        // argument of the innermost call.
        if let Some(index) = stack.top_mut().next_deferred_index() {
            let top = stack.top_mut();
            top.resolving = Some(index);
            let child = top.take_deferred(index);
            stack.push(child);
            max_depth = max_depth.max(stack.len());
            continue;
        }

        // All arguments concrete: consume the frame and run the operation.
        let frame = stack.pop();
        let resolution = frame.call.invoke()?;
        match resolution {
            // Tail chaining, even mid-nesting: the replacement call takes
            // the popped frame's place.
            Value::Deferred(next) => stack.push(*next),
            value => {
                if stack.len() > 0 {
                    stack.splice(value);
                } else {
                    trace!(max_depth, "nested resolution complete");
                    return Ok(value);
                }
            }
        }
    }
}
