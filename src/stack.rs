//! Stack growth for the recursive parser and evaluator.
//!
//! Nesting depth in the source maps directly to recursion depth, so the
//! recursive entry points wrap themselves in [`ensure_sufficient_stack`].

/// If less than this remains, grow the stack.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
