//! Stack growth for recursive walks.
//!
//! The type replacer walks type composition depth-first and expanders may
//! recurse through nested exploded fields. Both run under
//! [`ensure_sufficient_stack`], which grows the stack on native targets and
//! is a passthrough on WASM.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone remains.
#[cfg(not(target_arch = "wasm32"))]
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(target_arch = "wasm32")]
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    let _ = (RED_ZONE, STACK_PER_RECURSION);
    f()
}
