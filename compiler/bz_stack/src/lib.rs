//! Stack growth for deeply nested IR.
//!
//! Expression lowering in the C backend is recursive descent over the typed
//! IR. Source programs with long operator chains or nested blocks produce IR
//! trees whose depth is only bounded by the input, so every recursive entry
//! point runs inside [`ensure_sufficient_stack`].
//!
//! On native targets the `stacker` crate allocates a new stack segment when
//! the remaining space drops below [`RED_ZONE`]. On `wasm32` the closure is
//! called directly.

/// Remaining stack below which a new segment is allocated (128KB).
///
/// Lowering a single node can format several strings before recursing,
/// so this is kept a little above the usual 100KB.
pub const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
pub const STACK_SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if less than [`RED_ZONE`] remains.
///
/// ```text
/// fn lower_expr(&mut self, expr: ExprId) -> ExprValue {
///     ensure_sufficient_stack(|| self.lower_expr_inner(expr))
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_SEGMENT_SIZE, f)
}

/// `wasm32` manages its own stack; call through.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
