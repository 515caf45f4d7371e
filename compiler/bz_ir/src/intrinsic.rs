//! The closed set of compiler-provided functions.
//!
//! Intrinsic functions have no body; each backend maps every variant to a
//! target construct. Operand widths (`f32` vs `f64`, 8 to 64 bit integers)
//! come from the argument types rather than from separate variants.

use crate::{BinaryOp, UnaryOp};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Intrinsic {
    /// A builtin operator called through its function name.
    UnaryOperator(UnaryOp),
    BinaryOperator(BinaryOp),

    // ── Containers ──────────────────────────────────────────────────
    StrBeginPtr,
    StrEndPtr,
    StrSize,
    StrFromPtrs,
    SliceBeginPtr,
    SliceEndPtr,
    SliceSize,
    SliceFromPtrs,
    ArrayBeginPtr,
    ArrayEndPtr,

    // ── Memory and pointers ─────────────────────────────────────────
    Memcpy,
    Memmove,
    Memset,
    PointerCast,
    IntToPointer,
    PointerToInt,

    // ── Optionals ───────────────────────────────────────────────────
    /// Reference to the payload; panics when empty.
    OptionalGetValue,
    IsOptionSet,

    // ── Integer ranges ──────────────────────────────────────────────
    /// Builds a range struct from its bound arguments, in member order.
    RangeMake,
    RangeBegin,
    RangeEnd,
    /// `end - begin` of a two-sided range.
    RangeSize,

    // ── Control ─────────────────────────────────────────────────────
    Panic,
    IsComptime,
    /// Trivial swap of two lvalues of the same type.
    TrivialSwap,

    // ── Bit manipulation ────────────────────────────────────────────
    Clz,
    Ctz,
    Popcount,
    Byteswap,
    Bitreverse,
    /// Funnel shift left.
    Fshl,
    /// Funnel shift right.
    Fshr,

    Math(MathFn),
    Comptime(ComptimeIntrinsic),
}

/// `<math.h>` functions and the integer/float `abs`/`min`/`max`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MathFn {
    Abs,
    Min,
    Max,
    Exp,
    Exp2,
    Expm1,
    Log,
    Log10,
    Log2,
    Log1p,
    Sqrt,
    Pow,
    Cbrt,
    Hypot,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Erf,
    Erfc,
    Tgamma,
    Lgamma,
    Isnan,
    Isinf,
    Isfinite,
}

impl MathFn {
    /// The `double` spelling in `<math.h>`; the `float` one adds an `f`.
    /// Classification functions are macros and have no suffixed form.
    pub const fn c_name(self) -> &'static str {
        match self {
            MathFn::Abs => "fabs",
            MathFn::Min => "fmin",
            MathFn::Max => "fmax",
            MathFn::Exp => "exp",
            MathFn::Exp2 => "exp2",
            MathFn::Expm1 => "expm1",
            MathFn::Log => "log",
            MathFn::Log10 => "log10",
            MathFn::Log2 => "log2",
            MathFn::Log1p => "log1p",
            MathFn::Sqrt => "sqrt",
            MathFn::Pow => "pow",
            MathFn::Cbrt => "cbrt",
            MathFn::Hypot => "hypot",
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Tan => "tan",
            MathFn::Asin => "asin",
            MathFn::Acos => "acos",
            MathFn::Atan => "atan",
            MathFn::Atan2 => "atan2",
            MathFn::Sinh => "sinh",
            MathFn::Cosh => "cosh",
            MathFn::Tanh => "tanh",
            MathFn::Asinh => "asinh",
            MathFn::Acosh => "acosh",
            MathFn::Atanh => "atanh",
            MathFn::Erf => "erf",
            MathFn::Erfc => "erfc",
            MathFn::Tgamma => "tgamma",
            MathFn::Lgamma => "lgamma",
            MathFn::Isnan => "isnan",
            MathFn::Isinf => "isinf",
            MathFn::Isfinite => "isfinite",
        }
    }

    pub const fn is_classification(self) -> bool {
        matches!(self, MathFn::Isnan | MathFn::Isinf | MathFn::Isfinite)
    }
}

/// Intrinsics that only exist during constant evaluation. They are folded
/// away before code generation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ComptimeIntrinsic {
    CompileError,
    CompileWarning,
    Malloc,
    Free,
    Print,
    CreateGlobalString,
    TypeName,
    IsDefaultConstructible,
    IsCopyConstructible,
    IsTriviallyCopyConstructible,
    IsMoveConstructible,
    IsTriviallyMoveConstructible,
    IsTriviallyDestructible,
    IsTriviallyRelocatable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_names() {
        assert_eq!(MathFn::Abs.c_name(), "fabs");
        assert_eq!(MathFn::Tgamma.c_name(), "tgamma");
        assert!(MathFn::Isinf.is_classification());
        assert!(!MathFn::Atan2.is_classification());
    }
}
