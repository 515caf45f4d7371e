//! Lowered values and the C precedence model.
//!
//! Every lowered expression is an [`ExprValue`]: a handle to a slot holding
//! C expression text (a local's name or a pure inline expression), tagged
//! with the precedence of that text so that composing it into a larger
//! expression adds exactly the parentheses C needs.

use bitflags::bitflags;

use crate::types::Type;

/// C operator precedence, tightest first.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(u8)]
pub enum Precedence {
    /// Identifiers, literals and parenthesized expressions.
    Literal,
    /// `a[i]`, `a.b`, `a->b`, `f(x)`, `(T){...}`
    Suffix,
    /// Unary operators and casts.
    Prefix,
    Multiply,
    Addition,
    Bitshift,
    Relational,
    Equality,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
    /// Assignment and the conditional operator; right-associative.
    Assignment,
    Comma,
}

impl Precedence {
    /// Whether an operand of precedence `self` needs parentheses as the
    /// operand of a prefix operator.
    #[inline]
    pub fn needs_parens_as_unary_operand(self) -> bool {
        self > Precedence::Prefix
    }

    /// Parentheses needed around `(lhs, rhs)` operands of binary `op`.
    ///
    /// # Panics
    /// Panics if `op` is not a binary operator precedence.
    pub fn needs_parens_as_binary_operands(lhs: Precedence, rhs: Precedence, op: Precedence) -> (bool, bool) {
        match op {
            Precedence::Literal | Precedence::Suffix | Precedence::Prefix => {
                unreachable!("{op:?} is not a binary operator precedence")
            }
            Precedence::Assignment => (lhs >= op, rhs > op),
            _ => (lhs > op, rhs >= op),
        }
    }

    /// Whether an initializer of precedence `self` needs parentheses in
    /// `T x = <init>;` or as an element of a brace list (where the comma is
    /// a separator).
    #[inline]
    pub fn needs_parens_as_initializer(self) -> bool {
        self > Precedence::Assignment
    }
}

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ValueFlags: u8 {
        /// The slot holds a pointer; the value is `*slot`.
        const NEEDS_DEREFERENCE = 1 << 0;
        /// Read-only storage.
        const CONST = 1 << 1;
        /// The slot text is an inline expression, not a local.
        const TEMPORARY = 1 << 2;
        /// The slot names a local declared by the backend.
        const VARIABLE = 1 << 3;
        /// The text denotes a value with no address.
        const RVALUE = 1 << 4;
    }
}

/// A lowered value of C type `ty`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExprValue {
    pub(crate) slot: u32,
    pub flags: ValueFlags,
    /// Precedence of the slot text.
    pub prec: Precedence,
    pub ty: Type,
}

impl ExprValue {
    const NONE_SLOT: u32 = u32::MAX;

    /// The result of an expression that produces nothing.
    pub const fn none() -> Self {
        ExprValue {
            slot: Self::NONE_SLOT,
            flags: ValueFlags::empty(),
            prec: Precedence::Literal,
            ty: Type::void(),
        }
    }

    #[inline]
    pub const fn is_none(&self) -> bool {
        self.slot == Self::NONE_SLOT
    }

    #[inline]
    pub fn needs_dereference(&self) -> bool {
        self.flags.contains(ValueFlags::NEEDS_DEREFERENCE)
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.flags.contains(ValueFlags::CONST)
    }

    #[inline]
    pub fn is_temporary(&self) -> bool {
        self.flags.contains(ValueFlags::TEMPORARY)
    }

    #[inline]
    pub fn is_variable(&self) -> bool {
        self.flags.contains(ValueFlags::VARIABLE)
    }

    #[inline]
    pub fn is_rvalue(&self) -> bool {
        self.flags.contains(ValueFlags::RVALUE)
    }

    /// Precedence of the value's rendered text. A dereferenced slot renders
    /// as `*slot`, a prefix expression.
    #[inline]
    pub fn effective_precedence(&self) -> Precedence {
        if self.needs_dereference() {
            Precedence::Prefix
        } else {
            self.prec
        }
    }
}
