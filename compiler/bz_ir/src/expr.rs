//! Expressions.
//!
//! # Value references
//!
//! The semantic pass decomposes every construct, copy, move, destruct, swap
//! and assign of a compound value into an element-wise plan. The element
//! expressions in that plan cannot name the element they operate on (it has
//! no source-level name), so they refer to it through
//! [`ExprKind::ValueReference`]. The backend binds the element before
//! lowering the plan expression. Index 0 is the most recently bound value.
//!
//! Plans that bind two values (swap, assign) bind the left-hand side first,
//! so inside the plan `ValueReference { index: 1 }` is the lhs element and
//! `ValueReference { index: 0 }` the rhs element.

use crate::{ConstantValue, ExprId, FuncId, StmtId, Typespec, VarId};

/// How the result of an expression may be used.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueCategory {
    /// Denotes existing storage.
    Lvalue,
    /// A fresh temporary.
    Rvalue,
    /// Control never reaches the end of the expression.
    Noreturn,
    /// Produces no value (statement-like expressions of type `void`).
    None,
}

/// Cleanup attached to a variable, a temporary or a `defer` statement.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct DestructOperation {
    pub kind: DestructKind,
    /// A variable whose move-destruct indicator is cleared once this
    /// operation runs, because the expression moved out of it.
    pub move_destructed_var: Option<VarId>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum DestructKind {
    #[default]
    None,
    /// Destroys a named variable; `call` refers to the variable directly.
    Variable { call: ExprId },
    /// Destroys a temporary; `call` refers to it as value reference 0.
    SelfValue { call: ExprId },
    /// A temporary with no teardown.
    TrivialSelf,
    /// Runs the expression of a `defer` statement.
    Defer(ExprId),
    /// Destroys the remaining elements of an rvalue array after one element
    /// was moved out. `elem_call` refers to the element as value reference 0.
    RvalueArray { elem_call: ExprId },
}

impl DestructOperation {
    pub fn new(kind: DestructKind) -> Self {
        DestructOperation { kind, move_destructed_var: None }
    }

    /// No teardown, but clears `var`'s move-destruct indicator.
    pub fn moved_from(var: VarId) -> Self {
        DestructOperation {
            kind: DestructKind::None,
            move_destructed_var: Some(var),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.kind, DestructKind::None)
    }
}

/// Order in which call arguments are evaluated.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ResolveOrder {
    #[default]
    Regular,
    Reversed,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Plus,
    Minus,
    Dereference,
    BitNot,
    BoolNot,
    /// Prefix `++`; yields the operand.
    PlusPlus,
    /// Prefix `--`; yields the operand.
    MinusMinus,
    AddressOf,
    Move,
    UnsafeMove,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    Div,
    DivAssign,
    Rem,
    RemAssign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitAndAssign,
    BitXor,
    BitXorAssign,
    BitOr,
    BitOrAssign,
    Shl,
    ShlAssign,
    Shr,
    ShrAssign,
    BoolAnd,
    BoolXor,
    BoolOr,
    Comma,
}

impl BinaryOp {
    /// Compound assignments modify and yield their left operand.
    pub const fn is_compound_assign(self) -> bool {
        matches!(
            self,
            BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::RemAssign
                | BinaryOp::BitAndAssign
                | BinaryOp::BitXorAssign
                | BinaryOp::BitOrAssign
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
        )
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct SwitchCase {
    pub values: Vec<ConstantValue>,
    pub expr: ExprId,
}

#[derive(Clone, PartialEq, Debug)]
pub enum ExprKind {
    // ── Leaves ──────────────────────────────────────────────────────
    VariableRef(VarId),
    FunctionRef(FuncId),
    Constant(ConstantValue),
    /// See the module documentation.
    ValueReference { index: usize },

    // ── Builtin operators ───────────────────────────────────────────
    Unary { op: UnaryOp, operand: ExprId },
    Binary { op: BinaryOp, lhs: ExprId, rhs: ExprId },

    // ── Calls ───────────────────────────────────────────────────────
    Call { func: FuncId, args: Vec<ExprId>, order: ResolveOrder },
    /// Call through a value of function type.
    IndirectCall { callee: ExprId, args: Vec<ExprId> },

    // ── Conversions ─────────────────────────────────────────────────
    /// Numeric, pointer or array-to-slice conversion to the expression type.
    Cast { expr: ExprId },
    /// Reinterpret the bytes of `expr` as the expression type.
    BitCast { expr: ExprId },
    /// Wrap `expr` into an optional of the expression type.
    OptionalCast { expr: ExprId },
    TakeReference { expr: ExprId },
    /// Materialize an rvalue so it can bind to a `move` reference.
    TakeMoveReference { expr: ExprId },

    // ── Construction ────────────────────────────────────────────────
    /// Builtin tuple literal.
    Tuple { elems: Vec<ExprId> },
    /// Member-wise initialization; each expression initializes one member.
    AggregateInit { exprs: Vec<ExprId> },
    /// Every element is constructed by `copy_expr` from `value`
    /// (value reference 0).
    ArrayValueInit { value: ExprId, copy_expr: ExprId },
    AggregateDefaultConstruct { default_construct_exprs: Vec<ExprId> },
    ArrayDefaultConstruct { default_construct_expr: ExprId },
    OptionalDefaultConstruct,
    /// Zero-initialization of slices and other builtin compound values.
    BuiltinDefaultConstruct,
    AggregateCopyConstruct { copied_value: ExprId, copy_exprs: Vec<ExprId> },
    AggregateMoveConstruct { moved_value: ExprId, move_exprs: Vec<ExprId> },
    ArrayCopyConstruct { copied_value: ExprId, copy_expr: ExprId },
    ArrayMoveConstruct { moved_value: ExprId, move_expr: ExprId },
    OptionalCopyConstruct { copied_value: ExprId, value_copy_expr: ExprId },
    OptionalMoveConstruct { moved_value: ExprId, value_move_expr: ExprId },
    TrivialCopyConstruct { copied_value: ExprId },
    TrivialRelocate { value: ExprId },

    // ── Destruction ─────────────────────────────────────────────────
    /// `elem_destruct_calls[i]` is `None` for trivially destructible members.
    AggregateDestruct { value: ExprId, elem_destruct_calls: Vec<Option<ExprId>> },
    ArrayDestruct { value: ExprId, elem_destruct_call: ExprId },
    OptionalDestruct { value: ExprId, value_destruct_call: ExprId },
    /// User destructor followed by member destructors.
    BaseTypeDestruct {
        value: ExprId,
        destruct_call: Option<ExprId>,
        member_destruct_calls: Vec<Option<ExprId>>,
    },
    DestructValue { value: ExprId, destruct_call: Option<ExprId> },

    // ── Swap ────────────────────────────────────────────────────────
    AggregateSwap { lhs: ExprId, rhs: ExprId, swap_exprs: Vec<ExprId> },
    ArraySwap { lhs: ExprId, rhs: ExprId, swap_expr: ExprId },
    OptionalSwap {
        lhs: ExprId,
        rhs: ExprId,
        value_swap_expr: ExprId,
        lhs_move_expr: ExprId,
        rhs_move_expr: ExprId,
    },
    /// `temp = move lhs; lhs = move rhs; rhs = move temp`.
    BaseTypeSwap {
        lhs: ExprId,
        rhs: ExprId,
        lhs_move_expr: ExprId,
        rhs_move_expr: ExprId,
        temp_move_expr: ExprId,
    },
    TrivialSwap { lhs: ExprId, rhs: ExprId },

    // ── Assign ──────────────────────────────────────────────────────
    AggregateAssign { lhs: ExprId, rhs: ExprId, assign_exprs: Vec<ExprId> },
    ArrayAssign { lhs: ExprId, rhs: ExprId, assign_expr: ExprId },
    OptionalAssign {
        lhs: ExprId,
        rhs: ExprId,
        value_assign_expr: ExprId,
        value_construct_expr: ExprId,
        value_destruct_expr: ExprId,
    },
    OptionalNullAssign { lhs: ExprId, rhs: ExprId, value_destruct_expr: Option<ExprId> },
    OptionalValueAssign {
        lhs: ExprId,
        rhs: ExprId,
        value_assign_expr: ExprId,
        value_construct_expr: ExprId,
    },
    /// Rebinds a `?&T` to the address of `rhs`.
    OptionalReferenceValueAssign { lhs: ExprId, rhs: ExprId },
    BaseTypeAssign { lhs: ExprId, rhs: ExprId, lhs_destruct_expr: ExprId, rhs_copy_expr: ExprId },
    TrivialAssign { lhs: ExprId, rhs: ExprId },

    // ── Access ──────────────────────────────────────────────────────
    MemberAccess { base: ExprId, index: usize },
    /// Moves member `index` out of an rvalue aggregate. `member_refs[i]`
    /// either destroys member `i` or (for `index`) moves it into the result;
    /// `None` entries need no code.
    RvalueMemberAccess { base: ExprId, index: usize, member_refs: Vec<Option<ExprId>> },
    OptionalExtractValue { optional_value: ExprId, value_move_expr: Option<ExprId> },
    /// Array, slice, or tuple (constant index) subscript of an lvalue.
    Subscript { base: ExprId, index: ExprId },
    /// Element access into an rvalue array; the other elements are
    /// destroyed by `elem_destruct_op` at the end of the full expression.
    RvalueArraySubscript { base: ExprId, index: ExprId, elem_destruct_op: DestructOperation },
    /// Subscript of a tuple literal: every element is evaluated, only the
    /// selected one becomes the result.
    TupleSubscript { elems: Vec<ExprId>, index: u64 },
    /// Like [`ExprKind::RvalueMemberAccess`] for rvalue tuples.
    RvalueTupleSubscript { base: ExprId, index: u64, elem_refs: Vec<Option<ExprId>> },

    // ── Control flow ────────────────────────────────────────────────
    Compound { stmts: Vec<StmtId>, final_expr: Option<ExprId> },
    If { condition: ExprId, then_block: ExprId, else_block: Option<ExprId> },
    IfConsteval { condition: bool, then_block: ExprId, else_block: Option<ExprId> },
    Switch {
        matched: ExprId,
        cases: Vec<SwitchCase>,
        default_case: Option<ExprId>,
        /// Every possible value is covered by `cases`.
        is_complete: bool,
    },
    Break,
    Continue,
    Unreachable,
}

/// A typed expression node.
///
/// `ty` is the type of the denoted object. Reference-ness is carried by
/// `category`: an expression yielding `&T` has type `T` and category
/// [`ValueCategory::Lvalue`].
#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Typespec,
    pub category: ValueCategory,
    /// Cleanup of the temporary this expression produces.
    pub destruct_op: DestructOperation,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Typespec, category: ValueCategory) -> Self {
        Expr {
            kind,
            ty,
            category,
            destruct_op: DestructOperation::default(),
        }
    }

    #[must_use]
    pub fn with_destruct_op(mut self, destruct_op: DestructOperation) -> Self {
        self.destruct_op = destruct_op;
        self
    }

    #[inline]
    pub fn is_rvalue(&self) -> bool {
        self.category == ValueCategory::Rvalue
    }
}
