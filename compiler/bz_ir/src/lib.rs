//! Typed IR for the bz compiler backends.
//!
//! This is the contract between the semantic pass and code generation. By
//! the time a [`Module`] is built, names are resolved, generics are
//! instantiated, overloads are chosen, and every construct, copy, move,
//! destruct, swap and assign of a compound value has been decomposed into an
//! element-wise plan. A backend only transliterates; it does not re-check.
//!
//! # Layout
//!
//! All nodes live in arenas inside [`Module`] and refer to each other by
//! 4-byte ids ([`ExprId`], [`StmtId`], [`VarId`], [`FuncId`],
//! [`TypeInfoId`]). There is no per-node ownership.

mod constant;
mod decl;
mod expr;
mod ids;
mod intrinsic;
mod module;
mod stmt;
mod ty;
mod type_info;

pub use constant::ConstantValue;
pub use decl::{Function, VarDecl};
pub use expr::{
    BinaryOp, DestructKind, DestructOperation, Expr, ExprKind, ResolveOrder, SwitchCase, UnaryOp,
    ValueCategory,
};
pub use ids::{ExprId, FuncId, StmtId, TypeInfoId, VarId};
pub use intrinsic::{ComptimeIntrinsic, Intrinsic, MathFn};
pub use module::Module;
pub use stmt::Stmt;
pub use ty::{BuiltinKind, Typespec};
pub use type_info::{MemberVariable, TypeInfo, TypeInfoKind, TypeTraits};
