//! Statements.

use crate::{DestructOperation, ExprId, StmtId, VarId};

#[derive(Clone, PartialEq, Debug)]
pub enum Stmt {
    While {
        condition: ExprId,
        body: ExprId,
    },
    For {
        init: Option<StmtId>,
        condition: Option<ExprId>,
        iteration: Option<ExprId>,
        body: ExprId,
    },
    /// Desugared range-based loop:
    ///
    /// ```text
    /// range_var = <range>; iter_var = begin(range); end_var = end(range);
    /// while (condition) { iter_deref_var = *iter_var; body; iteration; }
    /// ```
    Foreach {
        range_var: VarId,
        iter_var: VarId,
        end_var: VarId,
        condition: ExprId,
        iteration: ExprId,
        iter_deref_var: VarId,
        body: ExprId,
    },
    Return {
        expr: Option<ExprId>,
    },
    /// Registers a cleanup that runs when the enclosing scope exits.
    Defer(DestructOperation),
    NoOp,
    /// Already checked by the semantic pass; emits nothing.
    StaticAssert,
    Expression(ExprId),
    VarDecl(VarId),
}
