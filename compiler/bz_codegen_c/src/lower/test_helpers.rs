//! A small IR builder for lowering tests.

use bz_ir::{
    BinaryOp, BuiltinKind, ConstantValue, Expr, ExprId, ExprKind, FuncId, Function, Intrinsic,
    MemberVariable, Module, Stmt, StmtId, TypeInfo, TypeTraits, Typespec, ValueCategory, VarDecl,
    VarId,
};

use crate::config::CodegenOptions;

pub(super) fn int_type() -> Typespec {
    Typespec::builtin(BuiltinKind::I32)
}

pub(super) fn bool_type() -> Typespec {
    Typespec::builtin(BuiltinKind::Bool)
}

/// Category of a call result of type `ret`.
fn result_category(ret: &Typespec) -> ValueCategory {
    if ret.is_void() {
        ValueCategory::None
    } else if ret.is_any_reference() {
        ValueCategory::Lvalue
    } else {
        ValueCategory::Rvalue
    }
}

#[derive(Default)]
pub(super) struct ModuleBuilder {
    pub(super) module: Module,
}

impl ModuleBuilder {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn generate(&self) -> String {
        crate::init_tracing();
        crate::generate_code(&self.module, CodegenOptions::default())
    }

    // ── Types ───────────────────────────────────────────────────────

    /// A struct with members `m0`, `m1`, ...
    pub(super) fn aggregate(&mut self, name: &str, members: Vec<Typespec>, traits: TypeTraits) -> Typespec {
        let members = members
            .into_iter()
            .enumerate()
            .map(|(i, ty)| MemberVariable::new(format!("m{i}"), ty))
            .collect();
        Typespec::Aggregate(self.module.alloc_type_info(TypeInfo::aggregate(name, members, traits)))
    }

    // ── Expressions ─────────────────────────────────────────────────

    pub(super) fn expr(&mut self, kind: ExprKind, ty: Typespec, category: ValueCategory) -> ExprId {
        self.module.alloc_expr(Expr::new(kind, ty, category))
    }

    pub(super) fn constant(&mut self, value: ConstantValue, ty: Typespec) -> ExprId {
        self.expr(ExprKind::Constant(value), ty, ValueCategory::Rvalue)
    }

    pub(super) fn int(&mut self, value: i64) -> ExprId {
        self.constant(ConstantValue::Sint(value), int_type())
    }

    /// A use of `var`; references denote the referenced object.
    pub(super) fn var_ref(&mut self, var: VarId) -> ExprId {
        let ty = self.module.var(var).ty.remove_any_reference().clone();
        self.expr(ExprKind::VariableRef(var), ty, ValueCategory::Lvalue)
    }

    pub(super) fn value_ref(&mut self, index: usize, ty: Typespec) -> ExprId {
        self.expr(ExprKind::ValueReference { index }, ty, ValueCategory::Lvalue)
    }

    pub(super) fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId, ty: Typespec) -> ExprId {
        let category = if op.is_compound_assign() {
            ValueCategory::Lvalue
        } else {
            ValueCategory::Rvalue
        };
        self.expr(ExprKind::Binary { op, lhs, rhs }, ty, category)
    }

    pub(super) fn call(&mut self, func: FuncId, args: Vec<ExprId>) -> ExprId {
        let ret = self.module.function(func).return_type.clone();
        let category = result_category(&ret);
        let kind = ExprKind::Call {
            func,
            args,
            order: bz_ir::ResolveOrder::Regular,
        };
        self.expr(kind, ret.remove_any_reference().clone(), category)
    }

    /// `{ stmts... }` of type `void`.
    pub(super) fn block(&mut self, stmts: Vec<StmtId>) -> ExprId {
        self.expr(
            ExprKind::Compound { stmts, final_expr: None },
            Typespec::Void,
            ValueCategory::None,
        )
    }

    // ── Statements ──────────────────────────────────────────────────

    pub(super) fn stmt(&mut self, stmt: Stmt) -> StmtId {
        self.module.alloc_stmt(stmt)
    }

    pub(super) fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(Stmt::Expression(expr))
    }

    pub(super) fn ret(&mut self, expr: Option<ExprId>) -> StmtId {
        self.stmt(Stmt::Return { expr })
    }

    /// A local variable and its declaration statement.
    pub(super) fn local(&mut self, decl: VarDecl) -> (VarId, StmtId) {
        let var = self.module.alloc_var(decl);
        (var, self.stmt(Stmt::VarDecl(var)))
    }

    // ── Functions ───────────────────────────────────────────────────

    pub(super) fn param(&mut self, name: &str, ty: Typespec) -> VarId {
        self.module.alloc_var(VarDecl::new(name, ty))
    }

    pub(super) fn function(&mut self, name: &str, params: Vec<VarId>, ret: Typespec, body: Vec<StmtId>) -> FuncId {
        self.module
            .alloc_function(Function::new(name, params, ret).with_body(body))
    }

    /// A function with the given signature, defined elsewhere.
    pub(super) fn external(&mut self, name: &str, params: Vec<Typespec>, ret: Typespec) -> FuncId {
        let params = params.into_iter().map(|ty| self.param("p", ty)).collect();
        self.module.alloc_function(Function::new(name, params, ret))
    }

    pub(super) fn intrinsic(&mut self, intrinsic: Intrinsic, params: Vec<Typespec>, ret: Typespec) -> FuncId {
        let params = params.into_iter().map(|ty| self.param("p", ty)).collect();
        self.module
            .alloc_function(Function::new(format!("{intrinsic:?}"), params, ret).with_intrinsic(intrinsic))
    }
}
