//! Statements, variable declarations and loops.
//!
//! Source loops become `while (1)` with the condition checked at the top,
//! so `break` and `continue` have one shape for every loop kind. Loops
//! with an iteration expression route `continue` through a label placed
//! before it.

use bz_ir::{ExprId, ExprKind, Stmt, StmtId, VarId};

use super::Lowerer;
use crate::abi::ReturnPassing;
use crate::value::{ExprValue, Precedence};

impl Lowerer<'_> {
    pub(super) fn generate_stmt(&mut self, id: StmtId) {
        let module = self.module;
        match module.stmt(id) {
            Stmt::Expression(expr) => {
                self.generate_scoped(*expr, None);
            }
            Stmt::VarDecl(var) => self.generate_var_decl(*var),
            Stmt::While { condition, body } => self.generate_while(*condition, *body),
            Stmt::For { init, condition, iteration, body } => {
                self.generate_for(*init, *condition, *iteration, *body);
            }
            Stmt::Foreach {
                range_var,
                iter_var,
                end_var,
                condition,
                iteration,
                iter_deref_var,
                body,
            } => {
                let mark = self.ctx.push_expression_scope();
                self.generate_var_decl(*range_var);
                self.generate_var_decl(*iter_var);
                self.generate_var_decl(*end_var);
                self.generate_loop(Some(*condition), Some(*iteration), |this| {
                    let body_mark = this.ctx.push_expression_scope();
                    this.generate_var_decl(*iter_deref_var);
                    this.generate_scoped(*body, None);
                    this.pop_expression_scope(body_mark);
                });
                self.pop_expression_scope(mark);
            }
            Stmt::Return { expr } => self.generate_return(*expr),
            Stmt::Defer(op) => self.ctx.push_destruct_operation(*op),
            Stmt::NoOp | Stmt::StaticAssert => {}
        }
    }

    // ── Variables ───────────────────────────────────────────────────

    pub(super) fn generate_var_decl(&mut self, var: VarId) {
        let module = self.module;
        let decl = module.var(var);
        if decl.is_global {
            if self.ctx.global(var).is_none() {
                self.generate_global(var);
            }
            return;
        }

        if decl.ty.is_any_reference() {
            let Some(init) = decl.init else {
                panic!("reference `{}` declared without an initializer", decl.name);
            };
            let mark = self.ctx.push_expression_scope();
            let value = self.generate_expr(init, None);
            let value = if value.is_variable() {
                value
            } else {
                let address = self.ctx.create_address_of(value);
                self.ctx.create_dereference(&address)
            };
            self.pop_expression_scope(mark);
            self.add_variable_helper(var, value);
            return;
        }

        let ty = self.get_type(&decl.ty);
        let value = match decl.init.map(|init| (init, &module.expr(init).kind)) {
            Some((_, ExprKind::Constant(constant))) => {
                let constant = self.generate_constant(constant, &decl.ty);
                let text = self.ctx.render_initializer(&constant);
                self.ctx.add_value_text(ty, &text)
            }
            Some((init, _)) => {
                let storage = self.ctx.add_uninitialized_value(ty);
                self.generate_scoped(init, Some(storage));
                storage
            }
            None => self.ctx.add_uninitialized_value(ty),
        };
        self.add_variable_helper(var, value);
    }

    /// Bind `var` (and the bindings of a destructuring declaration) to
    /// `value` and register its cleanup.
    pub(super) fn add_variable_helper(&mut self, var: VarId, value: ExprValue) {
        let module = self.module;
        let decl = module.var(var);
        if decl.tuple_decls.is_empty() {
            self.ctx.bind_local(var, value);
            if decl.ever_moved_from {
                self.ctx.add_move_destruct_indicator(var);
                self.ctx.push_variable_destruct_operation(decl.destruction, var);
            } else if !decl.ty.is_any_reference() {
                self.ctx.push_variable_destruct_operation(decl.destruction, var);
            }
            return;
        }
        for (i, &elem) in decl.tuple_decls.iter().enumerate() {
            let member = if value.ty.as_array().is_some() {
                self.ctx.create_array_gep_const(&value, i as u64)
            } else {
                self.ctx.create_struct_gep(&value, i)
            };
            let elem_value = if module.var(elem).ty.is_any_reference() {
                self.ctx.create_dereference(&member)
            } else {
                member
            };
            self.add_variable_helper(elem, elem_value);
        }
    }

    // ── Loops ───────────────────────────────────────────────────────

    fn generate_while(&mut self, condition: ExprId, body: ExprId) {
        self.generate_loop(Some(condition), None, |this| {
            this.generate_scoped(body, None);
        });
    }

    fn generate_for(&mut self, init: Option<StmtId>, condition: Option<ExprId>, iteration: Option<ExprId>, body: ExprId) {
        let mark = self.ctx.push_expression_scope();
        if let Some(init) = init {
            self.generate_stmt(init);
        }
        self.generate_loop(condition, iteration, |this| {
            this.generate_scoped(body, None);
        });
        self.pop_expression_scope(mark);
    }

    /// `while (1) { if (!cond) break; body; l_N:; iteration; }`
    fn generate_loop(
        &mut self,
        condition: Option<ExprId>,
        iteration: Option<ExprId>,
        body: impl FnOnce(&mut Self),
    ) {
        let outer = self.ctx.push_loop(iteration.is_some());
        self.ctx.begin_while_true();
        if let Some(condition) = condition {
            let condition = self.generate_condition(condition);
            self.ctx.begin_if_not(&condition);
            self.ctx.add_break();
            self.ctx.end_if();
        }
        body(self);
        if let Some(iteration) = iteration {
            if let Some(label) = self.ctx.loop_info().continue_label {
                self.ctx.add_label(label);
            }
            self.generate_scoped(iteration, None);
        }
        self.ctx.end_while();
        let info = self.ctx.pop_loop(outer);
        if let Some(label) = info.break_label {
            self.ctx.add_label(label);
        }
    }

    // ── Return ──────────────────────────────────────────────────────

    fn has_pending_destructs(&self) -> bool {
        !self.ctx.destructs_since(0).is_empty()
    }

    fn generate_return(&mut self, expr: Option<ExprId>) {
        let Some(expr) = expr else {
            self.emit_all_destruct_operations();
            self.ctx.add_return(None);
            return;
        };
        let value = match self.return_passing {
            ReturnPassing::Void => {
                self.generate_expr(expr, None);
                None
            }
            ReturnPassing::Sret => {
                let Some(address) = self.ctx.return_address() else {
                    panic!("indirect return without a return address");
                };
                self.generate_expr(expr, Some(address));
                None
            }
            ReturnPassing::Reference => {
                let value = self.generate_expr(expr, None);
                if value.is_none() {
                    return;
                }
                let address = self.ctx.create_address_of(value);
                Some(self.ctx.add_value_expression(&address))
            }
            ReturnPassing::Direct => {
                let value = self.generate_expr(expr, None);
                if value.is_none() {
                    return;
                }
                let is_constant = value.is_rvalue() && value.prec == Precedence::Literal;
                if self.has_pending_destructs() && !is_constant {
                    Some(self.ctx.add_value_expression(&value))
                } else {
                    Some(value)
                }
            }
        };
        if self.ctx.is_terminated() {
            return;
        }
        self.emit_all_destruct_operations();
        self.ctx.add_return(value.as_ref());
    }
}
