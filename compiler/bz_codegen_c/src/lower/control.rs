//! Blocks, conditionals, switches and loop exits.

use bz_ir::{Expr, ExprId, StmtId, SwitchCase, Typespec, ValueCategory};

use super::Lowerer;
use crate::value::{ExprValue, Precedence};

/// Where the branches of a conditional expression leave their value.
#[derive(Copy, Clone, Debug)]
enum BranchResult {
    None,
    /// Rvalue results are constructed in place.
    Value(ExprValue),
    /// Lvalue results are collected through a pointer local.
    Reference(ExprValue),
}

impl Lowerer<'_> {
    pub(super) fn generate_compound(
        &mut self,
        expr: &Expr,
        stmts: &[StmtId],
        final_expr: Option<ExprId>,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let mark = self.ctx.push_expression_scope();
        for &stmt in stmts {
            if self.ctx.is_terminated() {
                break;
            }
            self.generate_stmt(stmt);
        }
        let result = match final_expr {
            Some(final_expr) if !self.ctx.is_terminated() => {
                let value = self.generate_expr(final_expr, dest);
                let outlives_scope = expr.is_rvalue()
                    && dest.is_none()
                    && !value.is_none()
                    && !value.is_variable()
                    && !self.ctx.destructs_since(mark).is_empty();
                if outlives_scope {
                    self.ctx.add_value_expression(&value)
                } else {
                    value
                }
            }
            _ => ExprValue::none(),
        };
        self.pop_expression_scope(mark);
        result
    }

    /// Evaluate a branch condition and run the cleanups of its
    /// temporaries before branching.
    pub(super) fn generate_condition(&mut self, condition: ExprId) -> ExprValue {
        let mark = self.ctx.push_expression_scope();
        let value = self.generate_expr(condition, None);
        let value = if self.ctx.destructs_since(mark).is_empty() {
            value
        } else {
            self.ctx.add_value_expression(&value)
        };
        self.pop_expression_scope(mark);
        value
    }

    fn begin_branch_result(&mut self, expr: &Expr, dest: Option<ExprValue>) -> BranchResult {
        if expr.ty.is_void() {
            return BranchResult::None;
        }
        match expr.category {
            ValueCategory::Rvalue => BranchResult::Value(self.result_storage(dest, &expr.ty)),
            ValueCategory::Lvalue => {
                let ty = self.get_type(&expr.ty);
                let pointer = self.ctx.add_pointer_for(ty, false);
                BranchResult::Reference(self.ctx.add_uninitialized_value(pointer))
            }
            ValueCategory::Noreturn | ValueCategory::None => BranchResult::None,
        }
    }

    /// Generate one branch; returns whether control leaves it.
    fn generate_branch(&mut self, branch: ExprId, result: BranchResult) -> bool {
        match result {
            BranchResult::None => {
                self.generate_scoped(branch, None);
            }
            BranchResult::Value(storage) => {
                self.generate_scoped(branch, Some(storage));
            }
            BranchResult::Reference(pointer) => {
                let mark = self.ctx.push_expression_scope();
                let value = self.generate_expr(branch, None);
                if !value.is_none() && !self.ctx.is_terminated() {
                    let address = self.ctx.create_address_of(value);
                    self.ctx.create_assignment(&pointer, &address);
                }
                self.pop_expression_scope(mark);
            }
        }
        self.ctx.is_terminated()
    }

    fn finish_branch_result(&mut self, result: BranchResult) -> ExprValue {
        match result {
            BranchResult::None => ExprValue::none(),
            BranchResult::Value(storage) => storage,
            BranchResult::Reference(pointer) => self.ctx.create_dereference(&pointer),
        }
    }

    pub(super) fn generate_if(
        &mut self,
        expr: &Expr,
        condition: ExprId,
        then_block: ExprId,
        else_block: Option<ExprId>,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let condition = self.generate_condition(condition);
        let result = self.begin_branch_result(expr, dest);
        self.ctx.begin_if(&condition);
        let then_terminated = self.generate_branch(then_block, result);
        let else_terminated = match else_block {
            Some(else_block) => {
                self.ctx.begin_else();
                self.generate_branch(else_block, result)
            }
            None => false,
        };
        self.ctx.end_if();
        if then_terminated && else_terminated {
            self.ctx.set_terminated(true);
            return ExprValue::none();
        }
        self.finish_branch_result(result)
    }

    pub(super) fn generate_switch(
        &mut self,
        expr: &Expr,
        matched: ExprId,
        cases: &[SwitchCase],
        default_case: Option<ExprId>,
        is_complete: bool,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let matched_ty = self.module.expr(matched).ty.clone();
        let matched = self.generate_condition(matched);
        let result = self.begin_branch_result(expr, dest);
        let all_terminated = if matched_ty == Typespec::Str {
            self.generate_string_switch(matched, cases, default_case, result)
        } else {
            self.generate_integral_switch(matched, &matched_ty, cases, default_case, is_complete, result)
        };
        if all_terminated {
            self.ctx.set_terminated(true);
            return ExprValue::none();
        }
        self.finish_branch_result(result)
    }

    fn generate_integral_switch(
        &mut self,
        matched: ExprValue,
        matched_ty: &Typespec,
        cases: &[SwitchCase],
        default_case: Option<ExprId>,
        is_complete: bool,
        result: BranchResult,
    ) -> bool {
        let was_in_c_switch = self.ctx.begin_switch(&matched);
        let mut all_terminated = true;
        for case in cases {
            let labels: Vec<String> = case
                .values
                .iter()
                .map(|value| self.constant_text(value, matched_ty, true))
                .collect();
            self.ctx.begin_case(&labels);
            all_terminated &= self.generate_branch(case.expr, result);
            self.ctx.end_case();
        }
        match default_case {
            Some(default_case) => {
                self.ctx.begin_default_case();
                all_terminated &= self.generate_branch(default_case, result);
                self.ctx.end_case();
            }
            None if is_complete => {
                self.ctx.begin_default_case();
                self.ctx.add_unreachable();
                self.ctx.end_case();
            }
            None => all_terminated = false,
        }
        self.ctx.end_switch(was_in_c_switch);
        all_terminated
    }

    /// `str` cases compare length and bytes in an else-if chain.
    fn generate_string_switch(
        &mut self,
        matched: ExprValue,
        cases: &[SwitchCase],
        default_case: Option<ExprId>,
        result: BranchResult,
    ) -> bool {
        let matched = self.ctx.materialize(matched);
        let mut all_terminated = true;
        let mut opened = false;
        for case in cases.iter().filter(|case| !case.values.is_empty()) {
            let condition = self.string_case_condition(&matched, case);
            if opened {
                self.ctx.begin_else_if(&condition);
            } else {
                self.ctx.begin_if(&condition);
                opened = true;
            }
            all_terminated &= self.generate_branch(case.expr, result);
        }
        match (default_case, opened) {
            (Some(default_case), true) => {
                self.ctx.begin_else();
                all_terminated &= self.generate_branch(default_case, result);
            }
            (Some(default_case), false) => {
                return self.generate_branch(default_case, result);
            }
            (None, _) => all_terminated = false,
        }
        if opened {
            self.ctx.end_if();
        }
        all_terminated
    }

    fn string_case_condition(&mut self, matched: &ExprValue, case: &SwitchCase) -> ExprValue {
        let begin = self.ctx.create_struct_gep(matched, 0);
        let end = self.ctx.create_struct_gep(matched, 1);
        let length = self.ctx.render_binary(&end, "-", &begin, Precedence::Addition);
        let begin = self.ctx.render_initializer(&begin);
        let mut alternatives = Vec::with_capacity(case.values.len());
        for value in &case.values {
            let bz_ir::ConstantValue::Str(s) = value else {
                panic!("non-string case value {value:?} in a string switch");
            };
            if s.is_empty() {
                alternatives.push(format!("{length} == 0"));
            } else {
                self.ctx.add_include("string.h");
                let storage = self.ctx.create_cstring(s);
                alternatives.push(format!(
                    "({length} == {len} && memcmp({begin}, {storage}, {len}) == 0)",
                    len = s.len()
                ));
            }
        }
        let (text, prec) = if alternatives.len() == 1 {
            let prec = if alternatives[0].starts_with('(') {
                Precedence::Literal
            } else {
                Precedence::Equality
            };
            (alternatives.remove(0), prec)
        } else {
            (alternatives.join(" || "), Precedence::LogicalOr)
        };
        let bool_type = self.ctx.bool_type();
        self.ctx.make_rvalue(text, bool_type, prec)
    }

    // ── Loop exits ──────────────────────────────────────────────────

    pub(super) fn generate_break(&mut self) {
        self.emit_loop_destruct_operations();
        match self.ctx.loop_break_label() {
            Some(label) => self.ctx.add_goto(label),
            None => self.ctx.add_break(),
        }
    }

    pub(super) fn generate_continue(&mut self) {
        self.emit_loop_destruct_operations();
        match self.ctx.loop_continue_label() {
            Some(label) => self.ctx.add_goto(label),
            None => self.ctx.add_continue(),
        }
    }
}
