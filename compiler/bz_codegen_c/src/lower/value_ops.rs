//! Element-wise copy, move, destruct, swap and assign plans.
//!
//! The plans come fully decomposed from the semantic pass; lowering binds
//! each element as a value reference and generates the element expression.
//! Self-swaps and assignments from an lvalue are skipped with an address
//! comparison, so plans never see aliasing operands.

use bz_ir::{ExprId, Typespec, ValueCategory};

use super::Lowerer;
use crate::value::{ExprValue, Precedence};

impl Lowerer<'_> {
    // ── Operand evaluation ──────────────────────────────────────────

    /// Evaluate an operand that must stay addressable while `later` is
    /// evaluated. Inline places such as `p->m_0` are pinned through a
    /// pointer local unless `later` cannot have side effects.
    fn generate_place(&mut self, id: ExprId, later: ExprId) -> ExprValue {
        let value = self.generate_expr(id, None);
        let value = self.ctx.materialize(value);
        if value.is_variable() || self.is_simple_expr(later) {
            value
        } else {
            let address = self.ctx.create_address_of(value);
            self.ctx.create_dereference(&address)
        }
    }

    pub(super) fn generate_operand_pair(&mut self, first: ExprId, second: ExprId) -> (ExprValue, ExprValue) {
        self.complete_type_of(first);
        let first_value = self.generate_place(first, second);
        let second_value = self.generate_expr(second, None);
        let second_value = self.ctx.materialize(second_value);
        (first_value, second_value)
    }

    /// A flat copy of `value`, in `dest` or a fresh local.
    fn trivial_copy(&mut self, value: ExprValue, dest: Option<ExprValue>) -> ExprValue {
        match dest {
            Some(dest) => {
                self.ctx.create_assignment(&dest, &value);
                dest
            }
            None if value.is_rvalue() => value,
            None => self.ctx.add_value_expression(&value),
        }
    }

    // ── Optionals ───────────────────────────────────────────────────

    /// `o != 0` for pointer-like optionals, otherwise the flag member.
    pub(super) fn optional_has_value(&mut self, optional: &ExprValue, ty: &Typespec) -> ExprValue {
        if ty.is_optional_pointer_like() {
            let null = self.ctx.make_rvalue("0".to_string(), optional.ty, Precedence::Literal);
            let text = self.ctx.render_binary(optional, "!=", &null, Precedence::Equality);
            let bool_type = self.ctx.bool_type();
            self.ctx.make_rvalue(text, bool_type, Precedence::Equality)
        } else {
            self.ctx.create_struct_gep(optional, 1)
        }
    }

    /// The payload place. A `?&T` yields the referenced object.
    pub(super) fn optional_value(&mut self, optional: &ExprValue, ty: &Typespec) -> ExprValue {
        if ty.is_optional_reference() {
            self.ctx.create_dereference(optional)
        } else if ty.is_optional_pointer_like() {
            *optional
        } else {
            self.ctx.create_struct_gep(optional, 0)
        }
    }

    pub(super) fn set_optional_has_value(&mut self, optional: &ExprValue, has_value: bool) {
        let flag = self.ctx.create_struct_gep(optional, 1);
        let bool_type = self.ctx.bool_type();
        let value = self.ctx.create_integer_constant(bool_type, u64::from(has_value));
        self.ctx.create_assignment(&flag, &value);
    }

    /// Panic unless `optional` holds a value.
    pub(super) fn check_optional_has_value(&mut self, optional: &ExprValue, ty: &Typespec) {
        let has_value = self.optional_has_value(optional, ty);
        self.ctx.begin_if_not(&has_value);
        let message = self.string_value("get_value called on a null optional");
        self.ctx.add_panic(&message);
        self.ctx.end_if();
    }

    // ── Construction ────────────────────────────────────────────────

    /// Copy construction from an lvalue into caller-provided storage is
    /// skipped when both are the same object.
    fn needs_copy_guard(&self, source: ExprId, dest: Option<ExprValue>, is_copy: bool) -> bool {
        is_copy && dest.is_some() && self.module.expr(source).category == ValueCategory::Lvalue
    }

    pub(super) fn generate_aggregate_construct(
        &mut self,
        source: ExprId,
        member_exprs: &[ExprId],
        ty: &Typespec,
        dest: Option<ExprValue>,
        is_copy: bool,
    ) -> ExprValue {
        let guard = self.needs_copy_guard(source, dest, is_copy);
        let source = self.generate_expr(source, None);
        let source = self.ctx.materialize(source);
        let result = self.result_storage(dest, ty);
        if guard {
            self.ctx.begin_if_different_addresses(&result, &source);
        }
        for (i, &member_expr) in member_exprs.iter().enumerate() {
            let source_member = self.ctx.create_struct_gep(&source, i);
            let result_member = self.ctx.create_struct_gep(&result, i);
            self.generate_with_bound(&[source_member], member_expr, Some(result_member));
        }
        if guard {
            self.ctx.end_if();
        }
        result
    }

    pub(super) fn generate_array_construct(
        &mut self,
        source: ExprId,
        elem_expr: ExprId,
        ty: &Typespec,
        dest: Option<ExprValue>,
        is_copy: bool,
    ) -> ExprValue {
        let guard = self.needs_copy_guard(source, dest, is_copy);
        let source = self.generate_expr(source, None);
        let source = self.ctx.materialize(source);
        let result = self.result_storage(dest, ty);
        if guard {
            self.ctx.begin_if_different_addresses(&result, &source);
        }
        let size = self.ctx.array_shape(result.ty).size;
        let index = self.ctx.begin_index_loop(size);
        let source_elem = self.ctx.create_array_gep(&source, &index);
        let result_elem = self.ctx.create_array_gep(&result, &index);
        self.generate_with_bound(&[source_elem], elem_expr, Some(result_elem));
        self.ctx.end_index_loop(&index);
        if guard {
            self.ctx.end_if();
        }
        result
    }

    pub(super) fn generate_optional_construct(
        &mut self,
        source: ExprId,
        value_expr: ExprId,
        ty: &Typespec,
        dest: Option<ExprValue>,
        is_copy: bool,
    ) -> ExprValue {
        if ty.is_optional_pointer_like() {
            let source = self.generate_expr(source, None);
            return self.trivial_copy(source, dest);
        }
        let guard = self.needs_copy_guard(source, dest, is_copy);
        let source = self.generate_expr(source, None);
        let source = self.ctx.materialize(source);
        let result = self.result_storage(dest, ty);
        if guard {
            self.ctx.begin_if_different_addresses(&result, &source);
        }
        let source_has_value = self.optional_has_value(&source, ty);
        let result_has_value = self.optional_has_value(&result, ty);
        self.ctx.create_assignment(&result_has_value, &source_has_value);
        self.ctx.begin_if(&source_has_value);
        let source_value = self.optional_value(&source, ty);
        let result_value = self.optional_value(&result, ty);
        self.generate_with_bound(&[source_value], value_expr, Some(result_value));
        self.ctx.end_if();
        if guard {
            self.ctx.end_if();
        }
        result
    }

    // ── Destruction ─────────────────────────────────────────────────

    /// Members are destroyed last to first.
    pub(super) fn generate_member_destructs(&mut self, value: &ExprValue, destruct_calls: &[Option<ExprId>]) {
        for (i, call) in destruct_calls.iter().enumerate().rev() {
            if let Some(call) = call {
                let member = self.ctx.create_struct_gep(value, i);
                self.generate_with_bound(&[member], *call, None);
            }
        }
    }

    pub(super) fn generate_array_destruct(&mut self, value: ExprId, elem_destruct_call: ExprId) {
        let value = self.generate_expr(value, None);
        let size = self.ctx.array_shape(value.ty).size;
        let index = self.ctx.begin_reversed_index_loop(size);
        let elem = self.ctx.create_array_gep(&value, &index);
        self.generate_with_bound(&[elem], elem_destruct_call, None);
        self.ctx.end_while();
    }

    pub(super) fn generate_optional_destruct(&mut self, value: ExprId, value_destruct_call: ExprId) {
        let ty = self.module.expr(value).ty.clone();
        let value = self.generate_expr(value, None);
        let has_value = self.optional_has_value(&value, &ty);
        self.ctx.begin_if(&has_value);
        let payload = self.optional_value(&value, &ty);
        self.generate_with_bound(&[payload], value_destruct_call, None);
        self.ctx.end_if();
    }

    // ── Swap ────────────────────────────────────────────────────────

    pub(super) fn generate_aggregate_swap(&mut self, lhs: ExprId, rhs: ExprId, swap_exprs: &[ExprId]) {
        let (lhs, rhs) = self.generate_operand_pair(lhs, rhs);
        self.ctx.begin_if_different_addresses(&lhs, &rhs);
        for (i, &swap_expr) in swap_exprs.iter().enumerate() {
            let lhs_member = self.ctx.create_struct_gep(&lhs, i);
            let rhs_member = self.ctx.create_struct_gep(&rhs, i);
            self.generate_with_bound(&[lhs_member, rhs_member], swap_expr, None);
        }
        self.ctx.end_if();
    }

    pub(super) fn generate_array_swap(&mut self, lhs: ExprId, rhs: ExprId, swap_expr: ExprId) {
        let (lhs, rhs) = self.generate_operand_pair(lhs, rhs);
        self.ctx.begin_if_different_addresses(&lhs, &rhs);
        let size = self.ctx.array_shape(lhs.ty).size;
        let index = self.ctx.begin_index_loop(size);
        let lhs_elem = self.ctx.create_array_gep(&lhs, &index);
        let rhs_elem = self.ctx.create_array_gep(&rhs, &index);
        self.generate_with_bound(&[lhs_elem, rhs_elem], swap_expr, None);
        self.ctx.end_index_loop(&index);
        self.ctx.end_if();
    }

    pub(super) fn generate_optional_swap(
        &mut self,
        lhs_id: ExprId,
        rhs_id: ExprId,
        value_swap_expr: ExprId,
        lhs_move_expr: ExprId,
        rhs_move_expr: ExprId,
    ) {
        let ty = self.module.expr(lhs_id).ty.clone();
        let (lhs, rhs) = self.generate_operand_pair(lhs_id, rhs_id);
        if ty.is_optional_pointer_like() {
            self.emit_trivial_swap(&lhs, &rhs);
            return;
        }
        self.ctx.begin_if_different_addresses(&lhs, &rhs);
        let (lhs_has_value, rhs_has_value, both) = self.snapshot_has_values(&lhs, &rhs, &ty);
        let lhs_value = self.optional_value(&lhs, &ty);
        let rhs_value = self.optional_value(&rhs, &ty);

        self.ctx.begin_if(&both);
        self.generate_with_bound(&[lhs_value, rhs_value], value_swap_expr, None);

        self.ctx.begin_else_if(&lhs_has_value);
        self.generate_with_bound(&[lhs_value], lhs_move_expr, Some(rhs_value));
        self.set_optional_has_value(&lhs, false);
        self.set_optional_has_value(&rhs, true);

        self.ctx.begin_else_if(&rhs_has_value);
        self.generate_with_bound(&[rhs_value], rhs_move_expr, Some(lhs_value));
        self.set_optional_has_value(&lhs, true);
        self.set_optional_has_value(&rhs, false);
        self.ctx.end_if();

        self.ctx.end_if();
    }

    /// The flags of two optionals, read before any branch changes them,
    /// and their conjunction.
    fn snapshot_has_values(
        &mut self,
        lhs: &ExprValue,
        rhs: &ExprValue,
        ty: &Typespec,
    ) -> (ExprValue, ExprValue, ExprValue) {
        let lhs_has_value = self.optional_has_value(lhs, ty);
        let lhs_has_value = self.ctx.add_value_expression(&lhs_has_value);
        let rhs_has_value = self.optional_has_value(rhs, ty);
        let rhs_has_value = self.ctx.add_value_expression(&rhs_has_value);
        let text = self.ctx.render_binary(&lhs_has_value, "&&", &rhs_has_value, Precedence::LogicalAnd);
        let bool_type = self.ctx.bool_type();
        let both = self.ctx.make_rvalue(text, bool_type, Precedence::LogicalAnd);
        (lhs_has_value, rhs_has_value, both)
    }

    pub(super) fn generate_base_type_swap(
        &mut self,
        lhs: ExprId,
        rhs: ExprId,
        lhs_move_expr: ExprId,
        rhs_move_expr: ExprId,
        temp_move_expr: ExprId,
    ) {
        let (lhs, rhs) = self.generate_operand_pair(lhs, rhs);
        self.ctx.begin_if_different_addresses(&lhs, &rhs);
        let temp = self.ctx.add_uninitialized_value(lhs.ty);
        self.generate_with_bound(&[lhs], lhs_move_expr, Some(temp));
        self.generate_with_bound(&[rhs], rhs_move_expr, Some(lhs));
        self.generate_with_bound(&[temp], temp_move_expr, Some(rhs));
        self.ctx.end_if();
    }

    /// `if (&a != &b) { T t = a; a = b; b = t; }`
    pub(super) fn emit_trivial_swap(&mut self, lhs: &ExprValue, rhs: &ExprValue) {
        self.ctx.begin_if_different_addresses(lhs, rhs);
        let temp = self.ctx.add_value_expression(lhs);
        self.ctx.create_assignment(lhs, rhs);
        self.ctx.create_assignment(rhs, &temp);
        self.ctx.end_if();
    }

    // ── Assign ──────────────────────────────────────────────────────

    /// Assignments evaluate the right operand first. Returns the operands
    /// and whether the rhs names existing storage, which may be the lhs.
    fn generate_assign_operands(&mut self, lhs: ExprId, rhs: ExprId) -> (ExprValue, ExprValue, bool) {
        let rhs_is_lvalue = self.module.expr(rhs).category == ValueCategory::Lvalue;
        let (rhs, lhs) = self.generate_operand_pair(rhs, lhs);
        (lhs, rhs, rhs_is_lvalue)
    }

    pub(super) fn generate_aggregate_assign(&mut self, lhs: ExprId, rhs: ExprId, assign_exprs: &[ExprId]) -> ExprValue {
        let (lhs, rhs, guard) = self.generate_assign_operands(lhs, rhs);
        if guard {
            self.ctx.begin_if_different_addresses(&lhs, &rhs);
        }
        for (i, &assign_expr) in assign_exprs.iter().enumerate() {
            let lhs_member = self.ctx.create_struct_gep(&lhs, i);
            let rhs_member = self.ctx.create_struct_gep(&rhs, i);
            self.generate_with_bound(&[lhs_member, rhs_member], assign_expr, None);
        }
        if guard {
            self.ctx.end_if();
        }
        lhs
    }

    pub(super) fn generate_array_assign(&mut self, lhs: ExprId, rhs: ExprId, assign_expr: ExprId) -> ExprValue {
        let (lhs, rhs, guard) = self.generate_assign_operands(lhs, rhs);
        if guard {
            self.ctx.begin_if_different_addresses(&lhs, &rhs);
        }
        let size = self.ctx.array_shape(lhs.ty).size;
        let index = self.ctx.begin_index_loop(size);
        let lhs_elem = self.ctx.create_array_gep(&lhs, &index);
        let rhs_elem = self.ctx.create_array_gep(&rhs, &index);
        self.generate_with_bound(&[lhs_elem, rhs_elem], assign_expr, None);
        self.ctx.end_index_loop(&index);
        if guard {
            self.ctx.end_if();
        }
        lhs
    }

    pub(super) fn generate_optional_assign(
        &mut self,
        lhs_id: ExprId,
        rhs_id: ExprId,
        value_assign_expr: ExprId,
        value_construct_expr: ExprId,
        value_destruct_expr: ExprId,
    ) -> ExprValue {
        let ty = self.module.expr(lhs_id).ty.clone();
        let (lhs, rhs, guard) = self.generate_assign_operands(lhs_id, rhs_id);
        if ty.is_optional_pointer_like() {
            self.ctx.create_assignment(&lhs, &rhs);
            return lhs;
        }
        if guard {
            self.ctx.begin_if_different_addresses(&lhs, &rhs);
        }
        let (lhs_has_value, rhs_has_value, both) = self.snapshot_has_values(&lhs, &rhs, &ty);
        let lhs_value = self.optional_value(&lhs, &ty);
        let rhs_value = self.optional_value(&rhs, &ty);

        self.ctx.begin_if(&both);
        self.generate_with_bound(&[lhs_value, rhs_value], value_assign_expr, None);

        self.ctx.begin_else_if(&lhs_has_value);
        self.generate_with_bound(&[lhs_value], value_destruct_expr, None);
        self.set_optional_has_value(&lhs, false);

        self.ctx.begin_else_if(&rhs_has_value);
        self.generate_with_bound(&[rhs_value], value_construct_expr, Some(lhs_value));
        self.set_optional_has_value(&lhs, true);
        self.ctx.end_if();

        if guard {
            self.ctx.end_if();
        }
        lhs
    }

    pub(super) fn generate_optional_null_assign(
        &mut self,
        lhs_id: ExprId,
        rhs: ExprId,
        value_destruct_expr: Option<ExprId>,
    ) -> ExprValue {
        let ty = self.module.expr(lhs_id).ty.clone();
        self.generate_expr(rhs, None);
        let lhs = self.generate_expr(lhs_id, None);
        if ty.is_optional_pointer_like() {
            let null = self.ctx.make_rvalue("0".to_string(), lhs.ty, Precedence::Literal);
            self.ctx.create_assignment(&lhs, &null);
            return lhs;
        }
        if let Some(destruct_expr) = value_destruct_expr {
            let has_value = self.optional_has_value(&lhs, &ty);
            self.ctx.begin_if(&has_value);
            let value = self.optional_value(&lhs, &ty);
            self.generate_with_bound(&[value], destruct_expr, None);
            self.set_optional_has_value(&lhs, false);
            self.ctx.end_if();
        } else {
            self.set_optional_has_value(&lhs, false);
        }
        lhs
    }

    pub(super) fn generate_optional_value_assign(
        &mut self,
        lhs_id: ExprId,
        rhs_id: ExprId,
        value_assign_expr: ExprId,
        value_construct_expr: ExprId,
    ) -> ExprValue {
        let ty = self.module.expr(lhs_id).ty.clone();
        let (lhs, rhs, _) = self.generate_assign_operands(lhs_id, rhs_id);
        if ty.is_optional_pointer_like() {
            self.ctx.create_assignment(&lhs, &rhs);
            return lhs;
        }
        let has_value = self.optional_has_value(&lhs, &ty);
        let lhs_value = self.optional_value(&lhs, &ty);
        self.ctx.begin_if(&has_value);
        self.generate_with_bound(&[lhs_value, rhs], value_assign_expr, None);
        self.ctx.begin_else();
        self.generate_with_bound(&[rhs], value_construct_expr, Some(lhs_value));
        self.set_optional_has_value(&lhs, true);
        self.ctx.end_if();
        lhs
    }

    pub(super) fn generate_base_type_assign(
        &mut self,
        lhs: ExprId,
        rhs: ExprId,
        lhs_destruct_expr: ExprId,
        rhs_copy_expr: ExprId,
    ) -> ExprValue {
        let (lhs, rhs, guard) = self.generate_assign_operands(lhs, rhs);
        if guard {
            self.ctx.begin_if_different_addresses(&lhs, &rhs);
        }
        self.generate_with_bound(&[lhs], lhs_destruct_expr, None);
        self.generate_with_bound(&[rhs], rhs_copy_expr, Some(lhs));
        if guard {
            self.ctx.end_if();
        }
        lhs
    }
}
