//! Cleanup emission at scope exits.
//!
//! Cleanups are recorded on the context's destruct stack as expressions are
//! lowered. Closing an expression scope emits its cleanups in reverse order;
//! `break`, `continue` and `return` emit every cleanup up to the loop or
//! function boundary without popping them, since the scopes they belong to
//! still close normally on the fall-through path.

use bz_ir::DestructKind;

use super::Lowerer;
use crate::context::DestructInfo;
use crate::value::Precedence;

impl Lowerer<'_> {
    /// Close the scope opened when the stack was `mark` deep.
    pub(super) fn pop_expression_scope(&mut self, mark: usize) {
        let destructs = self.ctx.take_destructs_since(mark);
        if destructs.is_empty() || self.ctx.is_terminated() {
            return;
        }
        tracing::trace!(count = destructs.len(), "closing expression scope");
        for info in destructs.iter().rev() {
            self.emit_destruct_operation(info);
        }
    }

    /// Cleanups of the innermost loop body, before `break` or `continue`.
    pub(super) fn emit_loop_destruct_operations(&mut self) {
        let begin = self.ctx.loop_info().destruct_stack_begin;
        for info in self.ctx.destructs_since(begin).iter().rev() {
            self.emit_destruct_operation(info);
        }
    }

    /// Every pending cleanup of the function, before `return`.
    pub(super) fn emit_all_destruct_operations(&mut self) {
        for info in self.ctx.destructs_since(0).iter().rev() {
            self.emit_destruct_operation(info);
        }
    }

    fn emit_destruct_operation(&mut self, info: &DestructInfo) {
        if let Some(condition) = info.condition {
            self.ctx.begin_if(&condition);
        }
        match info.op.kind {
            DestructKind::None | DestructKind::TrivialSelf => {}
            DestructKind::Variable { call } | DestructKind::Defer(call) => {
                self.generate_scoped(call, None);
            }
            DestructKind::SelfValue { call } => {
                self.generate_with_bound(&[info.value], call, None);
            }
            DestructKind::RvalueArray { elem_call } => {
                let size = self.ctx.array_shape(info.value.ty).size;
                let index = self.ctx.begin_reversed_index_loop(size);
                let elem = self.ctx.create_array_gep(&info.value, &index);
                match info.rvalue_array_elem_ptr {
                    Some(moved_elem) => {
                        let address = self.ctx.create_address_of(elem);
                        let text = self.ctx.render_binary(&address, "!=", &moved_elem, Precedence::Equality);
                        let bool_type = self.ctx.bool_type();
                        let not_moved = self.ctx.make_rvalue(text, bool_type, Precedence::Equality);
                        self.ctx.begin_if(&not_moved);
                        self.generate_with_bound(&[elem], elem_call, None);
                        self.ctx.end_if();
                    }
                    None => self.generate_with_bound(&[elem], elem_call, None),
                }
                self.ctx.end_while();
            }
        }
        if info.condition.is_some() {
            self.ctx.end_if();
        }
        if let Some(indicator) = info.move_destruct_indicator {
            let cleared = self.ctx.create_integer_constant(indicator.ty, 0);
            self.ctx.create_assignment(&indicator, &cleared);
        }
    }
}
