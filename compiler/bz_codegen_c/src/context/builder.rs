//! Statement and value builders.
//!
//! Values fall into two groups. Pure place and constant expressions (member
//! access, address-of, casts, literals) stay inline: their text is stored in
//! the slot and spliced wherever the value is used. Everything with side
//! effects or a data dependency on mutable state is materialized into a
//! fresh `v_N` local at the point of evaluation, so later uses observe the
//! value as it was computed.

use std::fmt::Write as _;

use bz_ir::{DestructOperation, VarId};

use super::{CodegenContext, DestructInfo, FunctionState, LoopInfo};
use crate::types::{Type, TypeModifier};
use crate::value::{ExprValue, Precedence, ValueFlags};

impl CodegenContext {
    // ── Slots ───────────────────────────────────────────────────────

    fn new_slot(&mut self, text: String) -> u32 {
        let slot = match u32::try_from(self.values.len()) {
            Ok(slot) if slot != u32::MAX => slot,
            _ => panic!("value slot table overflow"),
        };
        self.values.push(text);
        slot
    }

    fn slot_text(&self, value: &ExprValue) -> &str {
        assert!(!value.is_none(), "use of the result of a value-less expression");
        &self.values[value.slot as usize]
    }

    /// A named variable: a backend local, a parameter or a global.
    pub(crate) fn variable_value(&mut self, name: String, ty: Type) -> ExprValue {
        ExprValue {
            slot: self.new_slot(name),
            flags: ValueFlags::VARIABLE,
            prec: Precedence::Literal,
            ty,
        }
    }

    /// `*name`, where `name` holds a pointer to `pointee`.
    pub(crate) fn reference_value(&mut self, name: String, pointee: Type, is_const: bool) -> ExprValue {
        let mut flags = ValueFlags::NEEDS_DEREFERENCE | ValueFlags::VARIABLE;
        flags.set(ValueFlags::CONST, is_const);
        ExprValue {
            slot: self.new_slot(name),
            flags,
            prec: Precedence::Literal,
            ty: pointee,
        }
    }

    fn temporary(&mut self, text: String, ty: Type, prec: Precedence, flags: ValueFlags) -> ExprValue {
        ExprValue {
            slot: self.new_slot(text),
            flags: flags | ValueFlags::TEMPORARY,
            prec,
            ty,
        }
    }

    /// Inline text with no address: literals, casts, arithmetic.
    pub fn make_rvalue(&mut self, text: String, ty: Type, prec: Precedence) -> ExprValue {
        self.temporary(text, ty, prec, ValueFlags::RVALUE)
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// The C text of `value`.
    pub fn render(&self, value: &ExprValue) -> String {
        let slot = self.slot_text(value);
        if value.needs_dereference() {
            if value.prec.needs_parens_as_unary_operand() {
                format!("*({slot})")
            } else {
                format!("*{slot}")
            }
        } else {
            slot.to_string()
        }
    }

    fn render_with_parens(&self, value: &ExprValue, parens: bool) -> String {
        let text = self.render(value);
        if parens {
            format!("({text})")
        } else {
            text
        }
    }

    pub fn render_unary_operand(&self, value: &ExprValue) -> String {
        self.render_with_parens(value, value.effective_precedence().needs_parens_as_unary_operand())
    }

    /// Text for `T x = <here>;`, a brace list element or a call argument.
    pub fn render_initializer(&self, value: &ExprValue) -> String {
        self.render_with_parens(value, value.effective_precedence().needs_parens_as_initializer())
    }

    pub fn render_binary(&self, lhs: &ExprValue, op: &str, rhs: &ExprValue, prec: Precedence) -> String {
        let (lhs_parens, rhs_parens) = Precedence::needs_parens_as_binary_operands(
            lhs.effective_precedence(),
            rhs.effective_precedence(),
            prec,
        );
        format!(
            "{} {op} {}",
            self.render_with_parens(lhs, lhs_parens),
            self.render_with_parens(rhs, rhs_parens)
        )
    }

    /// Text of the address of an lvalue.
    pub fn render_address(&self, value: &ExprValue) -> String {
        assert!(!value.is_rvalue(), "address of an rvalue");
        if value.needs_dereference() {
            self.slot_text(value).to_string()
        } else {
            format!("&{}", self.render_unary_operand(value))
        }
    }

    // ── Lines ───────────────────────────────────────────────────────

    pub fn add_line(&mut self, line: &str) {
        let state = &mut self.func;
        for _ in 0..state.indent {
            state.body.push_str(&self.options.indentation);
        }
        state.body.push_str(line);
        state.body.push('\n');
        state.terminated = false;
    }

    fn add_terminator_line(&mut self, line: &str) {
        self.add_line(line);
        self.func.terminated = true;
    }

    pub fn add_expression_statement(&mut self, text: &str) {
        self.add_line(&format!("{text};"));
    }

    fn open_block(&mut self) {
        self.add_line("{");
        self.func.indent += 1;
    }

    fn close_block(&mut self) {
        debug_assert!(self.func.indent > 0, "close_block with zero indent");
        self.func.indent = self.func.indent.saturating_sub(1);
        self.add_line("}");
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.func.terminated
    }

    #[inline]
    pub fn set_terminated(&mut self, terminated: bool) {
        self.func.terminated = terminated;
    }

    // ── Names ───────────────────────────────────────────────────────

    pub fn make_local_name(&mut self) -> String {
        let name = format!("v_{}", self.func.counter);
        self.func.counter += 1;
        name
    }

    pub fn make_label(&mut self) -> u32 {
        let label = self.func.counter;
        self.func.counter += 1;
        label
    }

    pub fn label_name(label: u32) -> String {
        format!("l_{label}")
    }

    // ── Locals ──────────────────────────────────────────────────────

    /// `T v_N;`
    pub fn add_uninitialized_value(&mut self, ty: Type) -> ExprValue {
        let name = self.make_local_name();
        let type_name = self.type_name(ty);
        self.add_line(&format!("{type_name} {name};"));
        self.variable_value(name, ty)
    }

    /// `T v_N = init;` with `T` the type of `init`.
    pub fn add_value_expression(&mut self, init: &ExprValue) -> ExprValue {
        let text = self.render_initializer(init);
        self.add_value_text(init.ty, &text)
    }

    /// `T v_N = text;`
    pub fn add_value_text(&mut self, ty: Type, text: &str) -> ExprValue {
        let name = self.make_local_name();
        let type_name = self.type_name(ty);
        self.add_line(&format!("{type_name} {name} = {text};"));
        self.variable_value(name, ty)
    }

    /// Copy an rvalue into a local so it gets an address.
    pub fn materialize(&mut self, value: ExprValue) -> ExprValue {
        if value.is_rvalue() {
            self.add_value_expression(&value)
        } else {
            value
        }
    }

    /// `P v_N = ptr;` and the value `*v_N`.
    pub fn create_dereference(&mut self, ptr: &ExprValue) -> ExprValue {
        let text = self.render_initializer(ptr);
        self.add_reference_text(ptr.ty, &text)
    }

    /// `P v_N = text;` for pointer type `P`, and the value `*v_N`.
    pub fn add_reference_text(&mut self, pointer_ty: Type, text: &str) -> ExprValue {
        let Some((pointee, modifier)) = pointer_ty.pointee() else {
            panic!("dereference of non-pointer type {}", self.type_name(pointer_ty));
        };
        let name = self.make_local_name();
        let type_name = self.type_name(pointer_ty);
        self.add_line(&format!("{type_name} {name} = {text};"));
        self.reference_value(name, pointee, modifier == TypeModifier::ConstPointer)
    }

    // ── Inline places ───────────────────────────────────────────────

    fn place_flags(base: &ExprValue) -> ValueFlags {
        base.flags & (ValueFlags::CONST | ValueFlags::RVALUE)
    }

    /// Member `index` of a struct value: `s.m_i` or `p->m_i`.
    pub fn create_struct_gep(&mut self, value: &ExprValue, index: usize) -> ExprValue {
        let member = self.member_type(value.ty, index);
        let text = self.member_access_text(value, &format!("m_{index}"));
        self.temporary(text, member, Precedence::Suffix, Self::place_flags(value))
    }

    fn member_access_text(&self, value: &ExprValue, member: &str) -> String {
        if value.needs_dereference() {
            let slot = self.slot_text(value);
            if value.prec > Precedence::Suffix {
                format!("({slot})->{member}")
            } else {
                format!("{slot}->{member}")
            }
        } else {
            let base = self.render_with_parens(value, value.prec > Precedence::Suffix);
            format!("{base}.{member}")
        }
    }

    /// Element `index` of an array struct: `x.a[i]`.
    pub fn create_array_gep(&mut self, value: &ExprValue, index: &ExprValue) -> ExprValue {
        let elem = self.array_shape(value.ty).elem;
        let base = self.member_access_text(value, "a");
        let text = format!("{base}[{}]", self.render(index));
        self.temporary(text, elem, Precedence::Suffix, Self::place_flags(value))
    }

    pub fn create_array_gep_const(&mut self, value: &ExprValue, index: u64) -> ExprValue {
        let elem = self.array_shape(value.ty).elem;
        let base = self.member_access_text(value, "a");
        self.temporary(format!("{base}[{index}]"), elem, Precedence::Suffix, Self::place_flags(value))
    }

    /// Decayed pointer to the first element of an array struct.
    pub fn create_array_data_pointer(&mut self, value: &ExprValue) -> ExprValue {
        let elem = self.array_shape(value.ty).elem;
        let ty = self.add_pointer_for(elem, value.is_const());
        let text = self.member_access_text(value, "a");
        self.temporary(text, ty, Precedence::Suffix, ValueFlags::RVALUE)
    }

    /// `p[i]` through a pointer value.
    pub fn create_pointer_subscript(&mut self, ptr: &ExprValue, index: &ExprValue) -> ExprValue {
        let Some((elem, modifier)) = ptr.ty.pointee() else {
            panic!("subscript of non-pointer type {}", self.type_name(ptr.ty));
        };
        let base = self.render_with_parens(ptr, ptr.effective_precedence() > Precedence::Suffix);
        let text = format!("{base}[{}]", self.render(index));
        let mut flags = ValueFlags::empty();
        flags.set(ValueFlags::CONST, modifier == TypeModifier::ConstPointer);
        self.temporary(text, elem, Precedence::Suffix, flags)
    }

    /// Address of an lvalue; rvalues are materialized first.
    pub fn create_address_of(&mut self, value: ExprValue) -> ExprValue {
        let value = self.materialize(value);
        let ty = self.add_pointer_for(value.ty, value.is_const());
        if value.needs_dereference() {
            let mut pointer = value;
            pointer.flags.remove(ValueFlags::NEEDS_DEREFERENCE | ValueFlags::CONST);
            pointer.flags.insert(ValueFlags::RVALUE);
            pointer.ty = ty;
            pointer
        } else {
            let text = self.render_address(&value);
            self.make_rvalue(text, ty, Precedence::Prefix)
        }
    }

    // ── Computations ────────────────────────────────────────────────

    /// `(T)x`
    pub fn create_cast(&mut self, value: &ExprValue, ty: Type) -> ExprValue {
        let text = format!("({}){}", self.type_name(ty), self.render_unary_operand(value));
        self.make_rvalue(text, ty, Precedence::Prefix)
    }

    /// `T v_N = lhs op rhs;`
    pub fn create_binary_operation(
        &mut self,
        lhs: &ExprValue,
        rhs: &ExprValue,
        op: &str,
        prec: Precedence,
        ty: Type,
    ) -> ExprValue {
        let text = self.render_binary(lhs, op, rhs, prec);
        let text = if prec.needs_parens_as_initializer() {
            format!("({text})")
        } else {
            text
        };
        self.add_value_text(ty, &text)
    }

    /// `T v_N = op x;`
    pub fn create_unary_operation(&mut self, value: &ExprValue, op: &str, ty: Type) -> ExprValue {
        let operand = self.render_unary_operand(value);
        // `- -1` must not lex as `--1`.
        let separator = if operand.starts_with(op) { " " } else { "" };
        self.add_value_text(ty, &format!("{op}{separator}{operand}"))
    }

    /// `lhs = rhs;`
    pub fn create_assignment(&mut self, lhs: &ExprValue, rhs: &ExprValue) {
        let text = self.render_binary(lhs, "=", rhs, Precedence::Assignment);
        self.add_expression_statement(&text);
    }

    /// `lhs op= rhs;`
    pub fn create_compound_assignment(&mut self, lhs: &ExprValue, rhs: &ExprValue, op: &str) {
        let text = self.render_binary(lhs, op, rhs, Precedence::Assignment);
        self.add_expression_statement(&text);
    }

    /// `++x;` or `--x;`
    pub fn create_increment(&mut self, value: &ExprValue, op: &str) {
        let text = format!("{op}{}", self.render_unary_operand(value));
        self.add_expression_statement(&text);
    }

    /// `(T){ a, b, ... }`
    pub fn create_struct_literal(&mut self, ty: Type, elems: &[ExprValue]) -> ExprValue {
        let text = if elems.is_empty() {
            format!("({}){{ 0 }}", self.type_name(ty))
        } else {
            let elems: Vec<String> = elems.iter().map(|elem| self.render_initializer(elem)).collect();
            format!("({}){{ {} }}", self.type_name(ty), elems.join(", "))
        };
        self.make_rvalue(text, ty, Precedence::Suffix)
    }

    /// All-zero value of `ty`.
    pub fn create_zero_value(&mut self, ty: Type) -> ExprValue {
        if ty.as_struct().is_some() || ty.as_array().is_some() {
            self.create_struct_literal(ty, &[])
        } else {
            self.make_rvalue("0".to_string(), ty, Precedence::Literal)
        }
    }

    pub fn create_integer_constant(&mut self, ty: Type, value: u64) -> ExprValue {
        self.make_rvalue(value.to_string(), ty, Precedence::Literal)
    }

    /// Text of a value in callee position.
    pub fn render_callee(&self, callee: &ExprValue) -> String {
        self.render_with_parens(callee, callee.effective_precedence() > Precedence::Suffix)
    }

    /// `callee(a, b, ...)` as text.
    pub fn render_call(&self, callee: &str, args: &[String]) -> String {
        format!("{callee}({})", args.join(", "))
    }

    // ── Control flow ────────────────────────────────────────────────

    pub fn begin_if(&mut self, condition: &ExprValue) {
        let text = self.render(condition);
        self.add_line(&format!("if ({text})"));
        self.open_block();
    }

    pub fn begin_if_not(&mut self, condition: &ExprValue) {
        let text = self.render_unary_operand(condition);
        self.add_line(&format!("if (!{text})"));
        self.open_block();
    }

    /// `if (&lhs != &rhs)`: skip self-assignment and self-swap.
    pub fn begin_if_different_addresses(&mut self, lhs: &ExprValue, rhs: &ExprValue) {
        let text = format!("{} != {}", self.render_address(lhs), self.render_address(rhs));
        self.add_line(&format!("if ({text})"));
        self.open_block();
    }

    pub fn begin_else(&mut self) {
        self.close_block();
        self.add_line("else");
        self.open_block();
    }

    /// `} else if (condition) {`; the chain is closed by one [`Self::end_if`].
    pub fn begin_else_if(&mut self, condition: &ExprValue) {
        self.close_block();
        let text = self.render(condition);
        self.add_line(&format!("else if ({text})"));
        self.open_block();
    }

    pub fn end_if(&mut self) {
        self.close_block();
    }

    pub fn begin_while_true(&mut self) {
        self.add_line("while (1)");
        self.open_block();
    }

    pub fn end_while(&mut self) {
        self.close_block();
    }

    /// `T v_N = 0; while (v_N < size) {`; pair with [`Self::end_index_loop`].
    pub fn begin_index_loop(&mut self, size: u64) -> ExprValue {
        let index = self.add_value_text(self.size_type(), "0");
        let index_text = self.render(&index);
        self.add_line(&format!("while ({index_text} < {size})"));
        self.open_block();
        index
    }

    pub fn end_index_loop(&mut self, index: &ExprValue) {
        self.create_increment(index, "++");
        self.close_block();
    }

    /// `T v_N = size; while (v_N != 0) { --v_N;`, visiting elements from
    /// last to first; close with [`Self::end_while`].
    pub fn begin_reversed_index_loop(&mut self, size: u64) -> ExprValue {
        let index = self.add_value_text(self.size_type(), &size.to_string());
        let index_text = self.render(&index);
        self.add_line(&format!("while ({index_text} != 0)"));
        self.open_block();
        self.create_increment(&index, "--");
        index
    }

    /// Opens a C `switch`. A `break` of an enclosing source loop can no
    /// longer use C's `break` until [`Self::end_switch`].
    pub fn begin_switch(&mut self, matched: &ExprValue) -> bool {
        let text = self.render(matched);
        self.add_line(&format!("switch ({text})"));
        self.open_block();
        std::mem::replace(&mut self.func.loop_info.in_c_switch, true)
    }

    pub fn end_switch(&mut self, was_in_c_switch: bool) {
        self.close_block();
        self.func.loop_info.in_c_switch = was_in_c_switch;
    }

    /// `case <label>:` followed by a block.
    pub fn begin_case(&mut self, labels: &[String]) {
        for label in labels {
            self.add_line(&format!("case {label}:"));
        }
        self.open_block();
    }

    pub fn begin_default_case(&mut self) {
        self.add_line("default:");
        self.open_block();
    }

    /// Close a case block, leaving the switch unless control already left.
    pub fn end_case(&mut self) {
        if !self.is_terminated() {
            self.add_terminator_line("break;");
        }
        self.close_block();
    }

    pub fn add_return(&mut self, value: Option<&ExprValue>) {
        match value {
            Some(value) => {
                let text = self.render(value);
                self.add_terminator_line(&format!("return {text};"));
            }
            None => self.add_terminator_line("return;"),
        }
    }

    pub fn add_break(&mut self) {
        self.add_terminator_line("break;");
    }

    pub fn add_continue(&mut self) {
        self.add_terminator_line("continue;");
    }

    pub fn add_goto(&mut self, label: u32) {
        self.add_terminator_line(&format!("goto {};", Self::label_name(label)));
    }

    pub fn add_label(&mut self, label: u32) {
        // A label must precede a statement; `;` keeps it valid before `}`.
        self.add_line(&format!("{}:;", Self::label_name(label)));
    }

    pub fn add_unreachable(&mut self) {
        self.add_terminator_line("__builtin_unreachable();");
    }

    /// Print `message` (a `str` value) to stderr and abort.
    pub fn add_panic(&mut self, message: &ExprValue) {
        self.add_include("stdio.h");
        self.add_include("stdlib.h");
        let message = self.materialize(*message);
        let begin = self.create_struct_gep(&message, 0);
        let end = self.create_struct_gep(&message, 1);
        let length = self.render_binary(&end, "-", &begin, Precedence::Addition);
        let begin = self.render_initializer(&begin);
        self.add_line(&format!("fwrite({begin}, 1, {length}, stderr);"));
        self.add_line("fputc('\\n', stderr);");
        self.add_terminator_line("abort();");
    }

    // ── Functions ───────────────────────────────────────────────────

    /// Start emitting a new function body.
    pub(crate) fn begin_function(&mut self, func: bz_ir::FuncId) {
        self.func = FunctionState::new(func);
    }

    /// Wrap the collected body in `signature { ... }` and append it to the
    /// function definitions.
    pub(crate) fn finish_function(&mut self, signature: &str) {
        let state = std::mem::take(&mut self.func);
        debug_assert!(state.destructs.is_empty(), "unbalanced expression scopes");
        let mut definition = String::with_capacity(signature.len() + state.body.len() + 8);
        let _ = write!(definition, "{signature}\n{{\n{}}}\n", state.body);
        tracing::trace!(
            function = ?state.func,
            locals = state.counter,
            "function body finished"
        );
        self.add_function_definition(&definition);
    }

    // ── Scopes and cleanups ─────────────────────────────────────────

    pub(crate) fn push_expression_scope(&self) -> usize {
        self.func.destructs.len()
    }

    /// Remove and return the cleanups pushed since `mark`, oldest first.
    pub(crate) fn take_destructs_since(&mut self, mark: usize) -> Vec<DestructInfo> {
        self.func.destructs.split_off(mark)
    }

    /// Snapshot of the cleanups from `begin` upward, for early exits that
    /// run them without closing their scopes.
    pub(crate) fn destructs_since(&self, begin: usize) -> Vec<DestructInfo> {
        self.func.destructs[begin..].to_vec()
    }

    pub(crate) fn move_destruct_indicator(&self, var: VarId) -> Option<ExprValue> {
        self.func.move_destruct_indicators.get(&var).copied()
    }

    /// `_Bool v_N = 1;`, cleared when `var` is moved out of.
    pub(crate) fn add_move_destruct_indicator(&mut self, var: VarId) -> ExprValue {
        let indicator = self.add_value_text(self.bool_type(), "1");
        self.func.move_destruct_indicators.insert(var, indicator);
        indicator
    }

    fn push_destruct(&mut self, op: DestructOperation, value: ExprValue, condition: Option<ExprValue>, elem_ptr: Option<ExprValue>) {
        let move_destruct_indicator = op
            .move_destructed_var
            .and_then(|var| self.move_destruct_indicator(var));
        if op.is_null() && move_destruct_indicator.is_none() {
            return;
        }
        self.func.destructs.push(DestructInfo {
            op,
            value,
            condition,
            move_destruct_indicator,
            rvalue_array_elem_ptr: elem_ptr,
        });
    }

    /// A `defer` cleanup.
    pub(crate) fn push_destruct_operation(&mut self, op: DestructOperation) {
        self.push_destruct(op, ExprValue::none(), None, None);
    }

    /// A variable's cleanup, guarded by its move-destruct indicator.
    pub(crate) fn push_variable_destruct_operation(&mut self, op: DestructOperation, var: VarId) {
        let condition = self.move_destruct_indicator(var);
        self.push_destruct(op, ExprValue::none(), condition, None);
    }

    /// A temporary's cleanup; `value` is bound as value reference 0.
    pub(crate) fn push_self_destruct_operation(&mut self, op: DestructOperation, value: ExprValue) {
        self.push_destruct(op, value, None, None);
    }

    /// Cleanup of the elements of rvalue array `value` other than the one at
    /// `elem_ptr`.
    pub(crate) fn push_rvalue_array_destruct_operation(
        &mut self,
        op: DestructOperation,
        value: ExprValue,
        elem_ptr: ExprValue,
    ) {
        self.push_destruct(op, value, None, Some(elem_ptr));
    }

    // ── Value references ────────────────────────────────────────────

    pub(crate) fn push_value_reference(&mut self, value: ExprValue) {
        self.func.value_references.push(value);
    }

    pub(crate) fn pop_value_reference(&mut self) {
        let popped = self.func.value_references.pop();
        debug_assert!(popped.is_some(), "unbalanced value reference stack");
    }

    /// Index 0 is the latest binding.
    pub(crate) fn value_reference(&self, index: usize) -> ExprValue {
        let refs = &self.func.value_references;
        assert!(index < refs.len(), "value reference {index} is not bound");
        refs[refs.len() - 1 - index]
    }

    // ── Loops ───────────────────────────────────────────────────────

    /// Enter a source loop; returns the enclosing loop's state.
    pub(crate) fn push_loop(&mut self, continue_needs_label: bool) -> LoopInfo {
        let info = LoopInfo {
            destruct_stack_begin: self.func.destructs.len(),
            in_c_switch: false,
            break_label: None,
            continue_label: None,
            continue_needs_label,
        };
        std::mem::replace(&mut self.func.loop_info, info)
    }

    /// Leave the current loop; returns its final state.
    pub(crate) fn pop_loop(&mut self, outer: LoopInfo) -> LoopInfo {
        std::mem::replace(&mut self.func.loop_info, outer)
    }

    pub(crate) fn loop_info(&self) -> LoopInfo {
        self.func.loop_info
    }

    /// The label `break` must jump to, when C's `break` would only leave a
    /// `switch`.
    pub(crate) fn loop_break_label(&mut self) -> Option<u32> {
        if !self.func.loop_info.in_c_switch {
            return None;
        }
        if let Some(label) = self.func.loop_info.break_label {
            return Some(label);
        }
        let label = self.make_label();
        self.func.loop_info.break_label = Some(label);
        Some(label)
    }

    pub(crate) fn loop_continue_label(&mut self) -> Option<u32> {
        if !self.func.loop_info.continue_needs_label {
            return None;
        }
        if let Some(label) = self.func.loop_info.continue_label {
            return Some(label);
        }
        let label = self.make_label();
        self.func.loop_info.continue_label = Some(label);
        Some(label)
    }

    // ── Locals registry ─────────────────────────────────────────────

    pub(crate) fn bind_local(&mut self, var: VarId, value: ExprValue) {
        self.func.locals.insert(var, value);
    }

    pub(crate) fn local(&self, var: VarId) -> Option<ExprValue> {
        self.func.locals.get(&var).copied()
    }

    pub(crate) fn return_address(&self) -> Option<ExprValue> {
        self.func.return_address
    }

    pub(crate) fn set_return_address(&mut self, value: ExprValue) {
        self.func.return_address = Some(value);
    }
}
