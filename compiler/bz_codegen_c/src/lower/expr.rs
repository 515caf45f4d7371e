//! Expression dispatch, operators, conversions, construction and access.
//!
//! Every `generate_expr` call takes an optional destination. When present,
//! the expression's value is constructed in place and the destination is
//! returned; otherwise the value is returned as-is (an lvalue place, an
//! inline rvalue or a fresh local).

use bz_ir::{
    BinaryOp, DestructKind, Expr, ExprId, ExprKind, Typespec, UnaryOp, ValueCategory,
};

use super::Lowerer;
use crate::value::{ExprValue, Precedence};

/// C spelling and precedence of a non-assigning binary operator.
fn binary_operator(op: BinaryOp) -> (&'static str, Precedence) {
    match op {
        BinaryOp::Add => ("+", Precedence::Addition),
        BinaryOp::Sub => ("-", Precedence::Addition),
        BinaryOp::Mul => ("*", Precedence::Multiply),
        BinaryOp::Div => ("/", Precedence::Multiply),
        BinaryOp::Rem => ("%", Precedence::Multiply),
        BinaryOp::Eq => ("==", Precedence::Equality),
        BinaryOp::Ne | BinaryOp::BoolXor => ("!=", Precedence::Equality),
        BinaryOp::Lt => ("<", Precedence::Relational),
        BinaryOp::Le => ("<=", Precedence::Relational),
        BinaryOp::Gt => (">", Precedence::Relational),
        BinaryOp::Ge => (">=", Precedence::Relational),
        BinaryOp::BitAnd => ("&", Precedence::BitwiseAnd),
        BinaryOp::BitXor => ("^", Precedence::BitwiseXor),
        BinaryOp::BitOr => ("|", Precedence::BitwiseOr),
        BinaryOp::Shl => ("<<", Precedence::Bitshift),
        BinaryOp::Shr => (">>", Precedence::Bitshift),
        _ => unreachable!("{op:?} has no plain C operator"),
    }
}

fn compound_assign_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::AddAssign => "+=",
        BinaryOp::SubAssign => "-=",
        BinaryOp::MulAssign => "*=",
        BinaryOp::DivAssign => "/=",
        BinaryOp::RemAssign => "%=",
        BinaryOp::BitAndAssign => "&=",
        BinaryOp::BitXorAssign => "^=",
        BinaryOp::BitOrAssign => "|=",
        BinaryOp::ShlAssign => "<<=",
        BinaryOp::ShrAssign => ">>=",
        _ => unreachable!("{op:?} is not a compound assignment"),
    }
}

impl Lowerer<'_> {
    pub(super) fn generate_expr(&mut self, id: ExprId, dest: Option<ExprValue>) -> ExprValue {
        bz_stack::ensure_sufficient_stack(|| self.generate_expr_inner(id, dest))
    }

    fn generate_expr_inner(&mut self, id: ExprId, dest: Option<ExprValue>) -> ExprValue {
        let module = self.module;
        let expr = module.expr(id);
        let dest = if expr.category == ValueCategory::Noreturn { None } else { dest };
        let value = self.generate_expr_kind(expr, dest);
        let value = self.store_result(value, dest);
        self.push_self_destruct(expr, value)
    }

    /// Write `value` into `dest` unless the lowering already did.
    fn store_result(&mut self, value: ExprValue, dest: Option<ExprValue>) -> ExprValue {
        match dest {
            Some(dest) if !value.is_none() && value != dest => {
                self.ctx.create_assignment(&dest, &value);
                dest
            }
            Some(dest) if !value.is_none() => dest,
            _ => value,
        }
    }

    /// Register the cleanup of the temporary `expr` produced.
    fn push_self_destruct(&mut self, expr: &Expr, value: ExprValue) -> ExprValue {
        let op = expr.destruct_op;
        match op.kind {
            DestructKind::SelfValue { .. } if !value.is_none() => {
                let value = self.ctx.materialize(value);
                self.ctx.push_self_destruct_operation(op, value);
                value
            }
            // Registered by the subscript itself, which knows the element.
            DestructKind::RvalueArray { .. } => value,
            _ => {
                self.ctx.push_self_destruct_operation(op, ExprValue::none());
                value
            }
        }
    }

    /// `dest`, or a fresh uninitialized local of type `ty`.
    pub(super) fn result_storage(&mut self, dest: Option<ExprValue>, ty: &Typespec) -> ExprValue {
        match dest {
            Some(dest) => dest,
            None => {
                let ty = self.get_type(ty);
                self.ctx.add_uninitialized_value(ty)
            }
        }
    }

    /// Define the struct of `id`'s type before its members are accessed.
    /// Structs reached only through pointers are defined lazily.
    pub(super) fn complete_type_of(&mut self, id: ExprId) {
        let module = self.module;
        self.get_type(&module.expr(id).ty);
    }

    /// Whether evaluating `id` can neither have side effects nor observe
    /// any, so values computed before it stay valid.
    pub(super) fn is_simple_expr(&self, id: ExprId) -> bool {
        match &self.module.expr(id).kind {
            ExprKind::Constant(_)
            | ExprKind::VariableRef(_)
            | ExprKind::FunctionRef(_)
            | ExprKind::ValueReference { .. } => true,
            ExprKind::TrivialCopyConstruct { copied_value: inner }
            | ExprKind::TrivialRelocate { value: inner }
            | ExprKind::TakeReference { expr: inner }
            | ExprKind::Unary { op: UnaryOp::Move | UnaryOp::UnsafeMove, operand: inner } => {
                self.is_simple_expr(*inner)
            }
            _ => false,
        }
    }

    /// Copy `value` into a local unless it is a constant, so that later
    /// side effects cannot change it.
    pub(super) fn stabilize(&mut self, value: ExprValue) -> ExprValue {
        if value.is_none() || (value.is_rvalue() && value.prec == Precedence::Literal) {
            value
        } else {
            self.ctx.add_value_expression(&value)
        }
    }

    /// Type of member `index` of a struct-like source type.
    pub(super) fn member_typespec(&self, ty: &Typespec, index: usize) -> Typespec {
        match ty {
            Typespec::Aggregate(id) => self.module.type_info(*id).members[index].ty.clone(),
            Typespec::Tuple(elems) => elems[index].clone(),
            Typespec::Optional(payload) if index == 0 => (**payload).clone(),
            Typespec::Optional(_) => Typespec::builtin(bz_ir::BuiltinKind::Bool),
            Typespec::Str => Typespec::pointer(Typespec::builtin(bz_ir::BuiltinKind::U8), false),
            Typespec::Slice { elem, mutable } => Typespec::pointer((**elem).clone(), *mutable),
            _ => panic!("{ty:?} has no members"),
        }
    }

    /// Member `index` of `base`, loading through the pointer when the
    /// member is a reference.
    pub(super) fn member_value(&mut self, base: &ExprValue, base_ty: &Typespec, index: usize) -> ExprValue {
        let member = self.ctx.create_struct_gep(base, index);
        if self.member_typespec(base_ty, index).is_any_reference() {
            self.ctx.create_dereference(&member)
        } else {
            member
        }
    }

    fn generate_expr_kind(&mut self, expr: &Expr, dest: Option<ExprValue>) -> ExprValue {
        match &expr.kind {
            // ── Leaves ──────────────────────────────────────────────
            ExprKind::VariableRef(var) => match self.ctx.local(*var).or_else(|| self.ctx.global(*var)) {
                Some(value) => value,
                None => panic!("variable `{}` used before its declaration", self.module.var(*var).name),
            },
            ExprKind::FunctionRef(func) => {
                let name = self.ensure_function_declared(*func);
                let ty = self.get_type(&expr.ty);
                self.ctx.make_rvalue(name, ty, Precedence::Literal)
            }
            ExprKind::Constant(value) => self.generate_constant(value, &expr.ty),
            ExprKind::ValueReference { index } => self.ctx.value_reference(*index),

            // ── Builtin operators ───────────────────────────────────
            ExprKind::Unary { op, operand } => self.generate_unary(*op, *operand, expr),
            ExprKind::Binary { op, lhs, rhs } => self.generate_binary(*op, *lhs, *rhs, expr, dest),

            // ── Calls ───────────────────────────────────────────────
            ExprKind::Call { func, args, order } => self.generate_call(expr, *func, args, *order, dest),
            ExprKind::IndirectCall { callee, args } => self.generate_indirect_call(*callee, args, dest),

            // ── Conversions ─────────────────────────────────────────
            ExprKind::Cast { expr: inner } => self.generate_cast(*inner, &expr.ty),
            ExprKind::BitCast { expr: inner } => self.generate_bit_cast(*inner, &expr.ty, dest),
            ExprKind::OptionalCast { expr: inner } => self.generate_optional_cast(*inner, &expr.ty, dest),
            ExprKind::TakeReference { expr: inner } | ExprKind::TakeMoveReference { expr: inner } => {
                let value = self.generate_expr(*inner, None);
                self.ctx.materialize(value)
            }

            // ── Construction ────────────────────────────────────────
            ExprKind::Tuple { elems } => self.generate_member_init(elems, &expr.ty, dest),
            ExprKind::AggregateInit { exprs } => self.generate_member_init(exprs, &expr.ty, dest),
            ExprKind::ArrayValueInit { value, copy_expr } => {
                self.generate_array_value_init(*value, *copy_expr, &expr.ty, dest)
            }
            ExprKind::AggregateDefaultConstruct { default_construct_exprs } => {
                let result = self.result_storage(dest, &expr.ty);
                for (i, &construct) in default_construct_exprs.iter().enumerate() {
                    let member = self.ctx.create_struct_gep(&result, i);
                    self.generate_scoped(construct, Some(member));
                }
                result
            }
            ExprKind::ArrayDefaultConstruct { default_construct_expr } => {
                let result = self.result_storage(dest, &expr.ty);
                let size = self.ctx.array_shape(result.ty).size;
                let index = self.ctx.begin_index_loop(size);
                let elem = self.ctx.create_array_gep(&result, &index);
                self.generate_scoped(*default_construct_expr, Some(elem));
                self.ctx.end_index_loop(&index);
                result
            }
            ExprKind::OptionalDefaultConstruct | ExprKind::BuiltinDefaultConstruct => {
                let ty = self.get_type(&expr.ty);
                self.ctx.create_zero_value(ty)
            }
            ExprKind::AggregateCopyConstruct { copied_value, copy_exprs } => {
                self.generate_aggregate_construct(*copied_value, copy_exprs, &expr.ty, dest, true)
            }
            ExprKind::AggregateMoveConstruct { moved_value, move_exprs } => {
                self.generate_aggregate_construct(*moved_value, move_exprs, &expr.ty, dest, false)
            }
            ExprKind::ArrayCopyConstruct { copied_value, copy_expr } => {
                self.generate_array_construct(*copied_value, *copy_expr, &expr.ty, dest, true)
            }
            ExprKind::ArrayMoveConstruct { moved_value, move_expr } => {
                self.generate_array_construct(*moved_value, *move_expr, &expr.ty, dest, false)
            }
            ExprKind::OptionalCopyConstruct { copied_value, value_copy_expr } => {
                self.generate_optional_construct(*copied_value, *value_copy_expr, &expr.ty, dest, true)
            }
            ExprKind::OptionalMoveConstruct { moved_value, value_move_expr } => {
                self.generate_optional_construct(*moved_value, *value_move_expr, &expr.ty, dest, false)
            }
            ExprKind::TrivialCopyConstruct { copied_value: value } | ExprKind::TrivialRelocate { value } => {
                let value = self.generate_expr(*value, None);
                if dest.is_some() || value.is_rvalue() {
                    value
                } else {
                    self.ctx.add_value_expression(&value)
                }
            }

            // ── Destruction ─────────────────────────────────────────
            ExprKind::AggregateDestruct { value, elem_destruct_calls } => {
                self.complete_type_of(*value);
                let value = self.generate_expr(*value, None);
                self.generate_member_destructs(&value, elem_destruct_calls);
                ExprValue::none()
            }
            ExprKind::ArrayDestruct { value, elem_destruct_call } => {
                self.generate_array_destruct(*value, *elem_destruct_call);
                ExprValue::none()
            }
            ExprKind::OptionalDestruct { value, value_destruct_call } => {
                self.generate_optional_destruct(*value, *value_destruct_call);
                ExprValue::none()
            }
            ExprKind::BaseTypeDestruct { value, destruct_call, member_destruct_calls } => {
                self.complete_type_of(*value);
                let value = self.generate_expr(*value, None);
                if let Some(call) = destruct_call {
                    self.generate_with_bound(&[value], *call, None);
                }
                self.generate_member_destructs(&value, member_destruct_calls);
                ExprValue::none()
            }
            ExprKind::DestructValue { value, destruct_call } => {
                let value = self.generate_expr(*value, None);
                if let Some(call) = destruct_call {
                    self.generate_with_bound(&[value], *call, None);
                }
                ExprValue::none()
            }

            // ── Swap ────────────────────────────────────────────────
            ExprKind::AggregateSwap { lhs, rhs, swap_exprs } => {
                self.generate_aggregate_swap(*lhs, *rhs, swap_exprs);
                ExprValue::none()
            }
            ExprKind::ArraySwap { lhs, rhs, swap_expr } => {
                self.generate_array_swap(*lhs, *rhs, *swap_expr);
                ExprValue::none()
            }
            ExprKind::OptionalSwap { lhs, rhs, value_swap_expr, lhs_move_expr, rhs_move_expr } => {
                self.generate_optional_swap(*lhs, *rhs, *value_swap_expr, *lhs_move_expr, *rhs_move_expr);
                ExprValue::none()
            }
            ExprKind::BaseTypeSwap { lhs, rhs, lhs_move_expr, rhs_move_expr, temp_move_expr } => {
                self.generate_base_type_swap(*lhs, *rhs, *lhs_move_expr, *rhs_move_expr, *temp_move_expr);
                ExprValue::none()
            }
            ExprKind::TrivialSwap { lhs, rhs } => {
                let (lhs, rhs) = self.generate_operand_pair(*lhs, *rhs);
                self.emit_trivial_swap(&lhs, &rhs);
                ExprValue::none()
            }

            // ── Assign ──────────────────────────────────────────────
            ExprKind::AggregateAssign { lhs, rhs, assign_exprs } => {
                self.generate_aggregate_assign(*lhs, *rhs, assign_exprs)
            }
            ExprKind::ArrayAssign { lhs, rhs, assign_expr } => self.generate_array_assign(*lhs, *rhs, *assign_expr),
            ExprKind::OptionalAssign {
                lhs,
                rhs,
                value_assign_expr,
                value_construct_expr,
                value_destruct_expr,
            } => self.generate_optional_assign(
                *lhs,
                *rhs,
                *value_assign_expr,
                *value_construct_expr,
                *value_destruct_expr,
            ),
            ExprKind::OptionalNullAssign { lhs, rhs, value_destruct_expr } => {
                self.generate_optional_null_assign(*lhs, *rhs, *value_destruct_expr)
            }
            ExprKind::OptionalValueAssign { lhs, rhs, value_assign_expr, value_construct_expr } => {
                self.generate_optional_value_assign(*lhs, *rhs, *value_assign_expr, *value_construct_expr)
            }
            ExprKind::OptionalReferenceValueAssign { lhs, rhs } => {
                let rhs = self.generate_expr(*rhs, None);
                let address = self.ctx.create_address_of(rhs);
                let lhs = self.generate_expr(*lhs, None);
                self.ctx.create_assignment(&lhs, &address);
                lhs
            }
            ExprKind::BaseTypeAssign { lhs, rhs, lhs_destruct_expr, rhs_copy_expr } => {
                self.generate_base_type_assign(*lhs, *rhs, *lhs_destruct_expr, *rhs_copy_expr)
            }
            ExprKind::TrivialAssign { lhs, rhs } => {
                let rhs_value = self.generate_expr(*rhs, None);
                let rhs_value = if self.is_simple_expr(*lhs) { rhs_value } else { self.stabilize(rhs_value) };
                let lhs = self.generate_expr(*lhs, None);
                self.ctx.create_assignment(&lhs, &rhs_value);
                lhs
            }

            // ── Access ──────────────────────────────────────────────
            ExprKind::MemberAccess { base, index } => {
                let module = self.module;
                let base_ty = &module.expr(*base).ty;
                self.complete_type_of(*base);
                let base = self.generate_expr(*base, None);
                self.member_value(&base, base_ty, *index)
            }
            ExprKind::RvalueMemberAccess { base, index, member_refs } => {
                self.generate_rvalue_member_access(*base, *index, member_refs, &expr.ty, dest)
            }
            ExprKind::OptionalExtractValue { optional_value, value_move_expr } => {
                self.generate_optional_extract_value(*optional_value, *value_move_expr, &expr.ty, dest)
            }
            ExprKind::Subscript { base, index } => self.generate_subscript(*base, *index),
            ExprKind::RvalueArraySubscript { base, index, elem_destruct_op } => {
                let array = self.generate_expr(*base, None);
                let array = self.ctx.materialize(array);
                let index = self.generate_expr(*index, None);
                let elem = self.ctx.create_array_gep(&array, &index);
                let elem_address = self.ctx.create_address_of(elem);
                let elem = self.ctx.create_dereference(&elem_address);
                let elem_ptr = self.ctx.create_address_of(elem);
                self.ctx.push_rvalue_array_destruct_operation(*elem_destruct_op, array, elem_ptr);
                elem
            }
            ExprKind::TupleSubscript { elems, index } => {
                let mut result = ExprValue::none();
                for (i, &elem) in elems.iter().enumerate() {
                    if i as u64 == *index {
                        result = self.generate_expr(elem, dest);
                    } else {
                        self.generate_expr(elem, None);
                    }
                }
                result
            }
            ExprKind::RvalueTupleSubscript { base, index, elem_refs } => {
                let index = match usize::try_from(*index) {
                    Ok(index) if index < elem_refs.len() => index,
                    _ => panic!(
                        "tuple subscript index {index} is out of range for {} elements",
                        elem_refs.len()
                    ),
                };
                self.generate_rvalue_member_access(*base, index, elem_refs, &expr.ty, dest)
            }

            // ── Control flow ────────────────────────────────────────
            ExprKind::Compound { stmts, final_expr } => self.generate_compound(expr, stmts, *final_expr, dest),
            ExprKind::If { condition, then_block, else_block } => {
                self.generate_if(expr, *condition, *then_block, *else_block, dest)
            }
            ExprKind::IfConsteval { condition, then_block, else_block } => {
                let taken = if *condition { Some(*then_block) } else { *else_block };
                match taken {
                    Some(block) => self.generate_expr(block, dest),
                    None => ExprValue::none(),
                }
            }
            ExprKind::Switch { matched, cases, default_case, is_complete } => {
                self.generate_switch(expr, *matched, cases, *default_case, *is_complete, dest)
            }
            ExprKind::Break => {
                self.generate_break();
                ExprValue::none()
            }
            ExprKind::Continue => {
                self.generate_continue();
                ExprValue::none()
            }
            ExprKind::Unreachable => {
                self.ctx.add_unreachable();
                ExprValue::none()
            }
        }
    }

    /// Generate `id` in its own expression scope.
    pub(super) fn generate_scoped(&mut self, id: ExprId, dest: Option<ExprValue>) -> ExprValue {
        let mark = self.ctx.push_expression_scope();
        let value = self.generate_expr(id, dest);
        self.pop_expression_scope(mark);
        value
    }

    /// Generate `id` in its own scope with `values` bound as value
    /// references, the last one as index 0.
    pub(super) fn generate_with_bound(&mut self, values: &[ExprValue], id: ExprId, dest: Option<ExprValue>) {
        for value in values {
            self.ctx.push_value_reference(*value);
        }
        self.generate_scoped(id, dest);
        for _ in values {
            self.ctx.pop_value_reference();
        }
    }

    // ── Operators ───────────────────────────────────────────────────

    pub(super) fn generate_unary(&mut self, op: UnaryOp, operand: ExprId, expr: &Expr) -> ExprValue {
        let value = self.generate_expr(operand, None);
        match op {
            UnaryOp::Plus => self.ctx.materialize(value),
            UnaryOp::Minus | UnaryOp::BitNot | UnaryOp::BoolNot => {
                let ty = self.get_type(&expr.ty);
                let c_op = match op {
                    UnaryOp::Minus => "-",
                    UnaryOp::BitNot => "~",
                    _ => "!",
                };
                self.ctx.create_unary_operation(&value, c_op, ty)
            }
            UnaryOp::Dereference => {
                // Completes the pointee if only forward declared so far.
                self.get_type(&expr.ty);
                self.ctx.create_dereference(&value)
            }
            UnaryOp::AddressOf => self.ctx.create_address_of(value),
            UnaryOp::PlusPlus => {
                self.ctx.create_increment(&value, "++");
                value
            }
            UnaryOp::MinusMinus => {
                self.ctx.create_increment(&value, "--");
                value
            }
            UnaryOp::Move | UnaryOp::UnsafeMove => value,
        }
    }

    pub(super) fn generate_binary(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        expr: &Expr,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        match op {
            BinaryOp::Comma => {
                self.generate_expr(lhs, None);
                self.generate_expr(rhs, dest)
            }
            BinaryOp::BoolAnd | BinaryOp::BoolOr => {
                let lhs = self.generate_expr(lhs, None);
                let result = self.ctx.add_value_expression(&lhs);
                if op == BinaryOp::BoolAnd {
                    self.ctx.begin_if(&result);
                } else {
                    self.ctx.begin_if_not(&result);
                }
                let mark = self.ctx.push_expression_scope();
                let rhs = self.generate_expr(rhs, None);
                self.ctx.create_assignment(&result, &rhs);
                self.pop_expression_scope(mark);
                self.ctx.end_if();
                result
            }
            _ if op.is_compound_assign() => {
                let rhs_value = self.generate_expr(rhs, None);
                let rhs_value = if self.is_simple_expr(lhs) { rhs_value } else { self.stabilize(rhs_value) };
                let lhs = self.generate_expr(lhs, None);
                self.ctx.create_compound_assignment(&lhs, &rhs_value, compound_assign_operator(op));
                lhs
            }
            _ => {
                let (c_op, prec) = binary_operator(op);
                let lhs_value = self.generate_expr(lhs, None);
                let lhs_value = if self.is_simple_expr(rhs) { lhs_value } else { self.stabilize(lhs_value) };
                let rhs = self.generate_expr(rhs, None);
                let ty = self.get_type(&expr.ty);
                self.ctx.create_binary_operation(&lhs_value, &rhs, c_op, prec, ty)
            }
        }
    }

    // ── Conversions ─────────────────────────────────────────────────

    fn generate_cast(&mut self, inner: ExprId, target: &Typespec) -> ExprValue {
        let module = self.module;
        let source = &module.expr(inner).ty;
        let value = self.generate_expr(inner, None);
        let ty = self.get_type(target);
        match (source, target) {
            (Typespec::Array { size, .. }, Typespec::Slice { .. }) => {
                let value = self.ctx.materialize(value);
                let begin = self.ctx.create_array_data_pointer(&value);
                let count = self.ctx.create_integer_constant(self.ctx.size_type(), *size);
                let end_text = self.ctx.render_binary(&begin, "+", &count, Precedence::Addition);
                let end = self.ctx.make_rvalue(end_text, begin.ty, Precedence::Addition);
                self.ctx.create_struct_literal(ty, &[begin, end])
            }
            (Typespec::Slice { .. }, Typespec::Slice { .. }) if value.ty != ty => {
                let value = self.ctx.materialize(value);
                let begin = self.ctx.create_struct_gep(&value, 0);
                let end = self.ctx.create_struct_gep(&value, 1);
                self.ctx.create_struct_literal(ty, &[begin, end])
            }
            _ if value.ty == ty => value,
            _ => self.ctx.create_cast(&value, ty),
        }
    }

    fn generate_bit_cast(&mut self, inner: ExprId, target: &Typespec, dest: Option<ExprValue>) -> ExprValue {
        let value = self.generate_expr(inner, None);
        let ty = self.get_type(target);
        if value.ty.is_address() && ty.is_address() {
            return self.ctx.create_cast(&value, ty);
        }
        let value = self.ctx.materialize(value);
        let result = match dest {
            Some(dest) => dest,
            None => self.ctx.add_uninitialized_value(ty),
        };
        self.ctx.add_include("string.h");
        let line = format!(
            "memcpy({}, {}, sizeof ({}));",
            self.ctx.render_address(&result),
            self.ctx.render_address(&value),
            self.ctx.type_name(ty)
        );
        self.ctx.add_line(&line);
        result
    }

    fn generate_optional_cast(&mut self, inner: ExprId, target: &Typespec, dest: Option<ExprValue>) -> ExprValue {
        if target.is_optional_reference() {
            let value = self.generate_expr(inner, None);
            return self.ctx.create_address_of(value);
        }
        if target.is_optional_pointer_like() {
            return self.generate_expr(inner, dest);
        }
        let result = self.result_storage(dest, target);
        let payload = self.ctx.create_struct_gep(&result, 0);
        self.generate_expr(inner, Some(payload));
        self.set_optional_has_value(&result, true);
        result
    }

    // ── Construction ────────────────────────────────────────────────

    /// Tuple literals and aggregate initialization: one expression per
    /// member. Reference members store the address of their initializer.
    fn generate_member_init(&mut self, exprs: &[ExprId], ty: &Typespec, dest: Option<ExprValue>) -> ExprValue {
        let result = self.result_storage(dest, ty);
        for (i, &init) in exprs.iter().enumerate() {
            let member = self.ctx.create_struct_gep(&result, i);
            if self.member_typespec(ty, i).is_any_reference() {
                let value = self.generate_expr(init, None);
                let address = self.ctx.create_address_of(value);
                self.ctx.create_assignment(&member, &address);
            } else {
                self.generate_expr(init, Some(member));
            }
        }
        result
    }

    fn generate_array_value_init(
        &mut self,
        value: ExprId,
        copy_expr: ExprId,
        ty: &Typespec,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let result = self.result_storage(dest, ty);
        let value = self.generate_expr(value, None);
        let value = self.ctx.materialize(value);
        let size = self.ctx.array_shape(result.ty).size;
        let index = self.ctx.begin_index_loop(size);
        let elem = self.ctx.create_array_gep(&result, &index);
        self.generate_with_bound(&[value], copy_expr, Some(elem));
        self.ctx.end_index_loop(&index);
        result
    }

    // ── Access ──────────────────────────────────────────────────────

    fn generate_subscript(&mut self, base: ExprId, index: ExprId) -> ExprValue {
        let base_ty = self.module.expr(base).ty.clone();
        self.get_type(&base_ty);
        let base = self.generate_expr(base, None);
        match &base_ty {
            Typespec::Array { .. } => {
                let index = self.generate_expr(index, None);
                self.ctx.create_array_gep(&base, &index)
            }
            Typespec::Slice { .. } => {
                let begin = self.ctx.create_struct_gep(&base, 0);
                let index = self.generate_expr(index, None);
                self.ctx.create_pointer_subscript(&begin, &index)
            }
            Typespec::Pointer { .. } => {
                let index = self.generate_expr(index, None);
                self.ctx.create_pointer_subscript(&base, &index)
            }
            Typespec::Tuple(_) => {
                let position = match &self.module.expr(index).kind {
                    ExprKind::Constant(bz_ir::ConstantValue::Uint(n)) => usize::try_from(*n).ok(),
                    ExprKind::Constant(bz_ir::ConstantValue::Sint(n)) => usize::try_from(*n).ok(),
                    _ => None,
                };
                match position {
                    Some(position) => self.member_value(&base, &base_ty, position),
                    None => panic!("tuple subscript with a non-constant index"),
                }
            }
            other => panic!("subscript of non-indexable type {other:?}"),
        }
    }

    /// Moves one member out of an rvalue and destroys the others right
    /// away.
    fn generate_rvalue_member_access(
        &mut self,
        base: ExprId,
        index: usize,
        member_refs: &[Option<ExprId>],
        ty: &Typespec,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let base_ty = self.module.expr(base).ty.clone();
        let base = self.generate_expr(base, None);
        let base = self.ctx.materialize(base);

        let member_is_reference = self.member_typespec(&base_ty, index).is_any_reference();
        let result = match member_refs.get(index).copied().flatten() {
            Some(move_expr) if !member_is_reference => {
                let result = self.result_storage(dest, ty);
                let member = self.ctx.create_struct_gep(&base, index);
                self.generate_with_bound(&[member], move_expr, Some(result));
                result
            }
            _ => self.member_value(&base, &base_ty, index),
        };
        for (i, member_ref) in member_refs.iter().enumerate() {
            if i == index {
                continue;
            }
            if let Some(destruct) = member_ref {
                let member = self.ctx.create_struct_gep(&base, i);
                self.generate_with_bound(&[member], *destruct, None);
            }
        }
        result
    }

    fn generate_optional_extract_value(
        &mut self,
        optional_value: ExprId,
        value_move_expr: Option<ExprId>,
        ty: &Typespec,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let optional_ty = self.module.expr(optional_value).ty.clone();
        let optional = self.generate_expr(optional_value, None);
        let optional = self.ctx.materialize(optional);
        self.check_optional_has_value(&optional, &optional_ty);
        let payload = self.optional_value(&optional, &optional_ty);
        match value_move_expr {
            Some(move_expr) => {
                let result = self.result_storage(dest, ty);
                self.generate_with_bound(&[payload], move_expr, Some(result));
                result
            }
            None => payload,
        }
    }
}
