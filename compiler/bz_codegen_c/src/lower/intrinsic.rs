//! Compiler-provided functions.
//!
//! Every [`Intrinsic`] maps to a C operator, a libc or GCC builtin call, or
//! a short statement sequence. Compile-time-only intrinsics never survive
//! constant evaluation and reaching one here is an internal error.

use bz_ir::{BuiltinKind, Expr, ExprId, Intrinsic, MathFn, Typespec};

use super::Lowerer;
use crate::value::{ExprValue, Precedence};

/// The unsigned builtin of the same width.
fn unsigned_kind(width: u32) -> BuiltinKind {
    match width {
        8 => BuiltinKind::U8,
        16 => BuiltinKind::U16,
        32 => BuiltinKind::U32,
        64 => BuiltinKind::U64,
        _ => unreachable!("no {width} bit integer type"),
    }
}

/// `__builtin_*` suffix and operand width for a `width` bit operand.
fn builtin_suffix(width: u32) -> (&'static str, u32) {
    if width <= 32 { ("", 32) } else { ("ll", 64) }
}

fn arity<const N: usize>(intrinsic: Intrinsic, args: &[ExprId]) -> [ExprId; N] {
    <[ExprId; N]>::try_from(args).unwrap_or_else(|_| {
        panic!("{intrinsic:?} takes {N} arguments, got {}", args.len())
    })
}

impl Lowerer<'_> {
    pub(super) fn generate_intrinsic_call(
        &mut self,
        intrinsic: Intrinsic,
        expr: &Expr,
        args: &[ExprId],
        dest: Option<ExprValue>,
    ) -> ExprValue {
        tracing::trace!(?intrinsic, "lowering intrinsic call");
        match intrinsic {
            Intrinsic::UnaryOperator(op) => {
                let [operand] = arity(intrinsic, args);
                self.generate_unary(op, operand, expr)
            }
            Intrinsic::BinaryOperator(op) => {
                let [lhs, rhs] = arity(intrinsic, args);
                self.generate_binary(op, lhs, rhs, expr, dest)
            }

            Intrinsic::StrBeginPtr | Intrinsic::SliceBeginPtr | Intrinsic::RangeBegin => {
                let [value] = self.intrinsic_values(intrinsic, args);
                let value = self.ctx.materialize(value);
                self.ctx.create_struct_gep(&value, 0)
            }
            Intrinsic::StrEndPtr | Intrinsic::SliceEndPtr | Intrinsic::RangeEnd => {
                let [value] = self.intrinsic_values(intrinsic, args);
                let value = self.ctx.materialize(value);
                self.ctx.create_struct_gep(&value, 1)
            }
            Intrinsic::StrSize | Intrinsic::SliceSize | Intrinsic::RangeSize => {
                let [value] = self.intrinsic_values(intrinsic, args);
                self.member_distance(value, expr)
            }
            Intrinsic::StrFromPtrs | Intrinsic::SliceFromPtrs | Intrinsic::RangeMake => {
                let values = self.generate_intrinsic_args(args);
                let ty = self.get_type(&expr.ty);
                self.ctx.create_struct_literal(ty, &values)
            }
            Intrinsic::ArrayBeginPtr => {
                let [array] = self.intrinsic_values(intrinsic, args);
                let array = self.ctx.materialize(array);
                self.ctx.create_array_data_pointer(&array)
            }
            Intrinsic::ArrayEndPtr => {
                let [array] = self.intrinsic_values(intrinsic, args);
                let array = self.ctx.materialize(array);
                let begin = self.ctx.create_array_data_pointer(&array);
                let size = self.ctx.array_shape(array.ty).size;
                let size = self.ctx.create_integer_constant(self.ctx.size_type(), size);
                let text = self.ctx.render_binary(&begin, "+", &size, Precedence::Addition);
                self.ctx.make_rvalue(text, begin.ty, Precedence::Addition)
            }

            Intrinsic::Memcpy | Intrinsic::Memmove | Intrinsic::Memset => {
                let values = self.generate_intrinsic_args(args);
                self.ctx.add_include("string.h");
                let name = match intrinsic {
                    Intrinsic::Memcpy => "memcpy",
                    Intrinsic::Memmove => "memmove",
                    _ => "memset",
                };
                self.library_call(name, &values, expr)
            }
            Intrinsic::PointerCast | Intrinsic::IntToPointer | Intrinsic::PointerToInt => {
                let [value] = self.intrinsic_values(intrinsic, args);
                let ty = self.get_type(&expr.ty);
                self.ctx.create_cast(&value, ty)
            }

            Intrinsic::OptionalGetValue => {
                let [optional] = arity(intrinsic, args);
                let ty = self.module.expr(optional).ty.remove_any_reference().clone();
                let value = self.generate_expr(optional, None);
                let value = self.ctx.materialize(value);
                self.check_optional_has_value(&value, &ty);
                self.optional_value(&value, &ty)
            }
            Intrinsic::IsOptionSet => {
                let [optional] = arity(intrinsic, args);
                let ty = self.module.expr(optional).ty.remove_any_reference().clone();
                let value = self.generate_expr(optional, None);
                let value = self.ctx.materialize(value);
                self.optional_has_value(&value, &ty)
            }

            Intrinsic::Panic => {
                let [message] = self.intrinsic_values(intrinsic, args);
                self.ctx.add_panic(&message);
                ExprValue::none()
            }
            Intrinsic::IsComptime => {
                let ty = self.get_type(&expr.ty);
                self.ctx.create_integer_constant(ty, 0)
            }
            Intrinsic::TrivialSwap => {
                let [lhs, rhs] = arity(intrinsic, args);
                let (lhs, rhs) = self.generate_operand_pair(lhs, rhs);
                self.emit_trivial_swap(&lhs, &rhs);
                ExprValue::none()
            }

            Intrinsic::Clz | Intrinsic::Ctz | Intrinsic::Popcount => {
                let [operand] = arity(intrinsic, args);
                self.generate_bit_count(intrinsic, operand, expr)
            }
            Intrinsic::Byteswap => {
                let [operand] = arity(intrinsic, args);
                let (width, value) = self.generate_unsigned_operand(operand);
                let ty = self.get_type(&expr.ty);
                if width == 8 {
                    return self.ctx.create_cast(&value, ty);
                }
                let text = format!("__builtin_bswap{width}({})", self.ctx.render(&value));
                self.ctx.make_rvalue(text, ty, Precedence::Suffix)
            }
            Intrinsic::Bitreverse => {
                let [operand] = arity(intrinsic, args);
                self.generate_bitreverse(operand, expr)
            }
            Intrinsic::Fshl | Intrinsic::Fshr => {
                let [lhs, rhs, shift] = arity(intrinsic, args);
                self.generate_funnel_shift(intrinsic == Intrinsic::Fshl, lhs, rhs, shift, expr)
            }

            Intrinsic::Math(function) => self.generate_math_call(function, args, expr),
            Intrinsic::Comptime(comptime) => {
                panic!("compile-time intrinsic {comptime:?} reached code generation")
            }
        }
    }

    // ── Arguments ───────────────────────────────────────────────────

    /// Arguments left to right; each value is pinned in a local when a
    /// later argument could change it.
    fn generate_intrinsic_args(&mut self, args: &[ExprId]) -> Vec<ExprValue> {
        let mut values = Vec::with_capacity(args.len());
        for (i, &arg) in args.iter().enumerate() {
            let value = self.generate_expr(arg, None);
            let later_are_simple = args[i + 1..].iter().all(|&later| self.is_simple_expr(later));
            values.push(if later_are_simple { value } else { self.stabilize(value) });
        }
        values
    }

    fn intrinsic_values<const N: usize>(&mut self, intrinsic: Intrinsic, args: &[ExprId]) -> [ExprValue; N] {
        let args: [ExprId; N] = arity(intrinsic, args);
        let values = self.generate_intrinsic_args(&args);
        values
            .try_into()
            .unwrap_or_else(|_: Vec<ExprValue>| unreachable!("one value per argument"))
    }

    fn integer_kind(&self, operand: ExprId) -> BuiltinKind {
        let ty = self.module.expr(operand).ty.remove_any_reference();
        match ty.builtin_kind() {
            Some(kind) if kind.is_integer() => kind,
            _ => panic!("bit operation on non-integer type {ty:?}"),
        }
    }

    /// The operand converted to the unsigned type of its width, in a fresh
    /// local the caller may modify.
    fn generate_unsigned_operand(&mut self, operand: ExprId) -> (u32, ExprValue) {
        let kind = self.integer_kind(operand);
        let width = kind.bit_width();
        let value = self.generate_expr(operand, None);
        let value = if kind.is_unsigned_integer() {
            value
        } else {
            let unsigned = self.ctx.builtin(unsigned_kind(width));
            self.ctx.create_cast(&value, unsigned)
        };
        (width, self.ctx.add_value_expression(&value))
    }

    /// `end - begin` of a two-member struct, converted to the result type.
    fn member_distance(&mut self, value: ExprValue, expr: &Expr) -> ExprValue {
        let value = self.ctx.materialize(value);
        let begin = self.ctx.create_struct_gep(&value, 0);
        let end = self.ctx.create_struct_gep(&value, 1);
        let text = self.ctx.render_binary(&end, "-", &begin, Precedence::Addition);
        let ty = self.get_type(&expr.ty);
        let difference = self.ctx.make_rvalue(text, ty, Precedence::Addition);
        self.ctx.create_cast(&difference, ty)
    }

    /// `name(args)` as a statement for `void` results, otherwise in a local.
    fn library_call(&mut self, name: &str, values: &[ExprValue], expr: &Expr) -> ExprValue {
        let args: Vec<String> = values.iter().map(|value| self.ctx.render_initializer(value)).collect();
        let call = self.ctx.render_call(name, &args);
        if expr.ty.is_void() {
            self.ctx.add_expression_statement(&call);
            ExprValue::none()
        } else {
            let ty = self.get_type(&expr.ty);
            self.ctx.add_value_text(ty, &call)
        }
    }

    // ── Bit manipulation ────────────────────────────────────────────

    /// `clz`/`ctz` of zero give the bit width instead of the undefined
    /// builtin result.
    fn generate_bit_count(&mut self, intrinsic: Intrinsic, operand: ExprId, expr: &Expr) -> ExprValue {
        let (width, value) = self.generate_unsigned_operand(operand);
        let (suffix, promoted) = builtin_suffix(width);
        let v = self.ctx.render(&value);
        let (text, prec) = match intrinsic {
            Intrinsic::Clz => {
                let call = format!("__builtin_clz{suffix}({v})");
                let call = if promoted > width {
                    format!("{call} - {}", promoted - width)
                } else {
                    call
                };
                (format!("{v} == 0 ? {width} : {call}"), Precedence::Assignment)
            }
            Intrinsic::Ctz => (
                format!("{v} == 0 ? {width} : __builtin_ctz{suffix}({v})"),
                Precedence::Assignment,
            ),
            _ => (format!("__builtin_popcount{suffix}({v})"), Precedence::Suffix),
        };
        let ty = self.get_type(&expr.ty);
        self.ctx.make_rvalue(text, ty, prec)
    }

    /// A shift loop; C has no portable bit reversal.
    fn generate_bitreverse(&mut self, operand: ExprId, expr: &Expr) -> ExprValue {
        let (width, value) = self.generate_unsigned_operand(operand);
        let unsigned = value.ty;
        let unsigned_name = self.ctx.type_name(unsigned);
        let result = self.ctx.create_zero_value(unsigned);
        let result = self.ctx.add_value_expression(&result);

        let index = self.ctx.begin_index_loop(u64::from(width));
        let (r, v) = (self.ctx.render(&result), self.ctx.render(&value));
        let shifted_in = self
            .ctx
            .make_rvalue(format!("({unsigned_name})(({r} << 1) | ({v} & 1u))"), unsigned, Precedence::Prefix);
        self.ctx.create_assignment(&result, &shifted_in);
        let shifted_out = self
            .ctx
            .make_rvalue(format!("({unsigned_name})({v} >> 1)"), unsigned, Precedence::Prefix);
        self.ctx.create_assignment(&value, &shifted_out);
        self.ctx.end_index_loop(&index);

        let ty = self.get_type(&expr.ty);
        if ty == unsigned {
            result
        } else {
            self.ctx.create_cast(&result, ty)
        }
    }

    /// Funnel shifts concatenate `lhs:rhs` and shift by `shift` modulo the
    /// bit width; a zero shift returns one operand unchanged.
    fn generate_funnel_shift(
        &mut self,
        is_left: bool,
        lhs: ExprId,
        rhs: ExprId,
        shift: ExprId,
        expr: &Expr,
    ) -> ExprValue {
        let (width, lhs) = self.generate_unsigned_operand(lhs);
        let (_, rhs) = self.generate_unsigned_operand(rhs);
        let (_, shift) = self.generate_unsigned_operand(shift);
        let modulus = self.ctx.create_integer_constant(shift.ty, u64::from(width));
        self.ctx.create_compound_assignment(&shift, &modulus, "%=");

        let unsigned_name = self.ctx.type_name(lhs.ty);
        let (a, b, s) = (self.ctx.render(&lhs), self.ctx.render(&rhs), self.ctx.render(&shift));
        let text = if is_left {
            format!("{s} == 0 ? {a} : ({unsigned_name})(({a} << {s}) | ({b} >> ({width} - {s})))")
        } else {
            format!("{s} == 0 ? {b} : ({unsigned_name})(({a} << ({width} - {s})) | ({b} >> {s}))")
        };
        let ty = self.get_type(&expr.ty);
        self.ctx.make_rvalue(text, ty, Precedence::Assignment)
    }

    // ── Math ────────────────────────────────────────────────────────

    fn generate_math_call(&mut self, function: MathFn, args: &[ExprId], expr: &Expr) -> ExprValue {
        let Some(&first) = args.first() else {
            panic!("{function:?} called without arguments");
        };
        let kind = match self.module.expr(first).ty.remove_any_reference() {
            Typespec::Builtin(kind) => *kind,
            other => panic!("{function:?} on non-numeric type {other:?}"),
        };
        let values = self.generate_intrinsic_args(args);

        if kind.is_float() {
            self.ctx.add_include("math.h");
            let name = if kind == BuiltinKind::F32 && !function.is_classification() {
                format!("{}f", function.c_name())
            } else {
                function.c_name().to_string()
            };
            return self.library_call(&name, &values, expr);
        }

        // Integer abs/min/max read each operand twice.
        let values: Vec<ExprValue> = values
            .into_iter()
            .map(|value| {
                if value.is_variable() {
                    value
                } else {
                    self.ctx.add_value_expression(&value)
                }
            })
            .collect();
        let ty = self.get_type(&expr.ty);
        let text = match (function, values.as_slice()) {
            (MathFn::Abs, [value]) => {
                let v = self.ctx.render(value);
                format!("{v} < 0 ? -{v} : {v}")
            }
            (MathFn::Min, [lhs, rhs]) => {
                let (a, b) = (self.ctx.render(lhs), self.ctx.render(rhs));
                format!("{a} < {b} ? {a} : {b}")
            }
            (MathFn::Max, [lhs, rhs]) => {
                let (a, b) = (self.ctx.render(lhs), self.ctx.render(rhs));
                format!("{a} > {b} ? {a} : {b}")
            }
            _ => panic!("{function:?} on integer operands"),
        };
        self.ctx.make_rvalue(text, ty, Precedence::Assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_counterparts() {
        assert_eq!(unsigned_kind(8), BuiltinKind::U8);
        assert_eq!(unsigned_kind(64), BuiltinKind::U64);
        assert_eq!(builtin_suffix(16), ("", 32));
        assert_eq!(builtin_suffix(64), ("ll", 64));
    }
}
