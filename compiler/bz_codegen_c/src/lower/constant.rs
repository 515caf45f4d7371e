//! Compile-time constants and global initializers.
//!
//! Constants render as C literal text. Inside function bodies compound
//! values are compound literals `(T){ a, b, }`; global initializers use the
//! plain brace form, which every C compiler accepts in static storage.

use bz_ir::{BuiltinKind, ConstantValue, ExprKind, Typespec, VarId};

use super::Lowerer;
use crate::value::{ExprValue, Precedence};

/// `i64::MIN` has no literal spelling in C.
fn sint_text(value: i64) -> String {
    if value == i64::MIN {
        "(-9223372036854775807 - 1)".to_string()
    } else {
        value.to_string()
    }
}

#[expect(
    clippy::cast_possible_wrap,
    reason = "enumerator bits are reinterpreted through the signed underlying type"
)]
fn enum_text(value: u64, underlying: BuiltinKind) -> String {
    if underlying.is_signed_integer() {
        sint_text(value as i64)
    } else {
        format!("{value}u")
    }
}

fn char_text(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '"' => "'\\\"'".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\x07' => "'\\a'".to_string(),
        '\x08' => "'\\b'".to_string(),
        '\x0c' => "'\\f'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\x0b' => "'\\v'".to_string(),
        c if c.is_ascii_control() => format!("'\\x{:02x}'", u32::from(c)),
        c if c.is_ascii() => format!("'{c}'"),
        c => format!("0x{:04x}", u32::from(c)),
    }
}

/// Precedence of rendered constant text.
fn constant_precedence(text: &str) -> Precedence {
    if text.starts_with('-') || text.starts_with("(void)") {
        Precedence::Prefix
    } else if text.starts_with('(') && text.ends_with('}') {
        Precedence::Suffix
    } else {
        Precedence::Literal
    }
}

fn array_elem_type(ty: &Typespec) -> (&Typespec, u64) {
    match ty {
        Typespec::Array { elem, size } => (elem, *size),
        other => panic!("array constant of non-array type {other:?}"),
    }
}

impl Lowerer<'_> {
    pub(super) fn generate_constant(&mut self, value: &ConstantValue, ty: &Typespec) -> ExprValue {
        let text = self.constant_text(value, ty, true);
        let c_type = self.get_type(ty);
        let prec = constant_precedence(&text);
        self.ctx.make_rvalue(text, c_type, prec)
    }

    /// A `str` constant.
    pub(super) fn string_value(&mut self, s: &str) -> ExprValue {
        self.generate_constant(&ConstantValue::Str(s.to_string()), &Typespec::Str)
    }

    /// Define a global variable with its constant initializer.
    pub(super) fn generate_global(&mut self, var: VarId) {
        let module = self.module;
        let decl = module.var(var);
        let ty = self.get_type(&decl.ty);
        let initializer = match decl.init.map(|init| &module.expr(init).kind) {
            Some(ExprKind::Constant(value)) => self.constant_text(value, &decl.ty, false),
            Some(_) => panic!("global `{}` has a non-constant initializer", decl.name),
            None if ty.as_struct().is_some() || ty.as_array().is_some() => "{0}".to_string(),
            None => "0".to_string(),
        };
        self.ctx.add_global(var, ty, &initializer);
        tracing::debug!(name = %decl.name, "global defined");
    }

    /// `(T){ ... }`, or `{ ... }` in a static initializer.
    fn braced(&mut self, ty: &Typespec, elems: &[String], compound: bool) -> String {
        let prefix = if compound {
            let c_type = self.get_type(ty);
            format!("({})", self.ctx.type_name(c_type))
        } else {
            String::new()
        };
        if elems.is_empty() {
            return format!("{prefix}{{0}}");
        }
        let mut text = format!("{prefix}{{ ");
        for elem in elems {
            text.push_str(elem);
            text.push_str(", ");
        }
        text.push('}');
        text
    }

    fn float_text(&mut self, value: f64, repr: String, suffix: &str) -> String {
        if value.is_nan() {
            self.ctx.add_include("math.h");
            "NAN".to_string()
        } else if value.is_infinite() {
            self.ctx.add_include("math.h");
            let text = if value < 0.0 { "-INFINITY" } else { "INFINITY" };
            text.to_string()
        } else {
            format!("{repr}{suffix}")
        }
    }

    pub(super) fn constant_text(&mut self, value: &ConstantValue, ty: &Typespec, compound: bool) -> String {
        if let Typespec::Optional(payload) = ty {
            if *value != ConstantValue::Null {
                let payload_text = self.constant_text(value, payload, compound);
                return if ty.is_optional_pointer_like() {
                    payload_text
                } else {
                    self.braced(ty, &[payload_text, "1".to_string()], compound)
                };
            }
        }
        match value {
            ConstantValue::Sint(v) => sint_text(*v),
            ConstantValue::Uint(v) => format!("{v}u"),
            ConstantValue::Float32(v) => self.float_text(f64::from(*v), format!("{v:?}"), "f"),
            ConstantValue::Float64(v) => self.float_text(*v, format!("{v:?}"), ""),
            ConstantValue::Char(c) => char_text(*c),
            ConstantValue::Str(s) => {
                let storage = self.ctx.create_cstring(s);
                let elems = [storage.clone(), format!("{storage} + {}", s.len())];
                self.braced(&Typespec::Str, &elems, compound)
            }
            ConstantValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            ConstantValue::Null => {
                if ty.is_optional_pointer_like() {
                    "0".to_string()
                } else {
                    self.braced(ty, &[], compound)
                }
            }
            ConstantValue::Void => "(void)0".to_string(),
            ConstantValue::Enum(v) => match ty {
                Typespec::Enum { underlying } => enum_text(*v, *underlying),
                other => panic!("enum constant of non-enum type {other:?}"),
            },
            ConstantValue::Array(_)
            | ConstantValue::SintArray(_)
            | ConstantValue::UintArray(_)
            | ConstantValue::Float32Array(_)
            | ConstantValue::Float64Array(_)
                if value.is_zero() =>
            {
                self.braced(ty, &[], compound)
            }
            ConstantValue::Array(values) => {
                let (elem, _) = array_elem_type(ty);
                let elems: Vec<String> = values
                    .iter()
                    .map(|value| self.constant_text(value, elem, compound))
                    .collect();
                self.braced(ty, &elems, compound)
            }
            ConstantValue::SintArray(values) => {
                self.numeric_array_text(values.as_slice(), ty, compound, &|v: &i64| sint_text(*v))
            }
            ConstantValue::UintArray(values) => {
                self.numeric_array_text(values.as_slice(), ty, compound, &|v: &u64| format!("{v}u"))
            }
            ConstantValue::Float32Array(values) => {
                let values: Vec<String> = values
                    .iter()
                    .map(|v| self.float_text(f64::from(*v), format!("{v:?}"), "f"))
                    .collect();
                self.numeric_array_text(values.as_slice(), ty, compound, &String::clone)
            }
            ConstantValue::Float64Array(values) => {
                let values: Vec<String> = values
                    .iter()
                    .map(|v| self.float_text(*v, format!("{v:?}"), ""))
                    .collect();
                self.numeric_array_text(values.as_slice(), ty, compound, &String::clone)
            }
            ConstantValue::Tuple(values) => {
                let Typespec::Tuple(elem_types) = ty else {
                    panic!("tuple constant of non-tuple type {ty:?}");
                };
                let elems: Vec<String> = values
                    .iter()
                    .zip(elem_types)
                    .map(|(value, elem_ty)| self.constant_text(value, elem_ty, compound))
                    .collect();
                self.braced(ty, &elems, compound)
            }
            ConstantValue::Aggregate(values) => {
                let Typespec::Aggregate(id) = ty else {
                    panic!("aggregate constant of non-aggregate type {ty:?}");
                };
                let module = self.module;
                let members = &module.type_info(*id).members;
                let elems: Vec<String> = values
                    .iter()
                    .zip(members)
                    .map(|(value, member)| self.constant_text(value, &member.ty, compound))
                    .collect();
                self.braced(ty, &elems, compound)
            }
            ConstantValue::Function(func) => self.ensure_function_declared(*func),
        }
    }

    /// Flattened row-major values of a possibly nested array type.
    fn numeric_array_text<T>(
        &mut self,
        values: &[T],
        ty: &Typespec,
        compound: bool,
        render: &dyn Fn(&T) -> String,
    ) -> String {
        if values.is_empty() {
            return self.braced(ty, &[], compound);
        }
        let (elem, size) = array_elem_type(ty);
        let elems: Vec<String> = if matches!(elem, Typespec::Array { .. }) {
            let size = usize::try_from(size).unwrap_or(usize::MAX).max(1);
            let stride = (values.len() / size).max(1);
            values
                .chunks(stride)
                .map(|chunk| self.numeric_array_text(chunk, elem, compound, render))
                .collect()
        } else {
            values.iter().map(render).collect()
        };
        self.braced(ty, &elems, compound)
    }
}
