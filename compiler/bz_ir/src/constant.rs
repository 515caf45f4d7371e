//! Compile-time constant values.

use crate::FuncId;

/// A value folded by the semantic pass.
///
/// The numeric array variants store the elements of (possibly nested) arrays
/// of one scalar type flattened in row-major order.
#[derive(Clone, PartialEq, Debug)]
pub enum ConstantValue {
    Sint(i64),
    Uint(u64),
    Float32(f32),
    Float64(f64),
    Char(char),
    Str(String),
    Bool(bool),
    /// The empty optional.
    Null,
    Void,
    /// Enumerator value, reinterpreted through the enum's underlying type.
    Enum(u64),
    Array(Vec<ConstantValue>),
    SintArray(Vec<i64>),
    UintArray(Vec<u64>),
    Float32Array(Vec<f32>),
    Float64Array(Vec<f64>),
    Tuple(Vec<ConstantValue>),
    Aggregate(Vec<ConstantValue>),
    /// Address of a function.
    Function(FuncId),
}

impl ConstantValue {
    /// Whether every byte of the value is zero.
    ///
    /// Floats compare by bit pattern, so `-0.0` is not zero.
    pub fn is_zero(&self) -> bool {
        match self {
            ConstantValue::Sint(v) => *v == 0,
            ConstantValue::Uint(v) | ConstantValue::Enum(v) => *v == 0,
            ConstantValue::Float32(v) => v.to_bits() == 0,
            ConstantValue::Float64(v) => v.to_bits() == 0,
            ConstantValue::Char(c) => *c == '\0',
            ConstantValue::Str(s) => s.is_empty(),
            ConstantValue::Bool(b) => !*b,
            ConstantValue::Null | ConstantValue::Void => true,
            ConstantValue::Array(values)
            | ConstantValue::Tuple(values)
            | ConstantValue::Aggregate(values) => values.iter().all(ConstantValue::is_zero),
            ConstantValue::SintArray(values) => values.iter().all(|v| *v == 0),
            ConstantValue::UintArray(values) => values.iter().all(|v| *v == 0),
            ConstantValue::Float32Array(values) => values.iter().all(|v| v.to_bits() == 0),
            ConstantValue::Float64Array(values) => values.iter().all(|v| v.to_bits() == 0),
            ConstantValue::Function(_) => false,
        }
    }
}
