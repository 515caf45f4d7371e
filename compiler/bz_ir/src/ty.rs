//! Source-level types as seen by the backend.
//!
//! By the time a [`Typespec`] reaches code generation every `auto`, generic
//! parameter and alias has been resolved. What remains is a closed tree of
//! structural type constructors over builtins and declared aggregates.

use crate::TypeInfoId;

/// Fixed-size scalar types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BuiltinKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// A unicode code point, stored as `u32`.
    Char,
    Bool,
}

impl BuiltinKind {
    /// All builtins, in the order their C typedefs are registered.
    pub const ALL: [BuiltinKind; 12] = [
        BuiltinKind::I8,
        BuiltinKind::I16,
        BuiltinKind::I32,
        BuiltinKind::I64,
        BuiltinKind::U8,
        BuiltinKind::U16,
        BuiltinKind::U32,
        BuiltinKind::U64,
        BuiltinKind::F32,
        BuiltinKind::F64,
        BuiltinKind::Char,
        BuiltinKind::Bool,
    ];

    /// Size in bytes.
    pub const fn size(self) -> u32 {
        match self {
            BuiltinKind::I8 | BuiltinKind::U8 | BuiltinKind::Bool => 1,
            BuiltinKind::I16 | BuiltinKind::U16 => 2,
            BuiltinKind::I32 | BuiltinKind::U32 | BuiltinKind::F32 | BuiltinKind::Char => 4,
            BuiltinKind::I64 | BuiltinKind::U64 | BuiltinKind::F64 => 8,
        }
    }

    #[inline]
    pub const fn bit_width(self) -> u32 {
        self.size() * 8
    }

    pub const fn is_signed_integer(self) -> bool {
        matches!(
            self,
            BuiltinKind::I8 | BuiltinKind::I16 | BuiltinKind::I32 | BuiltinKind::I64
        )
    }

    pub const fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            BuiltinKind::U8 | BuiltinKind::U16 | BuiltinKind::U32 | BuiltinKind::U64
        )
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, BuiltinKind::F32 | BuiltinKind::F64)
    }

    /// Source spelling, used in diagnostics and debug output.
    pub const fn name(self) -> &'static str {
        match self {
            BuiltinKind::I8 => "int8",
            BuiltinKind::I16 => "int16",
            BuiltinKind::I32 => "int32",
            BuiltinKind::I64 => "int64",
            BuiltinKind::U8 => "uint8",
            BuiltinKind::U16 => "uint16",
            BuiltinKind::U32 => "uint32",
            BuiltinKind::U64 => "uint64",
            BuiltinKind::F32 => "float32",
            BuiltinKind::F64 => "float64",
            BuiltinKind::Char => "char",
            BuiltinKind::Bool => "bool",
        }
    }
}

/// A fully resolved source type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Typespec {
    Void,
    Builtin(BuiltinKind),
    /// UTF-8 string view: a pair of `uint8 const *`.
    Str,
    /// A declared struct type.
    Aggregate(TypeInfoId),
    /// An enum; only its underlying integer survives to codegen.
    Enum { underlying: BuiltinKind },
    Pointer { pointee: Box<Typespec>, mutable: bool },
    /// `&T` / `&mut T`.
    Reference { referenced: Box<Typespec>, mutable: bool },
    /// `move T` parameter type. Always mutable.
    MoveReference(Box<Typespec>),
    Optional(Box<Typespec>),
    Array { elem: Box<Typespec>, size: u64 },
    Slice { elem: Box<Typespec>, mutable: bool },
    Tuple(Vec<Typespec>),
    Function { return_type: Box<Typespec>, params: Vec<Typespec> },
}

impl Typespec {
    // ── Constructors ────────────────────────────────────────────────

    #[inline]
    pub fn builtin(kind: BuiltinKind) -> Self {
        Typespec::Builtin(kind)
    }

    pub fn pointer(pointee: Typespec, mutable: bool) -> Self {
        Typespec::Pointer { pointee: Box::new(pointee), mutable }
    }

    pub fn reference(referenced: Typespec, mutable: bool) -> Self {
        Typespec::Reference { referenced: Box::new(referenced), mutable }
    }

    pub fn optional(payload: Typespec) -> Self {
        Typespec::Optional(Box::new(payload))
    }

    pub fn array(elem: Typespec, size: u64) -> Self {
        Typespec::Array { elem: Box::new(elem), size }
    }

    pub fn slice(elem: Typespec, mutable: bool) -> Self {
        Typespec::Slice { elem: Box::new(elem), mutable }
    }

    pub fn function(return_type: Typespec, params: Vec<Typespec>) -> Self {
        Typespec::Function { return_type: Box::new(return_type), params }
    }

    // ── Queries ─────────────────────────────────────────────────────

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, Typespec::Void)
    }

    /// `&T`, `&mut T` or `move T`.
    #[inline]
    pub fn is_any_reference(&self) -> bool {
        matches!(self, Typespec::Reference { .. } | Typespec::MoveReference(_))
    }

    #[inline]
    pub fn is_lvalue_reference(&self) -> bool {
        matches!(self, Typespec::Reference { .. })
    }

    /// Strip one level of reference, if any.
    pub fn remove_any_reference(&self) -> &Typespec {
        match self {
            Typespec::Reference { referenced, .. } => referenced,
            Typespec::MoveReference(referenced) => referenced,
            other => other,
        }
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        matches!(self, Typespec::Pointer { .. })
    }

    pub fn builtin_kind(&self) -> Option<BuiltinKind> {
        match self {
            Typespec::Builtin(kind) => Some(*kind),
            Typespec::Enum { underlying } => Some(*underlying),
            _ => None,
        }
    }

    pub fn optional_payload(&self) -> Option<&Typespec> {
        match self {
            Typespec::Optional(payload) => Some(payload),
            _ => None,
        }
    }

    /// Optionals whose payload is already a nullable address: `?*T`, `?&T`
    /// and optional function pointers. These are represented as a bare pointer
    /// where null means empty.
    pub fn is_optional_pointer_like(&self) -> bool {
        matches!(
            self.optional_payload(),
            Some(Typespec::Pointer { .. } | Typespec::Reference { .. } | Typespec::Function { .. })
        )
    }

    /// `?&T`: extracting the value yields an lvalue of `T`.
    pub fn is_optional_reference(&self) -> bool {
        matches!(self.optional_payload(), Some(Typespec::Reference { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_properties() {
        assert_eq!(BuiltinKind::Char.size(), 4);
        assert_eq!(BuiltinKind::Bool.size(), 1);
        assert_eq!(BuiltinKind::U16.bit_width(), 16);
        assert!(BuiltinKind::I8.is_signed_integer());
        assert!(!BuiltinKind::Char.is_integer());
        assert!(BuiltinKind::F64.is_float());
        assert!(!BuiltinKind::Bool.is_unsigned_integer());
    }

    #[test]
    fn pointer_like_optionals() {
        let i32_t = Typespec::builtin(BuiltinKind::I32);
        assert!(Typespec::optional(Typespec::pointer(i32_t.clone(), false)).is_optional_pointer_like());
        assert!(Typespec::optional(Typespec::reference(i32_t.clone(), true)).is_optional_reference());
        assert!(Typespec::optional(Typespec::function(Typespec::Void, vec![])).is_optional_pointer_like());
        assert!(!Typespec::optional(i32_t.clone()).is_optional_pointer_like());
        assert!(!i32_t.is_optional_pointer_like());
    }

    #[test]
    fn remove_reference() {
        let i64_t = Typespec::builtin(BuiltinKind::I64);
        let r = Typespec::reference(i64_t.clone(), false);
        assert!(r.is_any_reference());
        assert_eq!(r.remove_any_reference(), &i64_t);
        assert_eq!(i64_t.remove_any_reference(), &i64_t);
        let m = Typespec::MoveReference(Box::new(i64_t.clone()));
        assert!(!m.is_lvalue_reference());
        assert_eq!(m.remove_any_reference(), &i64_t);
    }
}
