//! C type table.
//!
//! Every C type the backend mentions is a [`Type`]: a terminal shape plus a
//! packed chain of pointer levels. Compound shapes (structs, struct-wrapped
//! arrays, function pointer typedefs, plain typedefs) are interned in a
//! [`TypeTable`] so that structurally equal shapes share one C name.
//!
//! Interning is structural except for unresolved structs, which always
//! create a fresh entry. Declared aggregates use those so that two source
//! structs with identical members still get distinct C types.
//!
//! # Naming
//!
//! Names are assigned by the caller after registration and must be assigned
//! in registration order. The table never invents a name.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;


// ── Pointer modifiers ───────────────────────────────────────────────

/// One level of indirection.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeModifier {
    /// `T *`
    Pointer,
    /// `T const *`: the pointee is read-only.
    ConstPointer,
}

/// A stack of up to [`PointerModifiers::MAX_DEPTH`] pointer levels packed
/// into one word.
///
/// The low 6 bits hold the depth. Bit `6 + i` is set when level `i` is a
/// [`TypeModifier::ConstPointer`]. Level 0 is the innermost pointer (the one
/// applied directly to the terminal type); the top of the stack is the
/// outermost.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct PointerModifiers(u64);

impl PointerModifiers {
    const COUNT_BITS: usize = 6;
    const COUNT_MASK: u64 = (1 << Self::COUNT_BITS) - 1;

    /// Maximum nesting depth.
    pub const MAX_DEPTH: usize = 64 - Self::COUNT_BITS;

    #[inline]
    pub const fn new() -> Self {
        PointerModifiers(0)
    }

    #[inline]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "masked to 6 bits before the cast"
    )]
    pub const fn len(self) -> usize {
        (self.0 & Self::COUNT_MASK) as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Add an outermost level. Returns `false`, leaving the chain untouched,
    /// when it is already [`Self::MAX_DEPTH`] deep.
    #[must_use]
    pub fn push(&mut self, modifier: TypeModifier) -> bool {
        let count = self.len();
        if count >= Self::MAX_DEPTH {
            return false;
        }
        if modifier == TypeModifier::ConstPointer {
            self.0 |= 1 << (Self::COUNT_BITS + count);
        }
        self.0 += 1;
        true
    }

    /// Remove and return the outermost level.
    ///
    /// # Panics
    /// Panics on an empty chain.
    pub fn pop(&mut self) -> TypeModifier {
        let count = self.len();
        assert!(count > 0, "pop from an empty pointer modifier chain");
        let bit = 1u64 << (Self::COUNT_BITS + count - 1);
        let modifier = self.level(count - 1);
        self.0 &= !bit;
        self.0 -= 1;
        modifier
    }

    /// The outermost level.
    pub fn top(self) -> Option<TypeModifier> {
        match self.len() {
            0 => None,
            count => Some(self.level(count - 1)),
        }
    }

    /// Levels from innermost to outermost.
    pub fn iter(self) -> impl Iterator<Item = TypeModifier> {
        (0..self.len()).map(move |level| self.level(level))
    }

    fn level(self, level: usize) -> TypeModifier {
        if self.0 & (1 << (Self::COUNT_BITS + level)) != 0 {
            TypeModifier::ConstPointer
        } else {
            TypeModifier::Pointer
        }
    }
}

impl fmt::Debug for PointerModifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// ── Shape references ────────────────────────────────────────────────

/// Index of an interned shape in its [`ShapeSet`].
trait ShapeRef: Copy {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! define_shape_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub struct $name(u32);

        impl ShapeRef for $name {
            fn from_index(index: usize) -> Self {
                match u32::try_from(index) {
                    Ok(raw) => $name(raw),
                    Err(_) => panic!(concat!(stringify!($name), " table overflow")),
                }
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_shape_ref!(
    /// A `struct` definition.
    StructRef
);
define_shape_ref!(
    /// A struct wrapping a fixed-size C array: `struct { T a[N]; }`.
    ArrayRef
);
define_shape_ref!(
    /// A function pointer typedef: `typedef R (*t_N)(P...);`.
    FunctionRef
);
define_shape_ref!(
    /// A plain `typedef`.
    TypedefRef
);

// ── Terminals ───────────────────────────────────────────────────────

/// C's own scalar spellings. Source builtins are typedefs over these.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CScalar {
    Void,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    Bool,
}

impl CScalar {
    pub const fn c_name(self) -> &'static str {
        match self {
            CScalar::Void => "void",
            CScalar::SignedChar => "signed char",
            CScalar::UnsignedChar => "unsigned char",
            CScalar::Short => "short",
            CScalar::UnsignedShort => "unsigned short",
            CScalar::Int => "int",
            CScalar::UnsignedInt => "unsigned int",
            CScalar::Long => "long",
            CScalar::UnsignedLong => "unsigned long",
            CScalar::LongLong => "long long",
            CScalar::UnsignedLongLong => "unsigned long long",
            CScalar::Float => "float",
            CScalar::Double => "double",
            CScalar::Bool => "_Bool",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeTerminator {
    Scalar(CScalar),
    Struct(StructRef),
    Array(ArrayRef),
    Function(FunctionRef),
    Typedef(TypedefRef),
}

/// A C type: terminal shape plus pointer levels.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Type {
    pub terminator: TypeTerminator,
    pub modifiers: PointerModifiers,
}

impl Type {
    pub const fn new(terminator: TypeTerminator) -> Self {
        Type { terminator, modifiers: PointerModifiers::new() }
    }

    pub const fn void() -> Self {
        Type::new(TypeTerminator::Scalar(CScalar::Void))
    }

    #[inline]
    pub fn is_void(self) -> bool {
        self == Type::void()
    }

    #[inline]
    pub fn is_pointer(self) -> bool {
        !self.modifiers.is_empty()
    }

    /// A value of this type is an address: a pointer or a function pointer
    /// typedef.
    #[inline]
    pub fn is_address(self) -> bool {
        self.is_pointer() || matches!(self.terminator, TypeTerminator::Function(_))
    }

    /// The type one pointer level up, or `None` past the maximum depth.
    #[must_use]
    pub fn pointer_to(self, modifier: TypeModifier) -> Option<Type> {
        let mut modifiers = self.modifiers;
        modifiers.push(modifier).then_some(Type { terminator: self.terminator, modifiers })
    }

    /// Strip the outermost pointer level.
    pub fn pointee(self) -> Option<(Type, TypeModifier)> {
        if self.modifiers.is_empty() {
            return None;
        }
        let mut modifiers = self.modifiers;
        let modifier = modifiers.pop();
        Some((Type { terminator: self.terminator, modifiers }, modifier))
    }

    pub fn as_struct(self) -> Option<StructRef> {
        match (self.terminator, self.modifiers.is_empty()) {
            (TypeTerminator::Struct(r), true) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(self) -> Option<ArrayRef> {
        match (self.terminator, self.modifiers.is_empty()) {
            (TypeTerminator::Array(r), true) => Some(r),
            _ => None,
        }
    }
}

impl From<CScalar> for Type {
    fn from(scalar: CScalar) -> Self {
        Type::new(TypeTerminator::Scalar(scalar))
    }
}

impl From<StructRef> for Type {
    fn from(r: StructRef) -> Self {
        Type::new(TypeTerminator::Struct(r))
    }
}

impl From<ArrayRef> for Type {
    fn from(r: ArrayRef) -> Self {
        Type::new(TypeTerminator::Array(r))
    }
}

impl From<FunctionRef> for Type {
    fn from(r: FunctionRef) -> Self {
        Type::new(TypeTerminator::Function(r))
    }
}

impl From<TypedefRef> for Type {
    fn from(r: TypedefRef) -> Self {
        Type::new(TypeTerminator::Typedef(r))
    }
}

// ── Shapes ──────────────────────────────────────────────────────────

#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StructType {
    /// Member `i` is emitted as `m_i`.
    pub members: Vec<Type>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ArrayType {
    pub elem: Type,
    pub size: u64,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionType {
    pub return_type: Type,
    pub params: Vec<Type>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypedefType {
    pub aliased: Type,
}

/// Append-only storage for one shape kind with a structural lookup.
struct ShapeSet<S, R> {
    shapes: Vec<S>,
    names: Vec<String>,
    lookup: FxHashMap<S, R>,
}

impl<S: Clone + Eq + Hash, R: ShapeRef> ShapeSet<S, R> {
    fn new() -> Self {
        ShapeSet {
            shapes: Vec::new(),
            names: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }

    /// Returns the existing entry for an equal shape, or registers it.
    fn add(&mut self, shape: S) -> (R, bool) {
        if let Some(&r) = self.lookup.get(&shape) {
            return (r, false);
        }
        let r = R::from_index(self.shapes.len());
        self.shapes.push(shape.clone());
        self.lookup.insert(shape, r);
        (r, true)
    }

    fn add_unique(&mut self, shape: S) -> R {
        let r = R::from_index(self.shapes.len());
        self.shapes.push(shape);
        r
    }

    fn set_name(&mut self, r: R, name: String) {
        assert_eq!(
            r.index(),
            self.names.len(),
            "type names must be assigned in registration order"
        );
        self.names.push(name);
    }

    fn name(&self, r: R) -> &str {
        &self.names[r.index()]
    }

    fn get(&self, r: R) -> &S {
        &self.shapes[r.index()]
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.shapes.len()
    }
}

// ── Table ───────────────────────────────────────────────────────────

/// Interned C types of one translation unit.
pub struct TypeTable {
    structs: ShapeSet<StructType, StructRef>,
    /// Parallel to `structs`: whether the member list is final.
    struct_resolved: Vec<bool>,
    arrays: ShapeSet<ArrayType, ArrayRef>,
    functions: ShapeSet<FunctionType, FunctionRef>,
    typedefs: ShapeSet<TypedefType, TypedefRef>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        TypeTable {
            structs: ShapeSet::new(),
            struct_resolved: Vec::new(),
            arrays: ShapeSet::new(),
            functions: ShapeSet::new(),
            typedefs: ShapeSet::new(),
        }
    }

    // ── Structs ─────────────────────────────────────────────────────

    /// Intern a struct by its member types. The flag is `true` when the
    /// entry is new and still needs a name and a definition.
    pub fn add_struct(&mut self, shape: StructType) -> (StructRef, bool) {
        let (r, inserted) = self.structs.add(shape);
        if inserted {
            self.struct_resolved.push(true);
        }
        (r, inserted)
    }

    /// A struct whose members are not known yet. Usable behind pointers
    /// until [`Self::resolve_struct`] fills it in.
    pub fn add_unresolved_struct(&mut self) -> StructRef {
        let r = self.structs.add_unique(StructType::default());
        self.struct_resolved.push(false);
        r
    }

    /// # Panics
    /// Panics if `r` was already resolved.
    pub fn resolve_struct(&mut self, r: StructRef, members: Vec<Type>) {
        let resolved = &mut self.struct_resolved[r.index()];
        assert!(!*resolved, "struct {r:?} resolved twice");
        *resolved = true;
        self.structs.shapes[r.index()].members = members;
    }

    pub fn is_struct_resolved(&self, r: StructRef) -> bool {
        self.struct_resolved[r.index()]
    }

    pub fn struct_type(&self, r: StructRef) -> &StructType {
        self.structs.get(r)
    }

    pub fn set_struct_name(&mut self, r: StructRef, name: String) {
        self.structs.set_name(r, name);
    }

    #[cfg(test)]
    pub(crate) fn struct_count(&self) -> usize {
        self.structs.len()
    }

    // ── Arrays ──────────────────────────────────────────────────────

    pub fn add_array(&mut self, shape: ArrayType) -> (ArrayRef, bool) {
        self.arrays.add(shape)
    }

    pub fn array_type(&self, r: ArrayRef) -> &ArrayType {
        self.arrays.get(r)
    }

    pub fn set_array_name(&mut self, r: ArrayRef, name: String) {
        self.arrays.set_name(r, name);
    }

    // ── Function pointers ───────────────────────────────────────────

    pub fn add_function(&mut self, shape: FunctionType) -> (FunctionRef, bool) {
        self.functions.add(shape)
    }

    pub fn function_type(&self, r: FunctionRef) -> &FunctionType {
        self.functions.get(r)
    }

    pub fn set_function_name(&mut self, r: FunctionRef, name: String) {
        self.functions.set_name(r, name);
    }

    // ── Typedefs ────────────────────────────────────────────────────

    /// Intern a typedef by its aliased type.
    pub fn add_typedef(&mut self, shape: TypedefType) -> (TypedefRef, bool) {
        self.typedefs.add(shape)
    }

    pub fn set_typedef_name(&mut self, r: TypedefRef, name: String) {
        self.typedefs.set_name(r, name);
    }

    // ── Rendering ───────────────────────────────────────────────────

    pub fn terminator_name(&self, terminator: TypeTerminator) -> &str {
        match terminator {
            TypeTerminator::Scalar(scalar) => scalar.c_name(),
            TypeTerminator::Struct(r) => self.structs.name(r),
            TypeTerminator::Array(r) => self.arrays.name(r),
            TypeTerminator::Function(r) => self.functions.name(r),
            TypeTerminator::Typedef(r) => self.typedefs.name(r),
        }
    }

    /// The C spelling of `ty`, e.g. `t_int32 const **`.
    pub fn render(&self, ty: Type) -> String {
        let mut out = String::from(self.terminator_name(ty.terminator));
        for modifier in ty.modifiers.iter() {
            match modifier {
                TypeModifier::Pointer => out.push('*'),
                TypeModifier::ConstPointer => out.push_str(" const *"),
            }
        }
        out
    }
}
