//! Declared struct types.

use bitflags::bitflags;

use crate::Typespec;

bitflags! {
    /// Value-semantics properties decided by the semantic pass.
    ///
    /// A trait bit is only set when the property holds for every member too,
    /// so the backend never has to recurse into `members` to answer it.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TypeTraits: u32 {
        /// Copy construction is a flat byte copy.
        const TRIVIALLY_COPY_CONSTRUCTIBLE = 1 << 0;
        /// Move construction is a flat byte copy.
        const TRIVIALLY_MOVE_CONSTRUCTIBLE = 1 << 1;
        /// Destruction is a no-op.
        const TRIVIALLY_DESTRUCTIBLE = 1 << 2;
        /// Move-then-destroy-source is a flat byte copy.
        const TRIVIALLY_RELOCATABLE = 1 << 3;
        /// Has a default constructor.
        const DEFAULT_CONSTRUCTIBLE = 1 << 4;

        /// Shorthand for plain-old-data structs.
        const TRIVIAL = Self::TRIVIALLY_COPY_CONSTRUCTIBLE.bits()
            | Self::TRIVIALLY_MOVE_CONSTRUCTIBLE.bits()
            | Self::TRIVIALLY_DESTRUCTIBLE.bits()
            | Self::TRIVIALLY_RELOCATABLE.bits();
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeInfoKind {
    /// A struct with a known member list.
    Aggregate,
    /// Declared but never defined. Only usable behind a pointer.
    ForwardDeclaration,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemberVariable {
    pub name: String,
    pub ty: Typespec,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeInfoKind,
    pub members: Vec<MemberVariable>,
    pub traits: TypeTraits,
}

impl TypeInfo {
    pub fn aggregate(name: impl Into<String>, members: Vec<MemberVariable>, traits: TypeTraits) -> Self {
        TypeInfo {
            name: name.into(),
            kind: TypeInfoKind::Aggregate,
            members,
            traits,
        }
    }

    pub fn forward_declaration(name: impl Into<String>) -> Self {
        TypeInfo {
            name: name.into(),
            kind: TypeInfoKind::ForwardDeclaration,
            members: Vec::new(),
            traits: TypeTraits::empty(),
        }
    }

    #[inline]
    pub fn is_forward_declaration(&self) -> bool {
        self.kind == TypeInfoKind::ForwardDeclaration
    }
}

impl MemberVariable {
    pub fn new(name: impl Into<String>, ty: Typespec) -> Self {
        MemberVariable { name: name.into(), ty }
    }
}
