//! Arena indices.
//!
//! Every IR entity lives in a [`Module`](crate::Module) arena and is referred
//! to by a 4-byte index. Indices are only meaningful for the module that
//! allocated them.

use std::fmt;

/// Defines a `u32` arena index newtype with an `INVALID` sentinel.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Sentinel for "no entity".
            pub const INVALID: $name = $name(u32::MAX);

            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Index into the owning arena.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                } else {
                    write!(f, concat!(stringify!($name), "::INVALID"))
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }
    };
}

define_id!(
    /// Index of an [`Expr`](crate::Expr).
    ExprId
);
define_id!(
    /// Index of a [`Stmt`](crate::Stmt).
    StmtId
);
define_id!(
    /// Index of a [`VarDecl`](crate::VarDecl). Parameters, locals, globals
    /// and tuple-destructured bindings all share this space.
    VarId
);
define_id!(
    /// Index of a [`Function`](crate::Function).
    FuncId
);
define_id!(
    /// Index of a [`TypeInfo`](crate::TypeInfo).
    TypeInfoId
);

/// Convert an arena length into the next index.
///
/// # Panics
/// Panics if the arena outgrows `u32`.
#[inline]
pub(crate) fn next_index(len: usize) -> u32 {
    match u32::try_from(len) {
        Ok(index) if index != u32::MAX => index,
        _ => panic!("IR arena exceeded u32::MAX - 1 entries"),
    }
}
