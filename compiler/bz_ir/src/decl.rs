//! Variable and function declarations.

use crate::{DestructOperation, ExprId, Intrinsic, StmtId, Typespec, VarId};

#[derive(Clone, PartialEq, Debug)]
pub struct VarDecl {
    pub name: String,
    /// Declared type; `&T` for reference bindings.
    pub ty: Typespec,
    pub init: Option<ExprId>,
    /// Cleanup run when the variable goes out of scope.
    pub destruction: DestructOperation,
    /// Some path moves out of the variable, so its destruction must be
    /// guarded by a runtime flag.
    pub ever_moved_from: bool,
    /// Bindings of a destructuring declaration `let [a, b] = ...`.
    pub tuple_decls: Vec<VarId>,
    pub is_global: bool,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: Typespec) -> Self {
        VarDecl {
            name: name.into(),
            ty,
            init: None,
            destruction: DestructOperation::default(),
            ever_moved_from: false,
            tuple_decls: Vec::new(),
            is_global: false,
        }
    }

    #[must_use]
    pub fn with_init(mut self, init: ExprId) -> Self {
        self.init = Some(init);
        self
    }

    #[must_use]
    pub fn moved_from(mut self) -> Self {
        self.ever_moved_from = true;
        self
    }

    #[must_use]
    pub fn with_tuple_decls(mut self, tuple_decls: Vec<VarId>) -> Self {
        self.tuple_decls = tuple_decls;
        self
    }

    #[must_use]
    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Function {
    /// Source name, for diagnostics and logs.
    pub name: String,
    /// Linker-visible name. Functions without one get a generated name.
    pub symbol_name: Option<String>,
    pub params: Vec<VarId>,
    pub return_type: Typespec,
    /// `None` for external and intrinsic functions.
    pub body: Option<Vec<StmtId>>,
    pub intrinsic: Option<Intrinsic>,
    /// Declared by a libc header; the header is included instead of
    /// emitting a prototype.
    pub libc_header: Option<String>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<VarId>, return_type: Typespec) -> Self {
        Function {
            name: name.into(),
            symbol_name: None,
            params,
            return_type,
            body: None,
            intrinsic: None,
            libc_header: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<StmtId>) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_symbol_name(mut self, symbol_name: impl Into<String>) -> Self {
        self.symbol_name = Some(symbol_name.into());
        self
    }

    #[must_use]
    pub fn with_intrinsic(mut self, intrinsic: Intrinsic) -> Self {
        self.intrinsic = Some(intrinsic);
        self
    }

    #[must_use]
    pub fn with_libc_header(mut self, header: impl Into<String>) -> Self {
        self.libc_header = Some(header.into());
        self
    }

    #[inline]
    pub fn is_intrinsic(&self) -> bool {
        self.intrinsic.is_some()
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.body.is_none() && self.intrinsic.is_none()
    }
}
