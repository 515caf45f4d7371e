//! How parameters and return values cross a C function boundary.
//!
//! C passes every struct by value, but a byte copy is only a valid move for
//! trivially relocatable types. Everything else travels by pointer: the
//! callee takes ownership of the argument temporary and writes non-trivial
//! results through a hidden out-pointer.
//!
//! Lowering only consults [`FunctionAbi`]; the source signature is read once
//! by [`FunctionAbi::compute`].

use bz_ir::{Module, Typespec};

// ---------------------------------------------------------------------------
// Passing modes
// ---------------------------------------------------------------------------

/// How a parameter is passed to the callee.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamPassing {
    /// By value.
    Direct,
    /// Pointer to a temporary the caller constructs. The callee owns the
    /// pointee as its parameter object and destroys it on return.
    Indirect,
    /// `&T` / `move T` parameters: a pointer to the argument's storage.
    Reference,
    /// `void` parameter; not physically passed.
    Void,
}

/// How a return value is passed back to the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReturnPassing {
    Direct,
    /// Through a hidden first parameter pointing at the result storage.
    Sret,
    /// Returns a pointer to the referenced object.
    Reference,
    Void,
}

impl ParamPassing {
    /// The callee receives a pointer rather than the value.
    #[inline]
    pub fn is_pointer(self) -> bool {
        matches!(self, ParamPassing::Indirect | ParamPassing::Reference)
    }
}

// ---------------------------------------------------------------------------
// ABI computation
// ---------------------------------------------------------------------------

/// Physical ABI of a function signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionAbi {
    pub params: Vec<ParamPassing>,
    pub return_passing: ReturnPassing,
}

pub fn compute_param_passing(module: &Module, ty: &Typespec) -> ParamPassing {
    if ty.is_void() {
        ParamPassing::Void
    } else if ty.is_any_reference() {
        ParamPassing::Reference
    } else if module.is_trivially_relocatable(ty) {
        ParamPassing::Direct
    } else {
        ParamPassing::Indirect
    }
}

pub fn compute_return_passing(module: &Module, ty: &Typespec) -> ReturnPassing {
    if ty.is_void() {
        ReturnPassing::Void
    } else if ty.is_any_reference() {
        ReturnPassing::Reference
    } else if module.is_trivially_relocatable(ty) {
        ReturnPassing::Direct
    } else {
        ReturnPassing::Sret
    }
}

impl FunctionAbi {
    pub fn compute(module: &Module, return_type: &Typespec, params: &[Typespec]) -> Self {
        FunctionAbi {
            params: params.iter().map(|param| compute_param_passing(module, param)).collect(),
            return_passing: compute_return_passing(module, return_type),
        }
    }

    pub fn for_function(module: &Module, func: bz_ir::FuncId) -> Self {
        let function = module.function(func);
        let params: Vec<Typespec> = function
            .params
            .iter()
            .map(|param| module.var(*param).ty.clone())
            .collect();
        Self::compute(module, &function.return_type, &params)
    }

    #[inline]
    pub fn has_sret(&self) -> bool {
        self.return_passing == ReturnPassing::Sret
    }
}
