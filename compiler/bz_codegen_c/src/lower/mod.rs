//! IR to C lowering.
//!
//! [`Lowerer`] walks a [`Module`] and drives a [`CodegenContext`]. Globals
//! are emitted first, then the root functions and the entry point are
//! declared, then function bodies are generated from a work queue; calling
//! a function declares it and queues its body, so only reachable code is
//! emitted.
//!
//! | Submodule | Lowers |
//! |-----------|--------|
//! | `expr` | expression dispatch, operators, access, construction |
//! | `value_ops` | copy/move/destruct/swap/assign plans |
//! | `control` | blocks, `if`, `switch`, `break`/`continue` |
//! | `constant` | compile-time constants and global initializers |
//! | `stmt` | statements and variable declarations |
//! | `function` | signatures, bodies, calls, the `main` wrapper |
//! | `intrinsic` | compiler-provided functions |
//! | `destruct` | scope exits and cleanup emission |

mod constant;
mod control;
mod destruct;
mod expr;
mod function;
mod intrinsic;
mod stmt;
mod value_ops;

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;

use bz_ir::{Module, TypeInfoId, Typespec};
use rustc_hash::FxHashMap;

use crate::abi::{FunctionAbi, ParamPassing, ReturnPassing};
use crate::config::CodegenOptions;
use crate::context::CodegenContext;
use crate::types::{StructRef, Type};

/// How far a declared aggregate has been lowered.
#[derive(Copy, Clone, Debug)]
enum StructState {
    /// Named and forward declared; members not lowered yet.
    Declared(StructRef),
    /// Members are being lowered.
    Resolving(StructRef),
    Resolved(StructRef),
    /// A forward declaration with no definition.
    Opaque(StructRef),
}

impl StructState {
    fn struct_ref(self) -> StructRef {
        match self {
            StructState::Declared(r)
            | StructState::Resolving(r)
            | StructState::Resolved(r)
            | StructState::Opaque(r) => r,
        }
    }
}

pub struct Lowerer<'m> {
    module: &'m Module,
    ctx: CodegenContext,
    structs: FxHashMap<TypeInfoId, StructState>,
    /// Return convention of the function being emitted.
    return_passing: ReturnPassing,
}

impl<'m> Lowerer<'m> {
    pub fn new(module: &'m Module, options: CodegenOptions) -> Self {
        Lowerer {
            module,
            ctx: CodegenContext::new(options),
            structs: FxHashMap::default(),
            return_passing: ReturnPassing::Void,
        }
    }

    /// Lower the whole module into one translation unit.
    pub fn generate(mut self) -> String {
        let module = self.module;
        for &var in module.globals() {
            self.generate_global(var);
        }
        for &root in module.roots() {
            self.ensure_function_declared(root);
        }
        if let Some(entry) = module.entry() {
            self.ensure_function_declared(entry);
        }
        while let Some(func) = self.ctx.next_queued_function() {
            self.generate_function_body(func);
        }
        if let Some(entry) = module.entry() {
            self.generate_main_wrapper(entry);
        }
        let code = self.ctx.into_code();
        tracing::debug!(
            functions = module.function_count(),
            globals = module.globals().len(),
            bytes = code.len(),
            "translation unit generated"
        );
        code
    }

    // ── Types ───────────────────────────────────────────────────────

    /// The C type of a value of type `ty`, with every by-value struct
    /// defined.
    pub(crate) fn get_type(&mut self, ty: &Typespec) -> Type {
        self.lower_type(ty, true)
    }

    /// `resolve_structs` is `false` behind pointers, where a forward
    /// declaration is enough.
    fn lower_type(&mut self, ty: &Typespec, resolve_structs: bool) -> Type {
        match ty {
            Typespec::Void => Type::void(),
            Typespec::Builtin(kind) | Typespec::Enum { underlying: kind } => self.ctx.builtin(*kind),
            Typespec::Str => self.str_type(),
            Typespec::Aggregate(id) => self.get_struct(*id, resolve_structs),
            Typespec::Pointer { pointee, mutable } | Typespec::Reference { referenced: pointee, mutable } => {
                let pointee = self.lower_type(pointee, false);
                self.ctx.add_pointer_for(pointee, !mutable)
            }
            Typespec::MoveReference(referenced) => {
                let referenced = self.lower_type(referenced, false);
                self.ctx.add_pointer_for(referenced, false)
            }
            Typespec::Optional(payload) => {
                if ty.is_optional_pointer_like() {
                    self.lower_type(payload, resolve_structs)
                } else {
                    let payload = self.lower_type(payload, true);
                    let has_value = self.ctx.bool_type();
                    self.ctx.add_struct(vec![payload, has_value])
                }
            }
            Typespec::Array { elem, size } => {
                // The array body is emitted right away, so its element must
                // be complete even behind a pointer.
                let elem = self.lower_type(elem, true);
                self.ctx.add_array(elem, *size)
            }
            Typespec::Slice { elem, mutable } => {
                let elem = self.lower_type(elem, false);
                let pointer = self.ctx.add_pointer_for(elem, !mutable);
                self.ctx.add_struct(vec![pointer, pointer])
            }
            Typespec::Tuple(elems) => {
                let members = elems.iter().map(|elem| self.lower_type(elem, true)).collect();
                self.ctx.add_struct(members)
            }
            Typespec::Function { return_type, params } => {
                let abi = FunctionAbi::compute(self.module, return_type, params);
                let (return_type, params) = self.c_signature_types(&abi, return_type, params);
                self.ctx.add_function_type(return_type, params)
            }
        }
    }

    /// `{ uint8 const *begin; uint8 const *end; }`
    pub(crate) fn str_type(&mut self) -> Type {
        let byte = self.ctx.builtin(bz_ir::BuiltinKind::U8);
        let pointer = self.ctx.add_pointer_for(byte, true);
        self.ctx.add_struct(vec![pointer, pointer])
    }

    fn get_struct(&mut self, id: TypeInfoId, resolve: bool) -> Type {
        match self.structs.get(&id).copied() {
            Some(StructState::Declared(r)) if resolve => {
                self.resolve_aggregate(id, r);
                r.into()
            }
            Some(StructState::Opaque(_)) if resolve => {
                panic!("incomplete type `{}` used by value", self.module.type_info(id).name)
            }
            Some(state) => state.struct_ref().into(),
            None => {
                let r = self.ctx.add_unresolved_struct();
                if self.module.type_info(id).is_forward_declaration() {
                    self.structs.insert(id, StructState::Opaque(r));
                    assert!(
                        !resolve,
                        "incomplete type `{}` used by value",
                        self.module.type_info(id).name
                    );
                } else if resolve {
                    self.resolve_aggregate(id, r);
                } else {
                    self.structs.insert(id, StructState::Declared(r));
                }
                r.into()
            }
        }
    }

    fn resolve_aggregate(&mut self, id: TypeInfoId, r: StructRef) {
        self.structs.insert(id, StructState::Resolving(r));
        let info = self.module.type_info(id);
        let members = info
            .members
            .iter()
            .map(|member| self.lower_type(&member.ty, true))
            .collect();
        self.ctx.resolve_struct(r, members);
        self.structs.insert(id, StructState::Resolved(r));
        tracing::debug!(name = %info.name, members = info.members.len(), "struct defined");
    }

    /// C return type and parameter list of a function signature.
    fn c_signature_types(&mut self, abi: &FunctionAbi, return_type: &Typespec, params: &[Typespec]) -> (Type, Vec<Type>) {
        let mut c_params = Vec::with_capacity(params.len() + 1);
        let c_return = match abi.return_passing {
            ReturnPassing::Void => Type::void(),
            ReturnPassing::Direct => self.get_type(return_type),
            ReturnPassing::Reference => self.lower_type(return_type, false),
            ReturnPassing::Sret => {
                let result = self.get_type(return_type);
                c_params.push(self.ctx.add_pointer_for(result, false));
                Type::void()
            }
        };
        for (param, passing) in params.iter().zip(&abi.params) {
            match passing {
                ParamPassing::Void => {}
                ParamPassing::Direct => c_params.push(self.get_type(param)),
                ParamPassing::Reference => c_params.push(self.lower_type(param, false)),
                ParamPassing::Indirect => {
                    let param = self.get_type(param);
                    c_params.push(self.ctx.add_pointer_for(param, false));
                }
            }
        }
        (c_return, c_params)
    }
}
