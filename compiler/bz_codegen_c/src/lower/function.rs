//! Function declarations, bodies, calls and the `main` wrapper.

use bz_ir::{BuiltinKind, Expr, ExprId, FuncId, ResolveOrder, Typespec};

use super::Lowerer;
use crate::abi::{FunctionAbi, ParamPassing, ReturnPassing};
use crate::types::TypeModifier;
use crate::value::{ExprValue, Precedence};

impl Lowerer<'_> {
    fn param_types(&self, func: FuncId) -> Vec<Typespec> {
        let module = self.module;
        module
            .function(func)
            .params
            .iter()
            .map(|param| module.var(*param).ty.clone())
            .collect()
    }

    /// The C name of `func`, declaring it and queueing its body on first
    /// use.
    pub(super) fn ensure_function_declared(&mut self, func: FuncId) -> String {
        if let Some(entry) = self.ctx.function_entry(func) {
            return entry.name.clone();
        }
        let module = self.module;
        let function = module.function(func);
        assert!(
            !function.is_intrinsic(),
            "intrinsic `{}` has no C declaration",
            function.name
        );

        if let Some(header) = &function.libc_header {
            self.ctx.add_include(header);
            let name = function.symbol_name.clone().unwrap_or_else(|| function.name.clone());
            self.ctx.register_function(func, name.clone(), false);
            tracing::debug!(function = %function.name, header = %header, "libc function used");
            return name;
        }

        let (name, linkage) = match &function.symbol_name {
            Some(symbol) => (symbol.clone(), ""),
            None if function.is_external() => (function.name.clone(), ""),
            None => (self.ctx.next_function_name(), "static "),
        };
        // Registered first: lowering the signature may reach this function
        // again through a function pointer constant.
        self.ctx.register_function(func, name.clone(), function.body.is_some());

        let abi = FunctionAbi::for_function(module, func);
        let params = self.param_types(func);
        let (return_type, params) = self.c_signature_types(&abi, &function.return_type, &params);
        let declaration = format!(
            "{linkage}{} {name}({})",
            self.ctx.type_name(return_type),
            self.ctx.render_param_list(&params)
        );
        self.ctx.add_function_declaration(&declaration);
        tracing::debug!(function = %function.name, c_name = %name, "function declared");
        name
    }

    pub(super) fn generate_function_body(&mut self, func: FuncId) {
        let module = self.module;
        let function = module.function(func);
        let Some(body) = &function.body else {
            return;
        };
        let name = self.ensure_function_declared(func);
        let abi = FunctionAbi::for_function(module, func);
        let param_types = self.param_types(func);
        let (return_type, c_params) = self.c_signature_types(&abi, &function.return_type, &param_types);

        self.ctx.begin_function(func);
        self.return_passing = abi.return_passing;

        // Parameters are destroyed by the callee, so their cleanups share
        // the body's outermost scope.
        let mark = self.ctx.push_expression_scope();
        let mut param_decls = Vec::with_capacity(c_params.len());
        let mut c_params = c_params.into_iter();
        if abi.has_sret() {
            if let Some(pointer) = c_params.next() {
                let param_name = self.ctx.make_local_name();
                param_decls.push(format!("{} {param_name}", self.ctx.type_name(pointer)));
                if let Some((result_type, _)) = pointer.pointee() {
                    let address = self.ctx.reference_value(param_name, result_type, false);
                    self.ctx.set_return_address(address);
                }
            }
        }
        for (&param, passing) in function.params.iter().zip(&abi.params) {
            if *passing == ParamPassing::Void {
                continue;
            }
            let Some(c_type) = c_params.next() else {
                unreachable!("parameter list shorter than the ABI");
            };
            let param_name = self.ctx.make_local_name();
            param_decls.push(format!("{} {param_name}", self.ctx.type_name(c_type)));
            let value = match c_type.pointee() {
                Some((pointee, modifier)) if passing.is_pointer() => {
                    self.ctx.reference_value(param_name, pointee, modifier == TypeModifier::ConstPointer)
                }
                _ => self.ctx.variable_value(param_name, c_type),
            };
            self.add_variable_helper(param, value);
        }

        for &stmt in body {
            if self.ctx.is_terminated() {
                break;
            }
            self.generate_stmt(stmt);
        }
        self.pop_expression_scope(mark);
        if !self.ctx.is_terminated() {
            self.generate_fall_off_end(func);
        }

        let linkage = if function.symbol_name.is_some() { "" } else { "static " };
        let params = if param_decls.is_empty() {
            "void".to_string()
        } else {
            param_decls.join(", ")
        };
        let signature = format!("{linkage}{} {name}({params})", self.ctx.type_name(return_type));
        self.ctx.finish_function(&signature);
        tracing::debug!(function = %function.name, c_name = %name, "function lowered");
    }

    /// Control reached the closing brace of a body.
    fn generate_fall_off_end(&mut self, func: FuncId) {
        let module = self.module;
        let function = module.function(func);
        if self.return_passing == ReturnPassing::Void {
            return;
        }
        let is_i32_entry = module.entry() == Some(func)
            && function.return_type == Typespec::builtin(BuiltinKind::I32);
        if is_i32_entry {
            let ty = self.ctx.builtin(BuiltinKind::I32);
            let zero = self.ctx.create_integer_constant(ty, 0);
            self.ctx.add_return(Some(&zero));
        } else {
            self.ctx.add_unreachable();
        }
    }

    /// `int main(void)` calling the entry function.
    pub(super) fn generate_main_wrapper(&mut self, entry: FuncId) {
        let name = self.ensure_function_declared(entry);
        if name == "main" {
            return;
        }
        let module = self.module;
        let abi = FunctionAbi::for_function(module, entry);
        assert!(
            abi.params.iter().all(|passing| *passing == ParamPassing::Void),
            "entry function `{}` takes parameters",
            module.function(entry).name
        );
        let indent = self.ctx.options().indentation.clone();
        let body = match abi.return_passing {
            ReturnPassing::Void => format!("{indent}{name}();\n{indent}return 0;\n"),
            ReturnPassing::Direct => format!("{indent}return (int){name}();\n"),
            ReturnPassing::Sret | ReturnPassing::Reference => {
                panic!("entry function `{}` must return void or an integer", module.function(entry).name)
            }
        };
        self.ctx.add_function_definition(&format!("int main(void)\n{{\n{body}}}\n"));
    }

    // ── Calls ───────────────────────────────────────────────────────

    pub(super) fn generate_call(
        &mut self,
        expr: &Expr,
        func: FuncId,
        args: &[ExprId],
        order: ResolveOrder,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let module = self.module;
        let function = module.function(func);
        if let Some(intrinsic) = function.intrinsic {
            return self.generate_intrinsic_call(intrinsic, expr, args, dest);
        }
        let name = self.ensure_function_declared(func);
        let abi = FunctionAbi::for_function(module, func);
        self.emit_call(&name, &abi, &function.return_type, args, order, dest)
    }

    pub(super) fn generate_indirect_call(
        &mut self,
        callee: ExprId,
        args: &[ExprId],
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let module = self.module;
        let Typespec::Function { return_type, params } = &module.expr(callee).ty else {
            panic!("call through a value of non-function type");
        };
        let abi = FunctionAbi::compute(module, return_type, params);
        let callee = self.generate_expr(callee, None);
        let callee = if args.iter().all(|arg| self.is_simple_expr(*arg)) {
            callee
        } else {
            self.stabilize(callee)
        };
        let callee = self.ctx.render_callee(&callee);
        self.emit_call(&callee, &abi, return_type, args, ResolveOrder::Regular, dest)
    }

    /// Evaluate the arguments in `order`, then emit the call. Arguments
    /// are rendered in parameter order regardless.
    fn emit_call(
        &mut self,
        callee: &str,
        abi: &FunctionAbi,
        return_type: &Typespec,
        args: &[ExprId],
        order: ResolveOrder,
        dest: Option<ExprValue>,
    ) -> ExprValue {
        let module = self.module;
        let evaluation_order: Vec<usize> = match order {
            ResolveOrder::Regular => (0..args.len()).collect(),
            ResolveOrder::Reversed => (0..args.len()).rev().collect(),
        };
        let mut arg_texts: Vec<Option<String>> = vec![None; args.len()];
        for (position, &i) in evaluation_order.iter().enumerate() {
            let later_are_simple = evaluation_order[position + 1..]
                .iter()
                .all(|&j| self.is_simple_expr(args[j]));
            arg_texts[i] = match abi.params[i] {
                ParamPassing::Void => {
                    self.generate_expr(args[i], None);
                    None
                }
                ParamPassing::Direct => {
                    let value = self.generate_expr(args[i], None);
                    let value = if later_are_simple { value } else { self.stabilize(value) };
                    Some(self.ctx.render_initializer(&value))
                }
                ParamPassing::Indirect => {
                    // The callee owns and destroys the temporary.
                    let ty = self.get_type(&module.expr(args[i]).ty);
                    let temp = self.ctx.add_uninitialized_value(ty);
                    self.generate_expr(args[i], Some(temp));
                    Some(self.ctx.render_address(&temp))
                }
                ParamPassing::Reference => {
                    let value = self.generate_expr(args[i], None);
                    let is_stable = value.is_variable();
                    let address = self.ctx.create_address_of(value);
                    let address = if later_are_simple || is_stable {
                        address
                    } else {
                        self.ctx.add_value_expression(&address)
                    };
                    Some(self.ctx.render_initializer(&address))
                }
            };
        }

        let mut call_args = Vec::with_capacity(args.len() + 1);
        let sret_storage = if abi.has_sret() {
            let storage = self.result_storage(dest, return_type);
            call_args.push(self.ctx.render_address(&storage));
            Some(storage)
        } else {
            None
        };
        call_args.extend(arg_texts.into_iter().flatten());
        let call = self.ctx.render_call(callee, &call_args);

        match (abi.return_passing, sret_storage) {
            (ReturnPassing::Sret, Some(storage)) => {
                self.ctx.add_expression_statement(&call);
                storage
            }
            (ReturnPassing::Reference, _) => {
                let pointer = self.lower_type(return_type, false);
                self.ctx.add_reference_text(pointer, &call)
            }
            (ReturnPassing::Direct, _) => {
                let ty = self.get_type(return_type);
                match dest {
                    Some(dest) => {
                        let value = self.ctx.make_rvalue(call, ty, Precedence::Suffix);
                        self.ctx.create_assignment(&dest, &value);
                        dest
                    }
                    None => self.ctx.add_value_text(ty, &call),
                }
            }
            _ => {
                self.ctx.add_expression_statement(&call);
                ExprValue::none()
            }
        }
    }
}
