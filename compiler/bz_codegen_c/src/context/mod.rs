//! Translation-unit state for C generation.
//!
//! [`CodegenContext`] owns the type table, the naming counters, the output
//! sections and the state of the function currently being emitted. Lowering
//! goes through it for every piece of text it produces; nothing else writes
//! C.
//!
//! # Output sections
//!
//! Text is appended to one of several sections and concatenated in a fixed
//! order by [`CodegenContext::into_code`]: includes, struct forward
//! declarations, typedefs, struct bodies, function declarations, global
//! variables, function bodies. Within a section, text appears in creation
//! order, so every struct body follows the bodies of its by-value members.

mod builder;
mod function_state;


use std::collections::VecDeque;
use std::fmt::Write as _;

use bz_ir::{BuiltinKind, FuncId, VarId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::CodegenOptions;
use crate::types::{
    ArrayType, CScalar, FunctionType, StructRef, StructType, Type, TypeModifier, TypeTable,
    TypeTerminator, TypedefType,
};
use crate::value::ExprValue;

pub(crate) use function_state::{DestructInfo, FunctionState, LoopInfo};

/// A declared function.
#[derive(Clone, Debug)]
pub(crate) struct FunctionEntry {
    pub name: String,
}

pub struct CodegenContext {
    options: CodegenOptions,
    types: TypeTable,
    /// Indexed like [`BuiltinKind::ALL`].
    builtins: [Type; 12],
    /// Unsigned integer with the width of a pointer.
    size_kind: BuiltinKind,

    type_counter: u32,
    global_counter: u32,
    string_counter: u32,
    function_counter: u32,

    /// Slot texts of every [`ExprValue`] handed out in this translation unit.
    values: Vec<String>,

    included: FxHashSet<String>,
    string_literals: FxHashMap<String, String>,
    globals: FxHashMap<VarId, ExprValue>,
    functions: FxHashMap<FuncId, FunctionEntry>,
    function_queue: VecDeque<FuncId>,

    includes: String,
    struct_forward_declarations: String,
    typedefs: String,
    struct_bodies: String,
    function_declarations: String,
    variables: String,
    function_bodies: String,

    pub(crate) func: FunctionState,
}

impl CodegenContext {
    /// A fresh translation unit with the builtin typedefs registered.
    ///
    /// # Panics
    /// Panics if the target has no C integer type of some builtin's size.
    pub fn new(options: CodegenOptions) -> Self {
        let size_kind = if options.target.pointer_size == 8 {
            BuiltinKind::U64
        } else {
            BuiltinKind::U32
        };
        let mut ctx = CodegenContext {
            options,
            types: TypeTable::new(),
            builtins: [Type::void(); 12],
            size_kind,
            type_counter: 0,
            global_counter: 0,
            string_counter: 0,
            function_counter: 0,
            values: Vec::new(),
            included: FxHashSet::default(),
            string_literals: FxHashMap::default(),
            globals: FxHashMap::default(),
            functions: FxHashMap::default(),
            function_queue: VecDeque::new(),
            includes: String::new(),
            struct_forward_declarations: String::new(),
            typedefs: String::new(),
            struct_bodies: String::new(),
            function_declarations: String::new(),
            variables: String::new(),
            function_bodies: String::new(),
            func: FunctionState::default(),
        };
        ctx.register_builtins();
        ctx
    }

    fn register_builtins(&mut self) {
        for (i, kind) in BuiltinKind::ALL.into_iter().enumerate() {
            let aliased = match kind {
                BuiltinKind::F32 => Type::from(CScalar::Float),
                BuiltinKind::F64 => Type::from(CScalar::Double),
                BuiltinKind::Bool => Type::from(CScalar::Bool),
                BuiltinKind::Char => self.builtin(BuiltinKind::U32),
                _ => {
                    let signed = kind.is_signed_integer();
                    match self.options.target.integer_of_size(kind.size(), signed) {
                        Some(scalar) => Type::from(scalar),
                        None => panic!(
                            "target has no C integer type of {} bytes for `{}`",
                            kind.size(),
                            kind.name()
                        ),
                    }
                }
            };
            let (r, inserted) = self.types.add_typedef(TypedefType { aliased });
            assert!(inserted, "builtin `{}` aliases the C type of another builtin", kind.name());
            let name = format!("t_{}", kind.name());
            let _ = writeln!(self.typedefs, "typedef {} {name};", self.types.render(aliased));
            tracing::debug!(%name, "registered builtin typedef");
            self.types.set_typedef_name(r, name);
            self.builtins[i] = r.into();
        }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    // ── Types ───────────────────────────────────────────────────────

    pub fn builtin(&self, kind: BuiltinKind) -> Type {
        match BuiltinKind::ALL.iter().position(|k| *k == kind) {
            Some(i) => self.builtins[i],
            None => unreachable!("every builtin is registered"),
        }
    }

    /// Loop indices, sizes and pointer-to-integer conversions.
    pub fn size_type(&self) -> Type {
        self.builtin(self.size_kind)
    }

    pub fn bool_type(&self) -> Type {
        self.builtin(BuiltinKind::Bool)
    }

    fn next_type_name(&mut self) -> String {
        let name = format!("t_{}", self.type_counter);
        self.type_counter += 1;
        name
    }

    /// Structurally interned struct; defined on first use.
    pub fn add_struct(&mut self, members: Vec<Type>) -> Type {
        let (r, inserted) = self.types.add_struct(StructType { members });
        if inserted {
            let name = self.next_type_name();
            let _ = writeln!(self.struct_forward_declarations, "typedef struct {name} {name};");
            tracing::debug!(%name, "registered struct");
            self.types.set_struct_name(r, name);
            self.emit_struct_body(r);
        }
        r.into()
    }

    /// A struct that is named and forward declared now, and defined by
    /// [`Self::resolve_struct`] once its members are known.
    pub fn add_unresolved_struct(&mut self) -> StructRef {
        let r = self.types.add_unresolved_struct();
        let name = self.next_type_name();
        let _ = writeln!(self.struct_forward_declarations, "typedef struct {name} {name};");
        tracing::debug!(%name, "registered forward declared struct");
        self.types.set_struct_name(r, name);
        r
    }

    pub fn resolve_struct(&mut self, r: StructRef, members: Vec<Type>) {
        self.types.resolve_struct(r, members);
        self.emit_struct_body(r);
    }

    pub fn is_struct_resolved(&self, r: StructRef) -> bool {
        self.types.is_struct_resolved(r)
    }

    fn emit_struct_body(&mut self, r: StructRef) {
        let name = self.types.terminator_name(TypeTerminator::Struct(r)).to_string();
        let members = &self.types.struct_type(r).members;
        let mut body = format!("struct {name}\n{{\n");
        if members.is_empty() {
            // C has no empty structs.
            body.push_str("\tchar m_empty;\n");
        }
        for (i, member) in members.iter().enumerate() {
            let _ = writeln!(body, "\t{} m_{i};", self.types.render(*member));
        }
        body.push_str("};\n\n");
        self.struct_bodies.push_str(&body);
    }

    /// `struct { T a[N]; }`, interned by element type and size.
    pub fn add_array(&mut self, elem: Type, size: u64) -> Type {
        let (r, inserted) = self.types.add_array(ArrayType { elem, size });
        if inserted {
            let name = self.next_type_name();
            let _ = writeln!(self.struct_forward_declarations, "typedef struct {name} {name};");
            // Zero-length arrays are not C; keep one unused element.
            let _ = write!(
                self.struct_bodies,
                "struct {name}\n{{\n\t{} a[{}];\n}};\n\n",
                self.types.render(elem),
                size.max(1)
            );
            tracing::debug!(%name, size, "registered array");
            self.types.set_array_name(r, name);
        }
        r.into()
    }

    /// Function pointer typedef.
    pub fn add_function_type(&mut self, return_type: Type, params: Vec<Type>) -> Type {
        let shape = FunctionType { return_type, params };
        let (r, inserted) = self.types.add_function(shape.clone());
        if inserted {
            let name = self.next_type_name();
            let params = self.render_param_list(&shape.params);
            let _ = writeln!(
                self.typedefs,
                "typedef {} (*{name})({params});",
                self.types.render(shape.return_type)
            );
            tracing::debug!(%name, params = shape.params.len(), "registered function type");
            self.types.set_function_name(r, name);
        }
        r.into()
    }

    /// One more pointer level.
    ///
    /// # Panics
    /// Panics past [`PointerModifiers::MAX_DEPTH`](crate::types::PointerModifiers::MAX_DEPTH)
    /// levels.
    pub fn add_pointer(&mut self, ty: Type, modifier: TypeModifier) -> Type {
        match ty.pointer_to(modifier) {
            Some(pointer) => pointer,
            None => panic!("pointer nesting deeper than the C backend supports"),
        }
    }

    pub fn add_pointer_for(&mut self, ty: Type, is_const: bool) -> Type {
        let modifier = if is_const {
            TypeModifier::ConstPointer
        } else {
            TypeModifier::Pointer
        };
        self.add_pointer(ty, modifier)
    }

    pub fn type_name(&self, ty: Type) -> String {
        self.types.render(ty)
    }

    pub(crate) fn render_param_list(&self, params: &[Type]) -> String {
        if params.is_empty() {
            return "void".to_string();
        }
        params
            .iter()
            .map(|param| self.types.render(*param))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Type of member `index` of a struct, or the element of an array
    /// struct.
    ///
    /// # Panics
    /// Panics if `ty` is not a defined struct or array.
    pub fn member_type(&self, ty: Type, index: usize) -> Type {
        match ty.terminator {
            TypeTerminator::Struct(r) if !ty.is_pointer() => {
                assert!(self.types.is_struct_resolved(r), "member access into incomplete struct");
                self.types.struct_type(r).members[index]
            }
            TypeTerminator::Array(r) if !ty.is_pointer() => self.types.array_type(r).elem,
            _ => panic!("member access into non-struct type {}", self.types.render(ty)),
        }
    }

    pub fn array_shape(&self, ty: Type) -> ArrayType {
        match ty.as_array() {
            Some(r) => *self.types.array_type(r),
            None => panic!("{} is not an array", self.types.render(ty)),
        }
    }

    // ── Translation-unit entities ───────────────────────────────────

    /// `#include <header>`, once per header.
    pub fn add_include(&mut self, header: &str) {
        if self.included.insert(header.to_string()) {
            let _ = writeln!(self.includes, "#include <{header}>");
        }
    }

    /// Name of a static byte array holding `s` followed by a NUL. Equal
    /// strings share one array.
    pub fn create_cstring(&mut self, s: &str) -> String {
        if let Some(name) = self.string_literals.get(s) {
            return name.clone();
        }
        let name = format!("s_{}", self.string_counter);
        self.string_counter += 1;
        let byte_type = self.type_name(self.builtin(BuiltinKind::U8));
        let _ = writeln!(
            self.variables,
            "static {byte_type} const {name}[] = \"{}\";",
            escape_c_string(s)
        );
        self.string_literals.insert(s.to_string(), name.clone());
        name
    }

    /// Define a global `static T g_N = init;` and bind it to `var`.
    pub fn add_global(&mut self, var: VarId, ty: Type, initializer: &str) -> ExprValue {
        let name = format!("g_{}", self.global_counter);
        self.global_counter += 1;
        let type_name = self.type_name(ty);
        let _ = writeln!(self.variables, "static {type_name} {name} = {initializer};");
        let value = self.variable_value(name, ty);
        self.globals.insert(var, value);
        value
    }

    pub fn global(&self, var: VarId) -> Option<ExprValue> {
        self.globals.get(&var).copied()
    }

    pub(crate) fn function_entry(&self, func: FuncId) -> Option<&FunctionEntry> {
        self.functions.get(&func)
    }

    /// Record `func` under `name` and queue its body if it has one.
    pub(crate) fn register_function(&mut self, func: FuncId, name: String, queue_body: bool) {
        self.functions.insert(func, FunctionEntry { name });
        if queue_body {
            self.function_queue.push_back(func);
        }
    }

    pub(crate) fn next_queued_function(&mut self) -> Option<FuncId> {
        self.function_queue.pop_front()
    }

    pub(crate) fn next_function_name(&mut self) -> String {
        let name = format!("f_{}", self.function_counter);
        self.function_counter += 1;
        name
    }

    pub(crate) fn add_function_declaration(&mut self, declaration: &str) {
        let _ = writeln!(self.function_declarations, "{declaration};");
    }

    pub(crate) fn add_function_definition(&mut self, definition: &str) {
        self.function_bodies.push_str(definition);
        self.function_bodies.push('\n');
    }

    /// Concatenate the sections into the final translation unit.
    pub fn into_code(self) -> String {
        let sections = [
            self.includes,
            self.struct_forward_declarations,
            self.typedefs,
            self.struct_bodies,
            self.function_declarations,
            self.variables,
            self.function_bodies,
        ];
        let mut code = String::new();
        for section in sections.iter().filter(|section| !section.is_empty()) {
            code.push_str(section);
            if !code.ends_with("\n\n") {
                code.push('\n');
            }
        }
        code
    }
}

/// Escape `s` for a C string literal. Non-printable and non-ASCII bytes use
/// three-digit octal escapes, which unlike hex escapes cannot swallow a
/// following digit; `?` is escaped to rule out trigraphs.
pub(crate) fn escape_c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'?' => out.push_str("\\?"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "\\{byte:03o}");
            }
        }
    }
    out
}
