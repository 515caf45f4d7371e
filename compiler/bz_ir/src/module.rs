//! The owning container of a translation unit's IR.

use crate::ids::next_index;
use crate::{
    DestructOperation, Expr, ExprId, FuncId, Function, MemberVariable, Stmt, StmtId, TypeInfo, TypeInfoId,
    TypeInfoKind, TypeTraits, Typespec, VarDecl, VarId,
};

/// Arena storage for every IR entity of one translation unit.
///
/// Entities are append-only; ids handed out stay valid for the lifetime of
/// the module.
#[derive(Clone, Debug, Default)]
pub struct Module {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    vars: Vec<VarDecl>,
    functions: Vec<Function>,
    type_infos: Vec<TypeInfo>,
    globals: Vec<VarId>,
    /// Functions emitted unconditionally; their callees follow on demand.
    roots: Vec<FuncId>,
    entry: Option<FuncId>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Allocation ──────────────────────────────────────────────────

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(next_index(self.exprs.len()));
        self.exprs.push(expr);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::new(next_index(self.stmts.len()));
        self.stmts.push(stmt);
        id
    }

    pub fn alloc_var(&mut self, var: VarDecl) -> VarId {
        let id = VarId::new(next_index(self.vars.len()));
        self.vars.push(var);
        id
    }

    pub fn alloc_function(&mut self, function: Function) -> FuncId {
        let id = FuncId::new(next_index(self.functions.len()));
        self.functions.push(function);
        id
    }

    pub fn alloc_type_info(&mut self, info: TypeInfo) -> TypeInfoId {
        let id = TypeInfoId::new(next_index(self.type_infos.len()));
        self.type_infos.push(info);
        id
    }

    /// Attach a body after allocation, for recursive functions whose body
    /// refers to their own id.
    pub fn set_function_body(&mut self, func: FuncId, body: Vec<StmtId>) {
        self.functions[func.index()].body = Some(body);
    }

    /// Attach a cleanup after allocation; a variable's destructor call
    /// refers to the variable itself.
    pub fn set_var_destruction(&mut self, var: VarId, destruction: DestructOperation) {
        self.vars[var.index()].destruction = destruction;
    }

    /// Fill in the members of a type allocated as a forward declaration.
    pub fn define_type_info(&mut self, id: TypeInfoId, members: Vec<MemberVariable>, traits: TypeTraits) {
        let info = &mut self.type_infos[id.index()];
        info.kind = TypeInfoKind::Aggregate;
        info.members = members;
        info.traits = traits;
    }

    pub fn add_global(&mut self, var: VarId) {
        debug_assert!(self.vars[var.index()].is_global, "global list entry is not a global");
        self.globals.push(var);
    }

    pub fn add_root(&mut self, func: FuncId) {
        self.roots.push(func);
    }

    pub fn set_entry(&mut self, func: FuncId) {
        self.entry = Some(func);
    }

    // ── Lookup ──────────────────────────────────────────────────────

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &VarDecl {
        &self.vars[id.index()]
    }

    #[inline]
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    #[inline]
    pub fn type_info(&self, id: TypeInfoId) -> &TypeInfo {
        &self.type_infos[id.index()]
    }

    pub fn globals(&self) -> &[VarId] {
        &self.globals
    }

    pub fn roots(&self) -> &[FuncId] {
        &self.roots
    }

    pub fn entry(&self) -> Option<FuncId> {
        self.entry
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// The function type of `func`, as seen through a function pointer.
    pub fn function_type(&self, func: FuncId) -> Typespec {
        let function = self.function(func);
        let params = function
            .params
            .iter()
            .map(|param| self.var(*param).ty.clone())
            .collect();
        Typespec::function(function.return_type.clone(), params)
    }

    // ── Value-semantics queries ─────────────────────────────────────

    /// Whether moving a value and destroying the source is a byte copy.
    pub fn is_trivially_relocatable(&self, ty: &Typespec) -> bool {
        self.all_traits(ty, TypeTraits::TRIVIALLY_RELOCATABLE)
    }

    pub fn is_trivially_destructible(&self, ty: &Typespec) -> bool {
        self.all_traits(ty, TypeTraits::TRIVIALLY_DESTRUCTIBLE)
    }

    pub fn is_trivially_copy_constructible(&self, ty: &Typespec) -> bool {
        self.all_traits(ty, TypeTraits::TRIVIALLY_COPY_CONSTRUCTIBLE)
    }

    fn all_traits(&self, ty: &Typespec, traits: TypeTraits) -> bool {
        match ty {
            Typespec::Void
            | Typespec::Builtin(_)
            | Typespec::Str
            | Typespec::Enum { .. }
            | Typespec::Pointer { .. }
            | Typespec::Reference { .. }
            | Typespec::MoveReference(_)
            | Typespec::Slice { .. }
            | Typespec::Function { .. } => true,
            Typespec::Aggregate(id) => {
                let info = self.type_info(*id);
                !info.is_forward_declaration() && info.traits.contains(traits)
            }
            Typespec::Optional(payload) => self.all_traits(payload, traits),
            Typespec::Array { elem, .. } => self.all_traits(elem, traits),
            Typespec::Tuple(elems) => elems.iter().all(|elem| self.all_traits(elem, traits)),
        }
    }
}
