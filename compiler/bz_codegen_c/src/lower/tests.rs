use bz_ir::{
    BinaryOp, BuiltinKind, ConstantValue, DestructKind, DestructOperation, Expr, ExprId, ExprKind,
    Function, Intrinsic, MathFn, Stmt, StmtId, SwitchCase, TypeTraits, Typespec, ValueCategory, VarDecl,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::test_helpers::{bool_type, int_type, ModuleBuilder};

/// The definition of the function whose signature is `signature`.
fn function_body<'a>(code: &'a str, signature: &str) -> &'a str {
    let start = code
        .find(&format!("{signature}\n{{\n"))
        .unwrap_or_else(|| panic!("no definition of `{signature}` in\n{code}"));
    let rest = &code[start..];
    let end = rest.find("\n}\n").map_or(rest.len(), |end| end + 3);
    &rest[..end]
}

/// Copy of value reference 0, for element-wise plans.
fn copy_of_bound(b: &mut ModuleBuilder, ty: Typespec) -> ExprId {
    let copied_value = b.value_ref(0, ty.clone());
    b.expr(ExprKind::TrivialCopyConstruct { copied_value }, ty, ValueCategory::Rvalue)
}

fn relocation_of_bound(b: &mut ModuleBuilder, ty: Typespec) -> ExprId {
    let value = b.value_ref(0, ty.clone());
    b.expr(ExprKind::TrivialRelocate { value }, ty, ValueCategory::Rvalue)
}

/// `VR1 = VR0` for element-wise assignment plans.
fn assign_of_bound(b: &mut ModuleBuilder, ty: Typespec) -> ExprId {
    let lhs = b.value_ref(1, ty.clone());
    let rhs = b.value_ref(0, ty.clone());
    b.expr(ExprKind::TrivialAssign { lhs, rhs }, ty, ValueCategory::Lvalue)
}

fn swap_of_bound(b: &mut ModuleBuilder, ty: Typespec) -> ExprId {
    let lhs = b.value_ref(1, ty.clone());
    let rhs = b.value_ref(0, ty);
    b.expr(ExprKind::TrivialSwap { lhs, rhs }, Typespec::Void, ValueCategory::None)
}

fn defer(b: &mut ModuleBuilder, call: ExprId) -> StmtId {
    b.stmt(Stmt::Defer(DestructOperation::new(DestructKind::Defer(call))))
}

// ── Functions and the entry point ───────────────────────────────────

#[test]
fn entry_returning_int_gets_a_main_wrapper() {
    let mut b = ModuleBuilder::new();
    let answer = b.int(42);
    let body = vec![b.ret(Some(answer))];
    let entry = b.function("answer", Vec::new(), int_type(), body);
    b.module.set_entry(entry);

    let code = b.generate();
    assert!(code.contains("static t_int32 f_0(void);\n"));
    assert_eq!(
        function_body(&code, "static t_int32 f_0(void)"),
        "static t_int32 f_0(void)\n{\n\treturn 42;\n}\n"
    );
    assert!(code.ends_with("int main(void)\n{\n\treturn (int)f_0();\n}\n\n"));
}

#[test]
fn void_entry_returns_zero_from_main() {
    let mut b = ModuleBuilder::new();
    let entry = b.function("run", Vec::new(), Typespec::Void, Vec::new());
    b.module.set_entry(entry);

    let code = b.generate();
    assert!(code.contains("static void f_0(void)\n{\n}\n"));
    assert!(code.contains("int main(void)\n{\n\tf_0();\n\treturn 0;\n}\n"));
}

#[test]
fn entry_named_main_is_not_wrapped() {
    let mut b = ModuleBuilder::new();
    let zero = b.int(0);
    let body = vec![b.ret(Some(zero))];
    let entry = b
        .module
        .alloc_function(Function::new("main", Vec::new(), int_type()).with_body(body).with_symbol_name("main"));
    b.module.set_entry(entry);

    let code = b.generate();
    assert!(code.contains("t_int32 main(void);\n"));
    assert!(code.contains("t_int32 main(void)\n{\n\treturn 0;\n}\n"));
    assert_eq!(code.matches("main(void)\n{").count(), 1);
}

#[test]
fn falling_off_the_end() {
    let mut b = ModuleBuilder::new();
    let helper = b.function("helper", Vec::new(), int_type(), Vec::new());
    let entry = b.function("entry", Vec::new(), int_type(), Vec::new());
    b.module.add_root(helper);
    b.module.set_entry(entry);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static t_int32 f_0(void)"),
        "static t_int32 f_0(void)\n{\n\t__builtin_unreachable();\n}\n"
    );
    assert_eq!(
        function_body(&code, "static t_int32 f_1(void)"),
        "static t_int32 f_1(void)\n{\n\treturn 0;\n}\n"
    );
}

#[test]
fn recursive_functions_are_emitted_once() {
    let mut b = ModuleBuilder::new();
    let n = b.param("n", int_type());
    let func = b.function("spin", vec![n], int_type(), Vec::new());
    let arg = b.var_ref(n);
    let call = b.call(func, vec![arg]);
    let body = vec![b.ret(Some(call))];
    b.module.set_function_body(func, body);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(code.matches("static t_int32 f_0(t_int32);\n").count(), 1);
    assert_eq!(
        function_body(&code, "static t_int32 f_0(t_int32 v_0)"),
        "static t_int32 f_0(t_int32 v_0)\n{\n\
         \tt_int32 v_1 = f_0(v_0);\n\
         \treturn v_1;\n\
         }\n"
    );
    assert_eq!(code.matches("f_0(t_int32 v_0)\n{").count(), 1);
}

#[test]
fn unreachable_functions_are_not_emitted() {
    let mut b = ModuleBuilder::new();
    let used = b.function("used", Vec::new(), Typespec::Void, Vec::new());
    b.function("unused", Vec::new(), Typespec::Void, Vec::new());
    b.module.add_root(used);

    let code = b.generate();
    assert!(code.contains("static void f_0(void)\n{\n}\n"));
    assert!(!code.contains("f_1"));
}

#[test]
fn operands_are_evaluated_into_locals() {
    let mut b = ModuleBuilder::new();
    let x = b.param("x", int_type());
    let y = b.param("y", int_type());
    let (x_ref, y_ref) = (b.var_ref(x), b.var_ref(y));
    let product = b.binary(BinaryOp::Mul, x_ref, y_ref, int_type());
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, product, one, int_type());
    let body = vec![b.ret(Some(sum))];
    let func = b.function("f", vec![x, y], int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("static t_int32 f_0(t_int32, t_int32);\n"));
    assert_eq!(
        function_body(&code, "static t_int32 f_0(t_int32 v_0, t_int32 v_1)"),
        "static t_int32 f_0(t_int32 v_0, t_int32 v_1)\n{\n\
         \tt_int32 v_2 = v_0 * v_1;\n\
         \tt_int32 v_3 = v_2 + 1;\n\
         \treturn v_3;\n\
         }\n"
    );
}

#[test]
fn left_operand_is_pinned_before_a_complex_right_operand() {
    let mut b = ModuleBuilder::new();
    let x = b.param("x", int_type());
    let x_ref = b.var_ref(x);
    let (x_again, two) = (b.var_ref(x), b.int(2));
    let doubled = b.binary(BinaryOp::Mul, x_again, two, int_type());
    let sum = b.binary(BinaryOp::Add, x_ref, doubled, int_type());
    let body = vec![b.ret(Some(sum))];
    let func = b.function("f", vec![x], int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains(
        "\tt_int32 v_1 = v_0;\n\
         \tt_int32 v_2 = v_0 * 2;\n\
         \tt_int32 v_3 = v_1 + v_2;\n"
    ));
}

// ── Control flow ────────────────────────────────────────────────────

#[test]
fn while_loop_and_if_else() {
    let mut b = ModuleBuilder::new();
    let n = b.param("n", int_type());
    let zero = b.int(0);
    let (i, decl_i) = b.local(VarDecl::new("i", int_type()).with_init(zero));

    let (i_ref, n_ref) = (b.var_ref(i), b.var_ref(n));
    let condition = b.binary(BinaryOp::Lt, i_ref, n_ref, bool_type());
    let (i_ref, one) = (b.var_ref(i), b.int(1));
    let increment = b.binary(BinaryOp::AddAssign, i_ref, one, int_type());
    let increment = b.expr_stmt(increment);
    let loop_body = b.block(vec![increment]);
    let while_loop = b.stmt(Stmt::While { condition, body: loop_body });

    let (i_ref, n_ref) = (b.var_ref(i), b.var_ref(n));
    let equal = b.binary(BinaryOp::Eq, i_ref, n_ref, bool_type());
    let (one, two) = (b.int(1), b.int(2));
    let (return_one, return_two) = (b.ret(Some(one)), b.ret(Some(two)));
    let then_block = b.block(vec![return_one]);
    let else_block = b.block(vec![return_two]);
    let branch = b.expr(
        ExprKind::If { condition: equal, then_block, else_block: Some(else_block) },
        Typespec::Void,
        ValueCategory::None,
    );
    let branch = b.expr_stmt(branch);

    let func = b.function("count", vec![n], int_type(), vec![decl_i, while_loop, branch]);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static t_int32 f_0(t_int32 v_0)"),
        "static t_int32 f_0(t_int32 v_0)\n{\n\
         \tt_int32 v_1 = 0;\n\
         \twhile (1)\n\
         \t{\n\
         \t\tt_bool v_2 = v_1 < v_0;\n\
         \t\tif (!v_2)\n\
         \t\t{\n\
         \t\t\tbreak;\n\
         \t\t}\n\
         \t\tv_1 += 1;\n\
         \t}\n\
         \tt_bool v_3 = v_1 == v_0;\n\
         \tif (v_3)\n\
         \t{\n\
         \t\treturn 1;\n\
         \t}\n\
         \telse\n\
         \t{\n\
         \t\treturn 2;\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn break_inside_a_switch_leaves_through_a_label() {
    let mut b = ModuleBuilder::new();
    let x = b.param("x", int_type());
    let matched = b.var_ref(x);
    let leave = b.expr(ExprKind::Break, Typespec::Void, ValueCategory::Noreturn);
    let switch = b.expr(
        ExprKind::Switch {
            matched,
            cases: vec![SwitchCase { values: vec![ConstantValue::Sint(1)], expr: leave }],
            default_case: None,
            is_complete: false,
        },
        Typespec::Void,
        ValueCategory::None,
    );
    let switch = b.expr_stmt(switch);
    let body = b.block(vec![switch]);
    let forever = b.stmt(Stmt::For { init: None, condition: None, iteration: None, body });
    let func = b.function("f", vec![x], Typespec::Void, vec![forever]);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static void f_0(t_int32 v_0)"),
        "static void f_0(t_int32 v_0)\n{\n\
         \twhile (1)\n\
         \t{\n\
         \t\tswitch (v_0)\n\
         \t\t{\n\
         \t\t\tcase 1:\n\
         \t\t\t{\n\
         \t\t\t\tgoto l_1;\n\
         \t\t\t}\n\
         \t\t}\n\
         \t}\n\
         \tl_1:;\n\
         }\n"
    );
}

#[test]
fn continue_runs_the_iteration_expression() {
    let mut b = ModuleBuilder::new();
    let zero = b.int(0);
    let (i, decl_i) = b.local(VarDecl::new("i", int_type()).with_init(zero));
    let (i_ref, ten) = (b.var_ref(i), b.int(10));
    let condition = b.binary(BinaryOp::Lt, i_ref, ten, bool_type());
    let (i_ref, one) = (b.var_ref(i), b.int(1));
    let iteration = b.binary(BinaryOp::AddAssign, i_ref, one, int_type());

    let (i_ref, five) = (b.var_ref(i), b.int(5));
    let is_five = b.binary(BinaryOp::Eq, i_ref, five, bool_type());
    let skip = b.expr(ExprKind::Continue, Typespec::Void, ValueCategory::Noreturn);
    let branch = b.expr(
        ExprKind::If { condition: is_five, then_block: skip, else_block: None },
        Typespec::Void,
        ValueCategory::None,
    );
    let branch = b.expr_stmt(branch);
    let body = b.block(vec![branch]);
    let for_loop = b.stmt(Stmt::For {
        init: Some(decl_i),
        condition: Some(condition),
        iteration: Some(iteration),
        body,
    });
    let func = b.function("f", Vec::new(), Typespec::Void, vec![for_loop]);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\
         \tt_int32 v_0 = 0;\n\
         \twhile (1)\n\
         \t{\n\
         \t\tt_bool v_1 = v_0 < 10;\n\
         \t\tif (!v_1)\n\
         \t\t{\n\
         \t\t\tbreak;\n\
         \t\t}\n\
         \t\tt_bool v_2 = v_0 == 5;\n\
         \t\tif (v_2)\n\
         \t\t{\n\
         \t\t\tgoto l_3;\n\
         \t\t}\n\
         \t\tl_3:;\n\
         \t\tv_0 += 1;\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn string_switch_compares_length_then_bytes() {
    let mut b = ModuleBuilder::new();
    let s = b.param("s", Typespec::Str);
    let matched = b.var_ref(s);
    let (zero, one, two) = (b.int(0), b.int(1), b.int(2));
    let switch = b.expr(
        ExprKind::Switch {
            matched,
            cases: vec![
                SwitchCase { values: vec![ConstantValue::Str(String::new())], expr: zero },
                SwitchCase {
                    values: vec![ConstantValue::Str("ab".into()), ConstantValue::Str("cd".into())],
                    expr: one,
                },
            ],
            default_case: Some(two),
            is_complete: false,
        },
        int_type(),
        ValueCategory::Rvalue,
    );
    let body = vec![b.ret(Some(switch))];
    let func = b.function("classify", vec![s], int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.starts_with("#include <string.h>\n"));
    assert!(code.contains("static t_uint8 const s_0[] = \"ab\";\n"));
    assert!(code.contains("static t_uint8 const s_1[] = \"cd\";\n"));
    assert_eq!(
        function_body(&code, "static t_int32 f_0(t_0 v_0)"),
        "static t_int32 f_0(t_0 v_0)\n{\n\
         \tt_int32 v_1;\n\
         \tif (v_0.m_1 - v_0.m_0 == 0)\n\
         \t{\n\
         \t\tv_1 = 0;\n\
         \t}\n\
         \telse if ((v_0.m_1 - v_0.m_0 == 2 && memcmp(v_0.m_0, s_0, 2) == 0) \
         || (v_0.m_1 - v_0.m_0 == 2 && memcmp(v_0.m_0, s_1, 2) == 0))\n\
         \t{\n\
         \t\tv_1 = 1;\n\
         \t}\n\
         \telse\n\
         \t{\n\
         \t\tv_1 = 2;\n\
         \t}\n\
         \treturn v_1;\n\
         }\n"
    );
}

// ── Calls and value semantics ───────────────────────────────────────

#[test]
fn non_relocatable_values_cross_calls_by_pointer() {
    let mut b = ModuleBuilder::new();
    let buffer = b.aggregate("Buffer", vec![int_type()], TypeTraits::empty());
    let consume = b.external("consume", vec![buffer.clone()], Typespec::Void);
    let drop_buffer = b.external("drop_buffer", vec![Typespec::reference(buffer.clone(), true)], Typespec::Void);

    // caller() { consume(Buffer { 5 }); }
    let five = b.int(5);
    let init = b.expr(ExprKind::AggregateInit { exprs: vec![five] }, buffer.clone(), ValueCategory::Rvalue);
    let call = b.call(consume, vec![init]);
    let body = vec![b.expr_stmt(call)];
    let caller = b.function("caller", Vec::new(), Typespec::Void, body);

    // take(b: Buffer) -> i32 { return b.m0; }, destroying `b` on the way out.
    let param = b.param("b", buffer.clone());
    let param_ref = b.var_ref(param);
    let destroy = b.call(drop_buffer, vec![param_ref]);
    b.module
        .set_var_destruction(param, DestructOperation::new(DestructKind::Variable { call: destroy }));
    let base = b.var_ref(param);
    let member = b.expr(ExprKind::MemberAccess { base, index: 0 }, int_type(), ValueCategory::Lvalue);
    let body = vec![b.ret(Some(member))];
    let take = b.function("take", vec![param], int_type(), body);

    b.module.add_root(caller);
    b.module.add_root(take);

    let code = b.generate();
    assert!(code.contains("struct t_0\n{\n\tt_int32 m_0;\n};\n"));
    assert!(code.contains("static t_int32 f_1(t_0*);\n"));
    assert!(code.contains("void consume(t_0*);\n"));
    assert!(code.contains("void drop_buffer(t_0*);\n"));
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\
         \tt_0 v_0;\n\
         \tv_0.m_0 = 5;\n\
         \tconsume(&v_0);\n\
         }\n"
    );
    assert_eq!(
        function_body(&code, "static t_int32 f_1(t_0* v_0)"),
        "static t_int32 f_1(t_0* v_0)\n{\n\
         \tt_int32 v_1 = v_0->m_0;\n\
         \tdrop_buffer(v_0);\n\
         \treturn v_1;\n\
         }\n"
    );
}

#[test]
fn non_relocatable_results_are_built_in_caller_storage() {
    let mut b = ModuleBuilder::new();
    let buffer = b.aggregate("Buffer", vec![int_type()], TypeTraits::empty());

    let five = b.int(5);
    let init = b.expr(ExprKind::AggregateInit { exprs: vec![five] }, buffer.clone(), ValueCategory::Rvalue);
    let body = vec![b.ret(Some(init))];
    let make = b.function("make", Vec::new(), buffer.clone(), body);

    let call = b.call(make, Vec::new());
    let (_, decl) = b.local(VarDecl::new("b", buffer).with_init(call));
    let user = b.function("user", Vec::new(), Typespec::Void, vec![decl]);
    b.module.add_root(user);

    let code = b.generate();
    assert!(code.contains("static void f_1(t_0*);\n"));
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\tt_0 v_0;\n\tf_1(&v_0);\n}\n"
    );
    assert_eq!(
        function_body(&code, "static void f_1(t_0* v_0)"),
        "static void f_1(t_0* v_0)\n{\n\tv_0->m_0 = 5;\n\treturn;\n}\n"
    );
}

#[test]
fn libc_functions_are_included_not_declared() {
    let mut b = ModuleBuilder::new();
    let p = b.param("p", int_type());
    let abs = b
        .module
        .alloc_function(Function::new("abs", vec![p], int_type()).with_libc_header("stdlib.h"));
    let x = b.param("x", int_type());
    let arg = b.var_ref(x);
    let call = b.call(abs, vec![arg]);
    let body = vec![b.ret(Some(call))];
    let func = b.function("magnitude", vec![x], int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.starts_with("#include <stdlib.h>\n"));
    assert!(!code.contains("abs(t_int32);"));
    assert!(function_body(&code, "static t_int32 f_0(t_int32 v_0)").contains("\tt_int32 v_1 = abs(v_0);\n"));
}

#[test]
fn calls_through_function_pointers() {
    let mut b = ModuleBuilder::new();
    let fn_type = Typespec::function(int_type(), vec![int_type()]);

    // apply(f, x) -> i32 { return f(x); }
    let f = b.param("f", fn_type.clone());
    let x = b.param("x", int_type());
    let (callee, arg) = (b.var_ref(f), b.var_ref(x));
    let call = b.expr(
        ExprKind::IndirectCall { callee, args: vec![arg] },
        int_type(),
        ValueCategory::Rvalue,
    );
    let body = vec![b.ret(Some(call))];
    let apply = b.function("apply", vec![f, x], int_type(), body);

    // user() -> i32 { return apply(double, 3); }
    let y = b.param("y", int_type());
    let (y_ref, two) = (b.var_ref(y), b.int(2));
    let doubled = b.binary(BinaryOp::Mul, y_ref, two, int_type());
    let body = vec![b.ret(Some(doubled))];
    let double = b.function("double", vec![y], int_type(), body);
    let double_ref = b.expr(ExprKind::FunctionRef(double), fn_type, ValueCategory::Rvalue);
    let three = b.int(3);
    let call = b.call(apply, vec![double_ref, three]);
    let body = vec![b.ret(Some(call))];
    let user = b.function("user", Vec::new(), int_type(), body);

    b.module.add_root(apply);
    b.module.add_root(user);

    let code = b.generate();
    assert!(code.contains("typedef t_int32 (*t_0)(t_int32);\n"));
    assert_eq!(
        function_body(&code, "static t_int32 f_0(t_0 v_0, t_int32 v_1)"),
        "static t_int32 f_0(t_0 v_0, t_int32 v_1)\n{\n\
         \tt_int32 v_2 = v_0(v_1);\n\
         \treturn v_2;\n\
         }\n"
    );
    assert!(function_body(&code, "static t_int32 f_1(void)").contains("\tt_int32 v_0 = f_0(f_2, 3);\n"));
    assert!(code.contains("static t_int32 f_2(t_int32 v_0)\n{\n"));
}

#[test]
fn aggregate_assignment_skips_self_assignment() {
    let mut b = ModuleBuilder::new();
    let pair = b.aggregate("Pair", vec![int_type(), int_type()], TypeTraits::TRIVIAL);
    let x = b.param("x", Typespec::reference(pair.clone(), true));
    let y = b.param("y", Typespec::reference(pair.clone(), false));
    let member_assigns: Vec<_> = (0..2)
        .map(|_| {
            let lhs = b.value_ref(1, int_type());
            let rhs = b.value_ref(0, int_type());
            b.expr(ExprKind::TrivialAssign { lhs, rhs }, int_type(), ValueCategory::Lvalue)
        })
        .collect();
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(y));
    let assign = b.expr(
        ExprKind::AggregateAssign { lhs, rhs, assign_exprs: member_assigns },
        pair,
        ValueCategory::Lvalue,
    );
    let body = vec![b.expr_stmt(assign)];
    let func = b.function("assign", vec![x, y], Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("struct t_0\n{\n\tt_int32 m_0;\n\tt_int32 m_1;\n};\n"));
    assert_eq!(
        function_body(&code, "static void f_0(t_0* v_0, t_0 const * v_1)"),
        "static void f_0(t_0* v_0, t_0 const * v_1)\n{\n\
         \tif (v_0 != v_1)\n\
         \t{\n\
         \t\tv_0->m_0 = v_1->m_0;\n\
         \t\tv_0->m_1 = v_1->m_1;\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn copy_construction_is_guarded_member_by_member() {
    let mut b = ModuleBuilder::new();
    let point = b.aggregate(
        "Point",
        vec![int_type(), Typespec::builtin(BuiltinKind::F64)],
        TypeTraits::TRIVIAL,
    );
    let x = b.param("x", Typespec::reference(point.clone(), false));
    let copy_exprs = [int_type(), Typespec::builtin(BuiltinKind::F64)]
        .into_iter()
        .map(|ty| {
            let copied_value = b.value_ref(0, ty.clone());
            b.expr(ExprKind::TrivialCopyConstruct { copied_value }, ty, ValueCategory::Rvalue)
        })
        .collect();
    let copied_value = b.var_ref(x);
    let init = b.expr(
        ExprKind::AggregateCopyConstruct { copied_value, copy_exprs },
        point.clone(),
        ValueCategory::Rvalue,
    );
    let (_, decl) = b.local(VarDecl::new("y", point).with_init(init));
    let func = b.function("copy", vec![x], Typespec::Void, vec![decl]);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("struct t_0\n{\n\tt_int32 m_0;\n\tt_float64 m_1;\n};\n"));
    assert_eq!(
        function_body(&code, "static void f_0(t_0 const * v_0)"),
        "static void f_0(t_0 const * v_0)\n{\n\
         \tt_0 v_1;\n\
         \tif (&v_1 != v_0)\n\
         \t{\n\
         \t\tv_1.m_0 = v_0->m_0;\n\
         \t\tv_1.m_1 = v_0->m_1;\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn swaps_are_skipped_for_the_same_storage() {
    let mut b = ModuleBuilder::new();
    let pair = b.aggregate("Pair", vec![int_type(), int_type()], TypeTraits::TRIVIAL);
    let x = b.param("x", Typespec::reference(pair.clone(), true));
    let y = b.param("y", Typespec::reference(pair, true));
    let swap_exprs: Vec<_> = (0..2)
        .map(|_| {
            let lhs = b.value_ref(1, int_type());
            let rhs = b.value_ref(0, int_type());
            b.expr(ExprKind::TrivialSwap { lhs, rhs }, Typespec::Void, ValueCategory::None)
        })
        .collect();
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(y));
    let swap = b.expr(ExprKind::AggregateSwap { lhs, rhs, swap_exprs }, Typespec::Void, ValueCategory::None);
    let body = vec![b.expr_stmt(swap)];
    let func = b.function("swap", vec![x, y], Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static void f_0(t_0* v_0, t_0* v_1)"),
        "static void f_0(t_0* v_0, t_0* v_1)\n{\n\
         \tif (v_0 != v_1)\n\
         \t{\n\
         \t\tif (&v_0->m_0 != &v_1->m_0)\n\
         \t\t{\n\
         \t\t\tt_int32 v_2 = v_0->m_0;\n\
         \t\t\tv_0->m_0 = v_1->m_0;\n\
         \t\t\tv_1->m_0 = v_2;\n\
         \t\t}\n\
         \t\tif (&v_0->m_1 != &v_1->m_1)\n\
         \t\t{\n\
         \t\t\tt_int32 v_3 = v_0->m_1;\n\
         \t\t\tv_0->m_1 = v_1->m_1;\n\
         \t\t\tv_1->m_1 = v_3;\n\
         \t\t}\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn pointer_optionals_are_bare_pointers() {
    let mut b = ModuleBuilder::new();
    let maybe_pointer = b.param("p", Typespec::optional(Typespec::pointer(int_type(), false)));
    let maybe_int = b.param("i", Typespec::optional(int_type()));
    let func = b.function("take", vec![maybe_pointer, maybe_int], Typespec::Void, Vec::new());
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("struct t_0\n{\n\tt_int32 m_0;\n\tt_bool m_1;\n};\n"));
    assert!(code.contains("static void f_0(t_int32 const *, t_0);\n"));
}

// ── Optionals, arrays and base types ────────────────────────────────

#[test]
fn optional_swap_reads_both_flags_before_branching() {
    let mut b = ModuleBuilder::new();
    let optional = Typespec::optional(int_type());
    let x = b.param("x", Typespec::reference(optional.clone(), true));
    let y = b.param("y", Typespec::reference(optional, true));
    let value_swap_expr = swap_of_bound(&mut b, int_type());
    let lhs_move_expr = relocation_of_bound(&mut b, int_type());
    let rhs_move_expr = relocation_of_bound(&mut b, int_type());
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(y));
    let swap = b.expr(
        ExprKind::OptionalSwap { lhs, rhs, value_swap_expr, lhs_move_expr, rhs_move_expr },
        Typespec::Void,
        ValueCategory::None,
    );
    let body = vec![b.expr_stmt(swap)];
    let func = b.function("swap", vec![x, y], Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("struct t_0\n{\n\tt_int32 m_0;\n\tt_bool m_1;\n};\n"));
    assert_eq!(
        function_body(&code, "static void f_0(t_0* v_0, t_0* v_1)"),
        "static void f_0(t_0* v_0, t_0* v_1)\n{\n\
         \tif (v_0 != v_1)\n\
         \t{\n\
         \t\tt_bool v_2 = v_0->m_1;\n\
         \t\tt_bool v_3 = v_1->m_1;\n\
         \t\tif (v_2 && v_3)\n\
         \t\t{\n\
         \t\t\tif (&v_0->m_0 != &v_1->m_0)\n\
         \t\t\t{\n\
         \t\t\t\tt_int32 v_4 = v_0->m_0;\n\
         \t\t\t\tv_0->m_0 = v_1->m_0;\n\
         \t\t\t\tv_1->m_0 = v_4;\n\
         \t\t\t}\n\
         \t\t}\n\
         \t\telse if (v_2)\n\
         \t\t{\n\
         \t\t\tv_1->m_0 = v_0->m_0;\n\
         \t\t\tv_0->m_1 = 0;\n\
         \t\t\tv_1->m_1 = 1;\n\
         \t\t}\n\
         \t\telse if (v_3)\n\
         \t\t{\n\
         \t\t\tv_0->m_0 = v_1->m_0;\n\
         \t\t\tv_0->m_1 = 1;\n\
         \t\t\tv_1->m_1 = 0;\n\
         \t\t}\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn optional_assignment_covers_every_flag_combination() {
    let mut b = ModuleBuilder::new();
    let optional = Typespec::optional(int_type());
    let release = b.external("release", vec![Typespec::reference(int_type(), true)], Typespec::Void);
    let x = b.param("x", Typespec::reference(optional.clone(), true));
    let y = b.param("y", Typespec::reference(optional.clone(), false));
    let value_assign_expr = assign_of_bound(&mut b, int_type());
    let value_construct_expr = copy_of_bound(&mut b, int_type());
    let bound = b.value_ref(0, int_type());
    let value_destruct_expr = b.call(release, vec![bound]);
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(y));
    let assign = b.expr(
        ExprKind::OptionalAssign { lhs, rhs, value_assign_expr, value_construct_expr, value_destruct_expr },
        optional,
        ValueCategory::Lvalue,
    );
    let body = vec![b.expr_stmt(assign)];
    let func = b.function("assign", vec![x, y], Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("void release(t_int32*);\n"));
    assert_eq!(
        function_body(&code, "static void f_0(t_0* v_0, t_0 const * v_1)"),
        "static void f_0(t_0* v_0, t_0 const * v_1)\n{\n\
         \tif (v_0 != v_1)\n\
         \t{\n\
         \t\tt_bool v_2 = v_0->m_1;\n\
         \t\tt_bool v_3 = v_1->m_1;\n\
         \t\tif (v_2 && v_3)\n\
         \t\t{\n\
         \t\t\tv_0->m_0 = v_1->m_0;\n\
         \t\t}\n\
         \t\telse if (v_2)\n\
         \t\t{\n\
         \t\t\trelease(&v_0->m_0);\n\
         \t\t\tv_0->m_1 = 0;\n\
         \t\t}\n\
         \t\telse if (v_3)\n\
         \t\t{\n\
         \t\t\tv_0->m_0 = v_1->m_0;\n\
         \t\t\tv_0->m_1 = 1;\n\
         \t\t}\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn optional_null_and_value_assignment() {
    let mut b = ModuleBuilder::new();
    let optional = Typespec::optional(int_type());
    let optional_pointer = Typespec::optional(Typespec::pointer(int_type(), true));
    let release = b.external("release", vec![Typespec::reference(int_type(), true)], Typespec::Void);
    let x = b.param("x", Typespec::reference(optional.clone(), true));
    let v = b.param("v", int_type());
    let p = b.param("p", Typespec::reference(optional_pointer.clone(), true));

    // x = null, destroying the payload first.
    let bound = b.value_ref(0, int_type());
    let destroy = b.call(release, vec![bound]);
    let (lhs, rhs) = (b.var_ref(x), b.constant(ConstantValue::Null, optional.clone()));
    let clear = b.expr(
        ExprKind::OptionalNullAssign { lhs, rhs, value_destruct_expr: Some(destroy) },
        optional.clone(),
        ValueCategory::Lvalue,
    );

    // x = v
    let value_assign_expr = assign_of_bound(&mut b, int_type());
    let value_construct_expr = copy_of_bound(&mut b, int_type());
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(v));
    let set = b.expr(
        ExprKind::OptionalValueAssign { lhs, rhs, value_assign_expr, value_construct_expr },
        optional,
        ValueCategory::Lvalue,
    );

    // p = null
    let (lhs, rhs) = (b.var_ref(p), b.constant(ConstantValue::Null, optional_pointer.clone()));
    let clear_pointer = b.expr(
        ExprKind::OptionalNullAssign { lhs, rhs, value_destruct_expr: None },
        optional_pointer,
        ValueCategory::Lvalue,
    );

    let body = vec![b.expr_stmt(clear), b.expr_stmt(set), b.expr_stmt(clear_pointer)];
    let func = b.function("update", vec![x, v, p], Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("static void f_0(t_0*, t_int32, t_int32**);\n"));
    assert_eq!(
        function_body(&code, "static void f_0(t_0* v_0, t_int32 v_1, t_int32** v_2)"),
        "static void f_0(t_0* v_0, t_int32 v_1, t_int32** v_2)\n{\n\
         \tif (v_0->m_1)\n\
         \t{\n\
         \t\trelease(&v_0->m_0);\n\
         \t\tv_0->m_1 = 0;\n\
         \t}\n\
         \tif (v_0->m_1)\n\
         \t{\n\
         \t\tv_0->m_0 = v_1;\n\
         \t}\n\
         \telse\n\
         \t{\n\
         \t\tv_0->m_0 = v_1;\n\
         \t\tv_0->m_1 = 1;\n\
         \t}\n\
         \t*v_2 = 0;\n\
         }\n"
    );
}

#[test]
fn optional_copy_construction_copies_the_flag_then_the_value() {
    let mut b = ModuleBuilder::new();
    let optional = Typespec::optional(int_type());
    let x = b.param("x", Typespec::reference(optional.clone(), false));
    let value_copy_expr = copy_of_bound(&mut b, int_type());
    let copied_value = b.var_ref(x);
    let init = b.expr(
        ExprKind::OptionalCopyConstruct { copied_value, value_copy_expr },
        optional.clone(),
        ValueCategory::Rvalue,
    );
    let (_, decl) = b.local(VarDecl::new("y", optional).with_init(init));
    let func = b.function("copy", vec![x], Typespec::Void, vec![decl]);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static void f_0(t_0 const * v_0)"),
        "static void f_0(t_0 const * v_0)\n{\n\
         \tt_0 v_1;\n\
         \tif (&v_1 != v_0)\n\
         \t{\n\
         \t\tv_1.m_1 = v_0->m_1;\n\
         \t\tif (v_0->m_1)\n\
         \t\t{\n\
         \t\t\tv_1.m_0 = v_0->m_0;\n\
         \t\t}\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn array_plans_loop_over_the_elements() {
    let mut b = ModuleBuilder::new();
    let array = Typespec::array(int_type(), 3);
    let release = b.external("release", vec![Typespec::reference(int_type(), true)], Typespec::Void);
    let x = b.param("x", Typespec::reference(array.clone(), true));
    let y = b.param("y", Typespec::reference(array.clone(), false));
    let z = b.param("z", Typespec::reference(array.clone(), true));

    // x = y
    let assign_expr = assign_of_bound(&mut b, int_type());
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(y));
    let assign = b.expr(ExprKind::ArrayAssign { lhs, rhs, assign_expr }, array.clone(), ValueCategory::Lvalue);

    // swap(x, z)
    let swap_expr = swap_of_bound(&mut b, int_type());
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(z));
    let swap = b.expr(ExprKind::ArraySwap { lhs, rhs, swap_expr }, Typespec::Void, ValueCategory::None);

    // w := copy of y, destroyed element by element.
    let copy_expr = copy_of_bound(&mut b, int_type());
    let copied_value = b.var_ref(y);
    let init = b.expr(ExprKind::ArrayCopyConstruct { copied_value, copy_expr }, array.clone(), ValueCategory::Rvalue);
    let (w, decl_w) = b.local(VarDecl::new("w", array).with_init(init));
    let bound = b.value_ref(0, int_type());
    let elem_destruct_call = b.call(release, vec![bound]);
    let value = b.var_ref(w);
    let destroy = b.expr(ExprKind::ArrayDestruct { value, elem_destruct_call }, Typespec::Void, ValueCategory::None);

    let body = vec![b.expr_stmt(assign), b.expr_stmt(swap), decl_w, b.expr_stmt(destroy)];
    let func = b.function("shuffle", vec![x, y, z], Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("struct t_0\n{\n\tt_int32 a[3];\n};\n"));
    assert_eq!(
        function_body(&code, "static void f_0(t_0* v_0, t_0 const * v_1, t_0* v_2)"),
        "static void f_0(t_0* v_0, t_0 const * v_1, t_0* v_2)\n{\n\
         \tif (v_0 != v_1)\n\
         \t{\n\
         \t\tt_uint64 v_3 = 0;\n\
         \t\twhile (v_3 < 3)\n\
         \t\t{\n\
         \t\t\tv_0->a[v_3] = v_1->a[v_3];\n\
         \t\t\t++v_3;\n\
         \t\t}\n\
         \t}\n\
         \tif (v_0 != v_2)\n\
         \t{\n\
         \t\tt_uint64 v_4 = 0;\n\
         \t\twhile (v_4 < 3)\n\
         \t\t{\n\
         \t\t\tif (&v_0->a[v_4] != &v_2->a[v_4])\n\
         \t\t\t{\n\
         \t\t\t\tt_int32 v_5 = v_0->a[v_4];\n\
         \t\t\t\tv_0->a[v_4] = v_2->a[v_4];\n\
         \t\t\t\tv_2->a[v_4] = v_5;\n\
         \t\t\t}\n\
         \t\t\t++v_4;\n\
         \t\t}\n\
         \t}\n\
         \tt_0 v_6;\n\
         \tif (&v_6 != v_1)\n\
         \t{\n\
         \t\tt_uint64 v_7 = 0;\n\
         \t\twhile (v_7 < 3)\n\
         \t\t{\n\
         \t\t\tv_6.a[v_7] = v_1->a[v_7];\n\
         \t\t\t++v_7;\n\
         \t\t}\n\
         \t}\n\
         \tt_uint64 v_8 = 3;\n\
         \twhile (v_8 != 0)\n\
         \t{\n\
         \t\t--v_8;\n\
         \t\trelease(&v_6.a[v_8]);\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn base_type_swap_and_assign_go_through_the_plans() {
    let mut b = ModuleBuilder::new();
    let handle = b.aggregate("Handle", vec![int_type()], TypeTraits::empty());
    let drop_handle = b.external("drop_handle", vec![Typespec::reference(handle.clone(), true)], Typespec::Void);
    let x = b.param("x", Typespec::reference(handle.clone(), true));
    let y = b.param("y", Typespec::reference(handle.clone(), true));

    let lhs_move_expr = relocation_of_bound(&mut b, handle.clone());
    let rhs_move_expr = relocation_of_bound(&mut b, handle.clone());
    let temp_move_expr = relocation_of_bound(&mut b, handle.clone());
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(y));
    let swap = b.expr(
        ExprKind::BaseTypeSwap { lhs, rhs, lhs_move_expr, rhs_move_expr, temp_move_expr },
        Typespec::Void,
        ValueCategory::None,
    );

    let bound = b.value_ref(0, handle.clone());
    let lhs_destruct_expr = b.call(drop_handle, vec![bound]);
    let rhs_copy_expr = copy_of_bound(&mut b, handle.clone());
    let (lhs, rhs) = (b.var_ref(x), b.var_ref(y));
    let assign = b.expr(
        ExprKind::BaseTypeAssign { lhs, rhs, lhs_destruct_expr, rhs_copy_expr },
        handle,
        ValueCategory::Lvalue,
    );

    let body = vec![b.expr_stmt(swap), b.expr_stmt(assign)];
    let func = b.function("exchange", vec![x, y], Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("void drop_handle(t_0*);\n"));
    assert_eq!(
        function_body(&code, "static void f_0(t_0* v_0, t_0* v_1)"),
        "static void f_0(t_0* v_0, t_0* v_1)\n{\n\
         \tif (v_0 != v_1)\n\
         \t{\n\
         \t\tt_0 v_2;\n\
         \t\tv_2 = *v_0;\n\
         \t\t*v_0 = *v_1;\n\
         \t\t*v_1 = v_2;\n\
         \t}\n\
         \tif (v_0 != v_1)\n\
         \t{\n\
         \t\tdrop_handle(v_0);\n\
         \t\t*v_0 = *v_1;\n\
         \t}\n\
         }\n"
    );
}

// ── Access ──────────────────────────────────────────────────────────

#[test]
fn rvalue_member_access_moves_one_member_and_destroys_the_rest() {
    let mut b = ModuleBuilder::new();
    let pair = b.aggregate("Pair", vec![int_type(), int_type()], TypeTraits::TRIVIALLY_RELOCATABLE);
    let make = b.external("make", Vec::new(), pair.clone());
    let release = b.external("release", vec![Typespec::reference(int_type(), true)], Typespec::Void);

    let base = b.call(make, Vec::new());
    let moved = relocation_of_bound(&mut b, int_type());
    let bound = b.value_ref(0, int_type());
    let destroyed = b.call(release, vec![bound]);
    let access = b.expr(
        ExprKind::RvalueMemberAccess { base, index: 0, member_refs: vec![Some(moved), Some(destroyed)] },
        int_type(),
        ValueCategory::Rvalue,
    );
    let body = vec![b.ret(Some(access))];
    let func = b.function("first", Vec::new(), int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("t_0 make(void);\n"));
    assert_eq!(
        function_body(&code, "static t_int32 f_0(void)"),
        "static t_int32 f_0(void)\n{\n\
         \tt_0 v_0 = make();\n\
         \tt_int32 v_1;\n\
         \tv_1 = v_0.m_0;\n\
         \trelease(&v_0.m_1);\n\
         \treturn v_1;\n\
         }\n"
    );
}

#[test]
fn rvalue_array_subscript_destroys_the_other_elements() {
    let mut b = ModuleBuilder::new();
    let values = b.external("values", Vec::new(), Typespec::array(int_type(), 3));
    let release = b.external("release", vec![Typespec::reference(int_type(), true)], Typespec::Void);
    let i = b.param("i", Typespec::builtin(BuiltinKind::U64));

    let base = b.call(values, Vec::new());
    let index = b.var_ref(i);
    let bound = b.value_ref(0, int_type());
    let elem_call = b.call(release, vec![bound]);
    let subscript = b.expr(
        ExprKind::RvalueArraySubscript {
            base,
            index,
            elem_destruct_op: DestructOperation::new(DestructKind::RvalueArray { elem_call }),
        },
        int_type(),
        ValueCategory::Rvalue,
    );
    let body = vec![b.ret(Some(subscript))];
    let func = b.function("pick", vec![i], int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("t_0 values(void);\n"));
    assert_eq!(
        function_body(&code, "static t_int32 f_0(t_uint64 v_0)"),
        "static t_int32 f_0(t_uint64 v_0)\n{\n\
         \tt_0 v_1 = values();\n\
         \tt_int32* v_2 = &v_1.a[v_0];\n\
         \tt_int32 v_3 = *v_2;\n\
         \tt_uint64 v_4 = 3;\n\
         \twhile (v_4 != 0)\n\
         \t{\n\
         \t\t--v_4;\n\
         \t\tif (&v_1.a[v_4] != v_2)\n\
         \t\t{\n\
         \t\t\trelease(&v_1.a[v_4]);\n\
         \t\t}\n\
         \t}\n\
         \treturn v_3;\n\
         }\n"
    );
}

#[test]
fn tuple_literal_subscript_evaluates_every_element() {
    let mut b = ModuleBuilder::new();
    let first = b.external("first", Vec::new(), int_type());
    let second = b.external("second", Vec::new(), int_type());
    let elems = vec![b.call(first, Vec::new()), b.call(second, Vec::new())];
    let subscript = b.expr(ExprKind::TupleSubscript { elems, index: 1 }, int_type(), ValueCategory::Rvalue);
    let body = vec![b.ret(Some(subscript))];
    let func = b.function("f", Vec::new(), int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static t_int32 f_0(void)"),
        "static t_int32 f_0(void)\n{\n\
         \tt_int32 v_0 = first();\n\
         \tt_int32 v_1 = second();\n\
         \treturn v_1;\n\
         }\n"
    );
}

/// `pair()[index]` over an rvalue tuple whose first element needs no
/// cleanup.
fn rvalue_tuple_subscript(index: u64) -> ModuleBuilder {
    let mut b = ModuleBuilder::new();
    let pair = b.external("pair", Vec::new(), Typespec::Tuple(vec![int_type(), int_type()]));
    let base = b.call(pair, Vec::new());
    let moved = relocation_of_bound(&mut b, int_type());
    let subscript = b.expr(
        ExprKind::RvalueTupleSubscript { base, index, elem_refs: vec![None, Some(moved)] },
        int_type(),
        ValueCategory::Rvalue,
    );
    let body = vec![b.ret(Some(subscript))];
    let func = b.function("second", Vec::new(), int_type(), body);
    b.module.add_root(func);
    b
}

#[test]
fn rvalue_tuple_subscript_moves_the_selected_element() {
    let code = rvalue_tuple_subscript(1).generate();
    assert!(code.contains("t_0 pair(void);\n"));
    assert_eq!(
        function_body(&code, "static t_int32 f_0(void)"),
        "static t_int32 f_0(void)\n{\n\
         \tt_0 v_0 = pair();\n\
         \tt_int32 v_1;\n\
         \tv_1 = v_0.m_1;\n\
         \treturn v_1;\n\
         }\n"
    );
}

#[test]
#[should_panic(expected = "tuple subscript index 2 is out of range for 2 elements")]
fn rvalue_tuple_subscript_past_the_end_is_rejected() {
    rvalue_tuple_subscript(2).generate();
}

// ── Operators and conversions ───────────────────────────────────────

#[test]
fn logical_operators_short_circuit() {
    let mut b = ModuleBuilder::new();
    let x = b.param("x", int_type());
    let (x_ref, zero) = (b.var_ref(x), b.int(0));
    let positive = b.binary(BinaryOp::Gt, x_ref, zero, bool_type());
    let (x_ref, ten) = (b.var_ref(x), b.int(10));
    let small = b.binary(BinaryOp::Lt, x_ref, ten, bool_type());
    let both = b.binary(BinaryOp::BoolAnd, positive, small, bool_type());
    let body = vec![b.ret(Some(both))];
    let in_range = b.function("in_range", vec![x], bool_type(), body);

    let (p, q) = (b.param("p", bool_type()), b.param("q", bool_type()));
    let (p_ref, q_ref) = (b.var_ref(p), b.var_ref(q));
    let either = b.binary(BinaryOp::BoolOr, p_ref, q_ref, bool_type());
    let body = vec![b.ret(Some(either))];
    let any = b.function("any", vec![p, q], bool_type(), body);

    b.module.add_root(in_range);
    b.module.add_root(any);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static t_bool f_0(t_int32 v_0)"),
        "static t_bool f_0(t_int32 v_0)\n{\n\
         \tt_bool v_1 = v_0 > 0;\n\
         \tt_bool v_2 = v_1;\n\
         \tif (v_2)\n\
         \t{\n\
         \t\tt_bool v_3 = v_0 < 10;\n\
         \t\tv_2 = v_3;\n\
         \t}\n\
         \treturn v_2;\n\
         }\n"
    );
    assert_eq!(
        function_body(&code, "static t_bool f_1(t_bool v_0, t_bool v_1)"),
        "static t_bool f_1(t_bool v_0, t_bool v_1)\n{\n\
         \tt_bool v_2 = v_0;\n\
         \tif (!v_2)\n\
         \t{\n\
         \t\tv_2 = v_1;\n\
         \t}\n\
         \treturn v_2;\n\
         }\n"
    );
}

#[test]
fn bit_casts_and_optional_casts() {
    let mut b = ModuleBuilder::new();
    let f32_type = Typespec::builtin(BuiltinKind::F32);
    let u32_type = Typespec::builtin(BuiltinKind::U32);
    let int_pointer = Typespec::pointer(int_type(), true);

    let x = b.param("x", f32_type);
    let inner = b.var_ref(x);
    let bits = b.expr(ExprKind::BitCast { expr: inner }, u32_type.clone(), ValueCategory::Rvalue);
    let body = vec![b.ret(Some(bits))];
    let to_bits = b.function("to_bits", vec![x], u32_type, body);

    let v = b.param("v", int_type());
    let inner = b.var_ref(v);
    let wrapped = b.expr(
        ExprKind::OptionalCast { expr: inner },
        Typespec::optional(int_type()),
        ValueCategory::Rvalue,
    );
    let body = vec![b.ret(Some(wrapped))];
    let wrap = b.function("wrap", vec![v], Typespec::optional(int_type()), body);

    let p = b.param("p", int_pointer.clone());
    let inner = b.var_ref(p);
    let wrapped = b.expr(
        ExprKind::OptionalCast { expr: inner },
        Typespec::optional(int_pointer.clone()),
        ValueCategory::Rvalue,
    );
    let body = vec![b.ret(Some(wrapped))];
    let wrap_pointer = b.function("wrap_pointer", vec![p], Typespec::optional(int_pointer), body);

    b.module.add_root(to_bits);
    b.module.add_root(wrap);
    b.module.add_root(wrap_pointer);

    let code = b.generate();
    assert!(code.starts_with("#include <string.h>\n"));
    assert_eq!(
        function_body(&code, "static t_uint32 f_0(t_float32 v_0)"),
        "static t_uint32 f_0(t_float32 v_0)\n{\n\
         \tt_uint32 v_1;\n\
         \tmemcpy(&v_1, &v_0, sizeof (t_uint32));\n\
         \treturn v_1;\n\
         }\n"
    );
    assert_eq!(
        function_body(&code, "static t_0 f_1(t_int32 v_0)"),
        "static t_0 f_1(t_int32 v_0)\n{\n\
         \tt_0 v_1;\n\
         \tv_1.m_0 = v_0;\n\
         \tv_1.m_1 = 1;\n\
         \treturn v_1;\n\
         }\n"
    );
    assert_eq!(
        function_body(&code, "static t_int32* f_2(t_int32* v_0)"),
        "static t_int32* f_2(t_int32* v_0)\n{\n\treturn v_0;\n}\n"
    );
}

#[test]
fn if_consteval_emits_only_the_selected_branch() {
    let mut b = ModuleBuilder::new();
    let fast = b.external("fast", Vec::new(), Typespec::Void);
    let slow = b.external("slow", Vec::new(), Typespec::Void);
    let (then_block, else_block) = (b.call(fast, Vec::new()), b.call(slow, Vec::new()));
    let taken = b.expr(
        ExprKind::IfConsteval { condition: true, then_block, else_block: Some(else_block) },
        Typespec::Void,
        ValueCategory::None,
    );
    let then_block = b.call(slow, Vec::new());
    let skipped = b.expr(
        ExprKind::IfConsteval { condition: false, then_block, else_block: None },
        Typespec::Void,
        ValueCategory::None,
    );
    let body = vec![b.expr_stmt(taken), b.expr_stmt(skipped)];
    let func = b.function("f", Vec::new(), Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(!code.contains("slow"));
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\tfast();\n}\n"
    );
}

// ── Cleanups ────────────────────────────────────────────────────────

#[test]
fn deferred_calls_run_in_reverse_order() {
    let mut b = ModuleBuilder::new();
    let first = b.external("first", Vec::new(), Typespec::Void);
    let second = b.external("second", Vec::new(), Typespec::Void);
    let work = b.external("work", Vec::new(), Typespec::Void);

    let (call_first, call_second, call_work) = (b.call(first, Vec::new()), b.call(second, Vec::new()), b.call(work, Vec::new()));
    let defer_first = b.stmt(Stmt::Defer(DestructOperation::new(DestructKind::Defer(call_first))));
    let defer_second = b.stmt(Stmt::Defer(DestructOperation::new(DestructKind::Defer(call_second))));
    let do_work = b.expr_stmt(call_work);
    let scoped = b.function("scoped", Vec::new(), Typespec::Void, vec![defer_first, defer_second, do_work]);

    let call_first = b.call(first, Vec::new());
    let defer_first = b.stmt(Stmt::Defer(DestructOperation::new(DestructKind::Defer(call_first))));
    let three = b.int(3);
    let ret = b.ret(Some(three));
    let early = b.function("early", Vec::new(), int_type(), vec![defer_first, ret]);

    b.module.add_root(scoped);
    b.module.add_root(early);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\twork();\n\tsecond();\n\tfirst();\n}\n"
    );
    assert_eq!(
        function_body(&code, "static t_int32 f_1(void)"),
        "static t_int32 f_1(void)\n{\n\tfirst();\n\treturn 3;\n}\n"
    );
}

#[test]
fn return_runs_the_cleanups_of_every_enclosing_scope() {
    let mut b = ModuleBuilder::new();
    let [a, bb, c] = ["a", "b", "c"].map(|name| b.external(name, Vec::new(), Typespec::Void));
    let (call_a, call_b, call_c) = (b.call(a, Vec::new()), b.call(bb, Vec::new()), b.call(c, Vec::new()));
    let (defer_a, defer_b, defer_c) = (defer(&mut b, call_a), defer(&mut b, call_b), defer(&mut b, call_c));
    let three = b.int(3);
    let ret = b.ret(Some(three));
    let innermost = b.block(vec![defer_c, ret]);
    let innermost = b.expr_stmt(innermost);
    let inner = b.block(vec![defer_b, innermost]);
    let inner = b.expr_stmt(inner);
    let func = b.function("f", Vec::new(), int_type(), vec![defer_a, inner]);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static t_int32 f_0(void)"),
        "static t_int32 f_0(void)\n{\n\
         \tc();\n\
         \tb();\n\
         \ta();\n\
         \treturn 3;\n\
         }\n"
    );
}

#[test]
fn break_runs_only_the_cleanups_inside_the_loop() {
    let mut b = ModuleBuilder::new();
    let [a, bb, c] = ["a", "b", "c"].map(|name| b.external(name, Vec::new(), Typespec::Void));
    let (call_a, call_b, call_c) = (b.call(a, Vec::new()), b.call(bb, Vec::new()), b.call(c, Vec::new()));
    let (defer_a, defer_b, defer_c) = (defer(&mut b, call_a), defer(&mut b, call_b), defer(&mut b, call_c));
    let leave = b.expr(ExprKind::Break, Typespec::Void, ValueCategory::Noreturn);
    let leave = b.expr_stmt(leave);
    let nested = b.block(vec![defer_c, leave]);
    let nested = b.expr_stmt(nested);
    let body = b.block(vec![defer_b, nested]);
    let forever = b.stmt(Stmt::For { init: None, condition: None, iteration: None, body });
    let func = b.function("f", Vec::new(), Typespec::Void, vec![defer_a, forever]);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\
         \twhile (1)\n\
         \t{\n\
         \t\tc();\n\
         \t\tb();\n\
         \t\tbreak;\n\
         \t}\n\
         \ta();\n\
         }\n"
    );
}

#[test]
fn moved_from_variable_is_destroyed_behind_its_flag() {
    let mut b = ModuleBuilder::new();
    let buffer = b.aggregate("Buffer", vec![int_type()], TypeTraits::empty());
    let drop_buffer = b.external("drop_buffer", vec![Typespec::reference(buffer.clone(), true)], Typespec::Void);
    let (var, decl) = b.local(VarDecl::new("b", buffer).moved_from());
    let var_ref = b.var_ref(var);
    let destroy = b.call(drop_buffer, vec![var_ref]);
    b.module
        .set_var_destruction(var, DestructOperation::new(DestructKind::Variable { call: destroy }));
    let func = b.function("f", Vec::new(), Typespec::Void, vec![decl]);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\
         \tt_0 v_0;\n\
         \tt_bool v_1 = 1;\n\
         \tif (v_1)\n\
         \t{\n\
         \t\tdrop_buffer(&v_0);\n\
         \t}\n\
         }\n"
    );
}

#[test]
fn temporaries_are_destroyed_at_the_end_of_the_statement() {
    let mut b = ModuleBuilder::new();
    let handle = b.aggregate("Handle", vec![int_type()], TypeTraits::TRIVIALLY_RELOCATABLE);
    let make = b.external("make", Vec::new(), handle.clone());
    let release = b.external("release", vec![Typespec::reference(handle.clone(), true)], Typespec::Void);

    let bound = b.value_ref(0, handle.clone());
    let destroy = b.call(release, vec![bound]);
    let kind = ExprKind::Call {
        func: make,
        args: Vec::new(),
        order: bz_ir::ResolveOrder::Regular,
    };
    let made = b.module.alloc_expr(
        Expr::new(kind, handle, ValueCategory::Rvalue)
            .with_destruct_op(DestructOperation::new(DestructKind::SelfValue { call: destroy })),
    );
    let body = vec![b.expr_stmt(made)];
    let func = b.function("f", Vec::new(), Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.contains("t_0 make(void);\n"));
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\
         \tt_0 v_0 = make();\n\
         \trelease(&v_0);\n\
         }\n"
    );
}

#[test]
fn destructuring_binds_each_element() {
    let mut b = ModuleBuilder::new();
    let pair = Typespec::Tuple(vec![int_type(), int_type()]);
    let first = b.param("a", int_type());
    let second = b.param("b", int_type());
    let (one, two) = (b.int(1), b.int(2));
    let init = b.expr(ExprKind::AggregateInit { exprs: vec![one, two] }, pair.clone(), ValueCategory::Rvalue);
    let (_, decl) = b.local(VarDecl::new("t", pair).with_init(init).with_tuple_decls(vec![first, second]));
    let (lhs, rhs) = (b.var_ref(first), b.var_ref(second));
    let sum = b.binary(BinaryOp::Add, lhs, rhs, int_type());
    let ret = b.ret(Some(sum));
    let func = b.function("f", Vec::new(), int_type(), vec![decl, ret]);
    b.module.add_root(func);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static t_int32 f_0(void)"),
        "static t_int32 f_0(void)\n{\n\
         \tt_0 v_0;\n\
         \tv_0.m_0 = 1;\n\
         \tv_0.m_1 = 2;\n\
         \tt_int32 v_1 = v_0.m_0 + v_0.m_1;\n\
         \treturn v_1;\n\
         }\n"
    );
}

// ── Globals and intrinsics ──────────────────────────────────────────

#[test]
fn globals_are_static_definitions() {
    let mut b = ModuleBuilder::new();
    let seven = b.int(7);
    let counter = b.module.alloc_var(VarDecl::new("counter", int_type()).with_init(seven).global());
    let table = b
        .module
        .alloc_var(VarDecl::new("table", Typespec::array(int_type(), 3)).global());
    b.module.add_global(counter);
    b.module.add_global(table);

    let counter_ref = b.var_ref(counter);
    let body = vec![b.ret(Some(counter_ref))];
    let get = b.function("get", Vec::new(), int_type(), body);
    b.module.add_root(get);

    let code = b.generate();
    assert!(code.contains("static t_int32 g_0 = 7;\nstatic t_0 g_1 = {0};\n"));
    assert!(code.contains("static t_int32 f_0(void)\n{\n\treturn g_0;\n}\n"));
}

#[test]
fn bit_counts_widen_narrow_operands() {
    let mut b = ModuleBuilder::new();
    let u16_type = Typespec::builtin(bz_ir::BuiltinKind::U16);
    let clz = b.intrinsic(Intrinsic::Clz, vec![u16_type.clone()], int_type());
    let x = b.param("x", u16_type);
    let x_ref = b.var_ref(x);
    let call = b.call(clz, vec![x_ref]);
    let body = vec![b.ret(Some(call))];
    let func = b.function("f", vec![x], int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(!code.contains("Clz"));
    assert_eq!(
        function_body(&code, "static t_int32 f_0(t_uint16 v_0)"),
        "static t_int32 f_0(t_uint16 v_0)\n{\n\
         \tt_uint16 v_1 = v_0;\n\
         \treturn v_1 == 0 ? 16 : __builtin_clz(v_1) - 16;\n\
         }\n"
    );
}

#[test]
fn byte_swaps_and_bit_reversal() {
    let mut b = ModuleBuilder::new();
    let u8_type = Typespec::builtin(BuiltinKind::U8);
    let u32_type = Typespec::builtin(BuiltinKind::U32);
    let bswap = b.intrinsic(Intrinsic::Byteswap, vec![u32_type.clone()], u32_type.clone());
    let bitreverse = b.intrinsic(Intrinsic::Bitreverse, vec![u8_type.clone()], u8_type.clone());

    let x = b.param("x", u32_type.clone());
    let x_ref = b.var_ref(x);
    let swapped = b.call(bswap, vec![x_ref]);
    let body = vec![b.ret(Some(swapped))];
    let swap_bytes = b.function("swap_bytes", vec![x], u32_type, body);

    let y = b.param("y", u8_type.clone());
    let y_ref = b.var_ref(y);
    let reversed = b.call(bitreverse, vec![y_ref]);
    let body = vec![b.ret(Some(reversed))];
    let reverse = b.function("reverse", vec![y], u8_type, body);

    b.module.add_root(swap_bytes);
    b.module.add_root(reverse);

    let code = b.generate();
    assert_eq!(
        function_body(&code, "static t_uint32 f_0(t_uint32 v_0)"),
        "static t_uint32 f_0(t_uint32 v_0)\n{\n\
         \tt_uint32 v_1 = v_0;\n\
         \treturn __builtin_bswap32(v_1);\n\
         }\n"
    );
    assert_eq!(
        function_body(&code, "static t_uint8 f_1(t_uint8 v_0)"),
        "static t_uint8 f_1(t_uint8 v_0)\n{\n\
         \tt_uint8 v_1 = v_0;\n\
         \tt_uint8 v_2 = 0;\n\
         \tt_uint64 v_3 = 0;\n\
         \twhile (v_3 < 8)\n\
         \t{\n\
         \t\tv_2 = (t_uint8)((v_2 << 1) | (v_1 & 1u));\n\
         \t\tv_1 = (t_uint8)(v_1 >> 1);\n\
         \t\t++v_3;\n\
         \t}\n\
         \treturn v_2;\n\
         }\n"
    );
}

#[test]
fn funnel_shifts_reduce_the_shift_and_special_case_zero() {
    let mut b = ModuleBuilder::new();
    let u32_type = Typespec::builtin(BuiltinKind::U32);
    let operands = vec![u32_type.clone(), u32_type.clone(), u32_type.clone()];
    let fshl = b.intrinsic(Intrinsic::Fshl, operands.clone(), u32_type.clone());
    let fshr = b.intrinsic(Intrinsic::Fshr, operands, u32_type.clone());

    let mut roots = Vec::new();
    for (name, intrinsic) in [("rotate_left", fshl), ("rotate_right", fshr)] {
        let params: Vec<_> = ["a", "b", "s"].iter().map(|p| b.param(p, u32_type.clone())).collect();
        let args = params.iter().map(|&param| b.var_ref(param)).collect();
        let shifted = b.call(intrinsic, args);
        let body = vec![b.ret(Some(shifted))];
        roots.push(b.function(name, params, u32_type.clone(), body));
    }
    for root in roots {
        b.module.add_root(root);
    }

    let code = b.generate();
    let prologue = "\tt_uint32 v_3 = v_0;\n\
                    \tt_uint32 v_4 = v_1;\n\
                    \tt_uint32 v_5 = v_2;\n\
                    \tv_5 %= 32;\n";
    assert_eq!(
        function_body(&code, "static t_uint32 f_0(t_uint32 v_0, t_uint32 v_1, t_uint32 v_2)"),
        format!(
            "static t_uint32 f_0(t_uint32 v_0, t_uint32 v_1, t_uint32 v_2)\n{{\n{prologue}\
             \treturn v_5 == 0 ? v_3 : (t_uint32)((v_3 << v_5) | (v_4 >> (32 - v_5)));\n}}\n"
        )
    );
    assert_eq!(
        function_body(&code, "static t_uint32 f_1(t_uint32 v_0, t_uint32 v_1, t_uint32 v_2)"),
        format!(
            "static t_uint32 f_1(t_uint32 v_0, t_uint32 v_1, t_uint32 v_2)\n{{\n{prologue}\
             \treturn v_5 == 0 ? v_4 : (t_uint32)((v_3 << (32 - v_5)) | (v_4 >> v_5));\n}}\n"
        )
    );
}

#[test]
fn math_intrinsics() {
    let mut b = ModuleBuilder::new();
    let f32_type = Typespec::builtin(bz_ir::BuiltinKind::F32);
    let sqrt = b.intrinsic(Intrinsic::Math(MathFn::Sqrt), vec![f32_type.clone()], f32_type.clone());
    let min = b.intrinsic(Intrinsic::Math(MathFn::Min), vec![int_type(), int_type()], int_type());

    let x = b.param("x", f32_type.clone());
    let x_ref = b.var_ref(x);
    let root = b.call(sqrt, vec![x_ref]);
    let body = vec![b.ret(Some(root))];
    let float_fn = b.function("root", vec![x], f32_type, body);

    let (lhs, rhs) = (b.param("a", int_type()), b.param("b", int_type()));
    let (lhs_ref, rhs_ref) = (b.var_ref(lhs), b.var_ref(rhs));
    let smaller = b.call(min, vec![lhs_ref, rhs_ref]);
    let body = vec![b.ret(Some(smaller))];
    let int_fn = b.function("smaller", vec![lhs, rhs], int_type(), body);

    b.module.add_root(float_fn);
    b.module.add_root(int_fn);

    let code = b.generate();
    assert!(code.starts_with("#include <math.h>\n"));
    assert_eq!(
        function_body(&code, "static t_float32 f_0(t_float32 v_0)"),
        "static t_float32 f_0(t_float32 v_0)\n{\n\tt_float32 v_1 = sqrtf(v_0);\n\treturn v_1;\n}\n"
    );
    assert!(code.contains("\treturn v_0 < v_1 ? v_0 : v_1;\n"));
}

#[test]
fn panic_writes_the_message_and_aborts() {
    let mut b = ModuleBuilder::new();
    let panic = b.intrinsic(Intrinsic::Panic, vec![Typespec::Str], Typespec::Void);
    let message = b.constant(ConstantValue::Str("boom".into()), Typespec::Str);
    let call = b.call(panic, vec![message]);
    let body = vec![b.expr_stmt(call)];
    let func = b.function("fail", Vec::new(), Typespec::Void, body);
    b.module.add_root(func);

    let code = b.generate();
    assert!(code.starts_with("#include <stdio.h>\n#include <stdlib.h>\n"));
    assert!(code.contains("static t_uint8 const s_0[] = \"boom\";\n"));
    assert_eq!(
        function_body(&code, "static void f_0(void)"),
        "static void f_0(void)\n{\n\
         \tt_0 v_0 = (t_0){ s_0, s_0 + 4, };\n\
         \tfwrite(v_0.m_0, 1, v_0.m_1 - v_0.m_0, stderr);\n\
         \tfputc('\\n', stderr);\n\
         \tabort();\n\
         }\n"
    );
}

#[test]
fn optional_get_value_checks_the_flag() {
    let mut b = ModuleBuilder::new();
    let optional = Typespec::optional(int_type());
    let get_value = b.intrinsic(
        Intrinsic::OptionalGetValue,
        vec![Typespec::reference(optional.clone(), false)],
        Typespec::reference(int_type(), false),
    );
    let o = b.param("o", optional);
    let o_ref = b.var_ref(o);
    let value = b.call(get_value, vec![o_ref]);
    let body = vec![b.ret(Some(value))];
    let func = b.function("get", vec![o], int_type(), body);
    b.module.add_root(func);

    let code = b.generate();
    let body = function_body(&code, "static t_int32 f_0(t_0 v_0)");
    assert!(body.contains("\tif (!v_0.m_1)\n\t{\n"));
    assert!(body.contains("\t\tabort();\n\t}\n"));
    assert!(body.ends_with("\treturn v_0.m_0;\n}\n"));
}

#[test]
#[should_panic(expected = "compile-time intrinsic")]
fn comptime_intrinsics_are_rejected() {
    let mut b = ModuleBuilder::new();
    let print = b.intrinsic(
        Intrinsic::Comptime(bz_ir::ComptimeIntrinsic::Print),
        vec![Typespec::Str],
        Typespec::Void,
    );
    let message = b.constant(ConstantValue::Str("hi".into()), Typespec::Str);
    let call = b.call(print, vec![message]);
    let body = vec![b.expr_stmt(call)];
    let func = b.function("f", Vec::new(), Typespec::Void, body);
    b.module.add_root(func);
    b.generate();
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn integer_constants_are_returned_verbatim(value in any::<i64>()) {
        let mut b = ModuleBuilder::new();
        let i64_type = Typespec::builtin(bz_ir::BuiltinKind::I64);
        let constant = b.constant(ConstantValue::Sint(value), i64_type.clone());
        let body = vec![b.ret(Some(constant))];
        let func = b.function("f", Vec::new(), i64_type, body);
        b.module.add_root(func);

        let expected = if value == i64::MIN {
            "(-9223372036854775807 - 1)".to_string()
        } else {
            value.to_string()
        };
        let code = b.generate();
        prop_assert!(code.contains(&format!("\treturn {expected};\n")), "{}", code);
    }
}
