//! Evaluation tests.
//!
//! Each source is loaded as the global body of a file and run against a fresh
//! standard context; the result is the value of the first non-null
//! expression statement.

use sable_lang::{Context, EngineConfig, ErrorCode, RuntimeError, ScalarType, Val, ValType, load_str};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn run(src: &str) -> Val {
    let registry = load_str("test.sbl", src, EngineConfig::default())
        .unwrap_or_else(|e| panic!("load failed: {e}"));
    registry.global().run(&mut Context::standard())
        .unwrap_or_else(|e| panic!("run failed: {e}"))
}

fn run_err(src: &str) -> RuntimeError {
    let registry = load_str("test.sbl", src, EngineConfig::default())
        .unwrap_or_else(|e| panic!("load failed (expected runtime error, not parse error): {e}"));
    match registry.global().run(&mut Context::standard()) {
        Ok(v)  => panic!("expected run to fail but it returned {v}"),
        Err(e) => e,
    }
}

fn has_code(e: &RuntimeError, code: ErrorCode) -> bool {
    e.code == code
}

fn text(src: &str) -> String {
    run(src).to_string()
}

// ─── Literals ────────────────────────────────────────────────────────────────

#[test]
fn literal_forms() {
    assert_eq!(run("true"), Val::Bool(true));
    assert_eq!(run("-93"), Val::Int(-93));
    assert_eq!(run("0xff"), Val::Int(255));
    assert_eq!(run("0.00001"), Val::Float(0.00001));
    assert_eq!(run(r#""yes""#), Val::from("yes"));
    assert_eq!(run(r#""a ""quoted"" word""#), Val::from(r#"a "quoted" word"#));
}

#[test]
fn null_result_means_no_return() {
    assert_eq!(run("null"), Val::NULL);
    assert_eq!(run("int x = 1"), Val::NULL);
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[test]
fn int_arithmetic() {
    assert_eq!(run("7 + 3 * 2"), Val::Int(13));
    assert_eq!(run("(7 + 3) * 2"), Val::Int(20));
    assert_eq!(run("7 % 3"), Val::Int(1));
    assert_eq!(run("-7 / 2"), Val::Int(-3));
    assert_eq!(run("2147483647 + 1"), Val::Int(i32::MIN));
}

#[test]
fn mixed_arithmetic_widens() {
    assert_eq!(run("1 + 0.5"), Val::Float(1.5));
    assert_eq!(run("float2(1, 2) + 1"), Val::Float2([2.0, 3.0]));
    assert_eq!(run("2 * float3(1, 2, 3)"), Val::Float3([2.0, 4.0, 6.0]));
}

#[test]
fn division_by_zero() {
    assert!(has_code(&run_err("1 / 0"), ErrorCode::E008));
    assert!(has_code(&run_err("1 % 0"), ErrorCode::E008));
    assert!(has_code(&run_err("float2(1, 1) / float2(1, 0)"), ErrorCode::E008));
}

#[test]
fn mismatch_names_both_types() {
    let e = run_err(r#"1 + "x""#);
    assert!(has_code(&e, ErrorCode::E001));
    assert!(e.message.contains("int") && e.message.contains("string"), "{}", e.message);
    assert_eq!(e.line(), 1);
}

#[test]
fn unsupported_operator() {
    assert!(has_code(&run_err("true + false"), ErrorCode::E010));
    assert!(has_code(&run_err(r#"-"s""#), ErrorCode::E010));
    assert!(has_code(&run_err("int[] a = {1}\na < a"), ErrorCode::E010));
}

#[test]
fn string_operators() {
    assert_eq!(run(r#""ab" + "cd""#), Val::from("abcd"));
    assert_eq!(run(r#""abc" < "abd""#), Val::Bool(true));
}

#[test]
fn equality() {
    assert_eq!(run("1 == 1.0"), Val::Bool(true));
    assert_eq!(run("null == null"), Val::Bool(true));
    assert_eq!(run("1 != null"), Val::Bool(true));
    assert_eq!(run("({{1, 2}} == {{1, 2}})"), Val::Bool(true));
    assert_eq!(run("({1, 2} == {1.0, 2.0})"), Val::Bool(true));
    assert_eq!(run("float2(1, 2) != float2(1, 3)"), Val::Bool(true));
}

#[test]
fn logic_and_ternary() {
    assert_eq!(run("!(1 < 2) || 3 >= 3 && 2 <= 1"), Val::Bool(false));
    assert_eq!(run("1 > 2 ? 10 : 2 > 1 ? 20 : 30"), Val::Int(20));
    assert!(has_code(&run_err("\"s\" ? 1 : 2"), ErrorCode::E009));
}

// ─── Casts ───────────────────────────────────────────────────────────────────

#[test]
fn explicit_casts() {
    assert_eq!(run("int(2.9)"), Val::Int(2));
    assert_eq!(run("int(\" 42 \")"), Val::Int(42));
    assert_eq!(run("float(true)"), Val::Float(1.0));
    assert_eq!(run("bool(0)"), Val::Bool(false));
    assert_eq!(run("string(1.5)"), Val::from("1.5"));
    assert_eq!(run("float3(float2(1, 2))"), Val::Float3([1.0, 2.0, 0.0]));
    assert_eq!(run("float2(float4(1, 2, 3, 4))"), Val::Float2([1.0, 2.0]));
    assert_eq!(run("float4(2)"), Val::Float4([2.0; 4]));
}

#[test]
fn bad_casts() {
    let e = run_err(r#"int("nope")"#);
    assert!(has_code(&e, ErrorCode::E002));
    assert!(e.message.contains("int") && e.message.contains("string"), "{}", e.message);
    assert!(has_code(&run_err("float3(1, 2)"), ErrorCode::E007));
}

// ─── Arrays ──────────────────────────────────────────────────────────────────

#[test]
fn array_literal_unifies_type() {
    let v = run("({1, 2.5})");
    assert_eq!(v.val_type(), Some(ValType::array(ScalarType::Float, 1)));
    assert_eq!(v.to_string(), "{1.0, 2.5}");
}

#[test]
fn array_literal_incompatible_elements() {
    let e = run_err(r#"({1, "x"})"#);
    assert!(has_code(&e, ErrorCode::E003));
    assert!(e.message.contains("int") && e.message.contains("string"), "{}", e.message);
}

#[test]
fn nested_arrays() {
    assert_eq!(text("({{1, 2}, {3, 4}})"), "{{1, 2}, {3, 4}}");
    assert_eq!(run("({{1, 2}, {3, 4}})[1, 1]"), Val::Int(4));
    assert_eq!(text("int[,] m = {{1, 2}, {3, 4}}\nm[1]"), "{3, 4}");
    assert_eq!(run("dims({{{1}, {2}, {3}}})").to_string(), "{1, 3, 1}");
}

#[test]
fn array_bounds() {
    let e = run_err("int[] xs = {1, 2}\nxs[5]");
    assert!(has_code(&e, ErrorCode::E007));
    assert_eq!(e.line(), 2);
    assert!(has_code(&run_err("int[] xs = {1}\nxs[-1]"), ErrorCode::E007));
    assert!(has_code(&run_err("int[] xs = {1}\nxs[1.0]"), ErrorCode::E001));
}

#[test]
fn array_literal_is_rebuilt_each_evaluation() {
    let src = r#"
        int total
        for i = 0, 3 {
            int[] row = {i, i * 10}
            row[0] = 100
            total = total + row[0] + row[1]
        }
        total
    "#;
    assert_eq!(run(src), Val::Int(330));
}

#[test]
fn empty_array_adopts_declared_type() {
    assert_eq!(
        run("string[,] grid = {{}}\ngrid").val_type(),
        Some(ValType::array(ScalarType::String, 2))
    );
    assert_eq!(run("float[] xs = {}\nlen(xs)"), Val::Int(0));
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[test]
fn declarations_default() {
    assert_eq!(run("float2 v\nv"), Val::Float2([0.0, 0.0]));
    assert_eq!(run("string s\ns == \"\""), Val::Bool(true));
    assert_eq!(run("int[,] m\ndims(m)").to_string(), "{0, 0}");
}

#[test]
fn assignment_converts_or_fails() {
    assert_eq!(run("float f = 3\nf"), Val::Float(3.0));
    assert_eq!(run("float4 c = 1\nc"), Val::Float4([1.0; 4]));
    let e = run_err("int i\ni = \"3\"");
    assert!(has_code(&e, ErrorCode::E001));
    assert_eq!(e.line(), 2);
}

#[test]
fn while_loop() {
    assert_eq!(run("int n = 1\nwhile n < 100 n = n * 2\nn"), Val::Int(128));
}

#[test]
fn for_loop_range_is_exclusive() {
    assert_eq!(run("int s\nfor i = 1, 5 s = s + i\ns"), Val::Int(10));
    assert_eq!(run("int s\nfor i = 5, 1 s = s + i\ns"), Val::Int(0));
}

#[test]
fn foreach_over_arrays_vectors_strings() {
    assert_eq!(run("int s\nforeach int x in {{1, 2}, {3, 4}} s = s * 10 + x\ns"), Val::Int(1234));
    assert_eq!(run("float s\nforeach float c in float4(1, 2, 3, 4) s = s + c\ns"), Val::Float(10.0));
    assert_eq!(run("string r\nforeach string c in \"abc\" r = c + r\nr"), Val::from("cba"));
    assert_eq!(run("float x\nforeach x in {1, 2, 3} {}\nx"), Val::Float(3.0));
}

#[test]
fn early_return_from_loop() {
    assert_eq!(run("int miss = -1\nfor i = 0, 100 if i * i > 50 then i\nmiss"), Val::Int(8));
    assert_eq!(run("int miss = -1\nfor i = 0, 5 if i > 50 then i\nmiss"), Val::Int(-1));
}

#[test]
fn if_else_chain() {
    let src = "int x = 15\nstring r\nif x % 15 == 0 then r = \"fizzbuzz\" else if x % 3 == 0 then r = \"fizz\" else r = \"\"\nr";
    assert_eq!(run(src), Val::from("fizzbuzz"));
}

#[test]
fn nested_index_assignment() {
    let src = "int[,] m = {{0, 0}, {0, 0}}\nm[1, 0] = 5\nm[0][1] = 7\nm";
    assert_eq!(text(src), "{{0, 7}, {5, 0}}");
    assert!(has_code(&run_err("int[,] m = {{0}}\nm[0] = 1"), ErrorCode::E007));
}

#[test]
fn vector_components() {
    assert_eq!(run("float3 v = float3(1, 2, 3)\nv.z + v[0]"), Val::Float(4.0));
    assert_eq!(run("float2 v\nv[1] = 5\nv"), Val::Float2([0.0, 5.0]));
}

// ─── Host functions ──────────────────────────────────────────────────────────

#[test]
fn builtin_functions() {
    assert_eq!(run("abs(-3)"), Val::Int(3));
    assert_eq!(run("max(2, 3.5)"), Val::Float(3.5));
    assert_eq!(run("length(float2(3, 4))"), Val::Float(5.0));
    assert_eq!(run("upper(\"abc\")"), Val::from("ABC"));
    assert_eq!(run("typeof({1.5})"), Val::from("float[]"));
}

#[test]
fn host_failures() {
    assert!(has_code(&run_err("missing(1)"), ErrorCode::E005));
    assert!(has_code(&run_err("sqrt(\"x\")"), ErrorCode::E005));
    let e = run_err("assert(1 > 2, \"one is small\")");
    assert!(has_code(&e, ErrorCode::E006));
    assert!(e.message.contains("one is small"));
}

#[test]
fn custom_host_function() {
    let registry = load_str("test.sbl", "twice(21)", EngineConfig::default()).unwrap();
    let mut ctx = Context::standard();
    ctx.functions_mut().register("twice", vec![ValType::INT], |a| {
        let n = i32::try_from(&a[0]).map_err(|e| e.to_string())?;
        Ok(Val::Int(n * 2))
    });
    assert_eq!(registry.global().run(&mut ctx).unwrap(), Val::Int(42));
    assert!(ctx.function_names().contains(&"twice".to_string()));
}

#[test]
fn host_extraction() {
    assert_eq!(f32::try_from(&run("1.5 * 2")), Ok(3.0));
    assert_eq!(<[f32; 2]>::try_from(&run("float2(1, 2)")), Ok([1.0, 2.0]));
    let err = i32::try_from(&run("\"x\"")).unwrap_err();
    assert!(err.to_string().contains("i32") && err.to_string().contains("string"));
}

#[test]
fn eval_standalone_expression() {
    let mut ctx = Context::standard();
    assert_eq!(sable_lang::eval("min(4, 2) * 10", &mut ctx).unwrap(), Val::Int(20));
}
