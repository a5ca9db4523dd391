//! Script file tests.
//!
//! Drives whole files through `load_str` / `load` and the registry: section
//! splitting, scope chaining between Global and named sections, diagnostic
//! positions and source round-trips.

use std::fs;

use sable_lang::{
    ContextScope, Context, EngineConfig, ErrorCode, LintKind, PreamblePolicy, Registry,
    ScriptError, ScriptFile, Val, load, load_str, parse_expression,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn registry(src: &str) -> Registry {
    load_str("test.sbl", src, EngineConfig::default())
        .unwrap_or_else(|e| panic!("expected load to succeed, got: {e}"))
}

fn parse_err(src: &str) -> sable_lang::Error {
    match load_str("test.sbl", src, EngineConfig::default()) {
        Ok(_) => panic!("expected load to fail but it succeeded"),
        Err(ScriptError::Parse(e)) => e,
        Err(other) => panic!("expected a parse error, got: {other}"),
    }
}

/// Runs Global, then `name` with `args`, in one context.
fn call(r: &Registry, name: &str, args: &[Val]) -> Val {
    let mut ctx = Context::standard();
    r.global().run(&mut ctx).unwrap_or_else(|e| panic!("global failed: {e}"));
    r.run(name, &mut ctx, args).unwrap_or_else(|e| panic!("`{name}` failed: {e}"))
}

const FILE: &str = "\
// shared state
int base = 2
base * 3

Foo:
base * 10

Bar(int n):
int local = n + base
local
";

// ─── Sectioning ──────────────────────────────────────────────────────────────

#[test]
fn sections_become_named_scripts() {
    let r = registry(FILE);
    assert_eq!(r.names(), vec!["Foo", "Bar"]);
    assert_eq!(r.len(), 2);
    assert_eq!(r.global().statements().len(), 2);
}

#[test]
fn global_runs_only_the_preamble() {
    let r = registry(FILE);
    assert_eq!(r.global().run(&mut Context::standard()).unwrap(), Val::Int(6));
}

#[test]
fn each_section_runs_its_own_body() {
    let r = registry(FILE);
    assert_eq!(call(&r, "Foo", &[]), Val::Int(20));
    assert_eq!(call(&r, "Bar", &[Val::Int(5)]), Val::Int(7));
}

#[test]
fn unknown_section() {
    let r = registry(FILE);
    let err = r.run("Baz", &mut Context::standard(), &[]).unwrap_err();
    assert!(matches!(err, ScriptError::UnknownScript(name) if name == "Baz"));
}

#[test]
fn empty_sections_are_registered() {
    let r = registry("A:\nB:\n\n// nothing\nC:\n1");
    assert_eq!(r.names(), vec!["A", "B", "C"]);
    assert!(r.get("B").is_some_and(|s| s.statements().is_empty()));
    assert_eq!(call(&r, "C", &[]), Val::Int(1));
}

#[test]
fn preamble_policies() {
    let src = "int g = 1\nMain:\n2\n";

    let ignore = EngineConfig { preamble: PreamblePolicy::Ignore, ..EngineConfig::default() };
    let r = load_str("test.sbl", src, ignore).unwrap();
    assert!(r.global().statements().is_empty());

    let strict = EngineConfig { preamble: PreamblePolicy::Error, ..EngineConfig::default() };
    assert!(matches!(load_str("test.sbl", src, strict), Err(ScriptError::Preamble { line: 1 })));
}

#[test]
fn renamed_global_cannot_be_a_section() {
    let config = EngineConfig { global_name: "Setup".into(), ..EngineConfig::default() };
    let Err(err) = load_str("test.sbl", "Setup:\n1\n", config) else {
        panic!("expected a section named like Global to be rejected");
    };
    assert!(matches!(err, ScriptError::DuplicateScript(name) if name == "Setup"));
}

// ─── Scope chaining ──────────────────────────────────────────────────────────

#[test]
fn sections_read_globals() {
    let r = registry("float scale = 0.5\n\nHalf(float x):\nx * scale\n");
    assert_eq!(call(&r, "Half", &[Val::Int(9)]), Val::Float(4.5));
}

#[test]
fn sections_do_not_see_each_other() {
    let err = parse_err("A:\nint only_a = 1\nB:\nonly_a\n");
    assert_eq!(err.code, ErrorCode::P005);
    assert_eq!(err.line(), 4);
}

#[test]
fn shadowing_survives_clear_and_reparse() {
    let mut r = registry("int x = 7\n\nS:\nstring x = \"shadow\"\nx\n");
    assert_eq!(call(&r, "S", &[]), Val::from("shadow"));

    let s = r.get_mut("S").unwrap();
    s.clear();
    let mut line = 4;
    s.add_statements("x + 1", &mut line).unwrap();

    assert_eq!(call(&r, "S", &[]), Val::Int(8));
    assert_eq!(r.global().scope().borrow().lookup("x").map(|v| v.ty.to_string()), Some("int".into()));
}

// ─── Diagnostics ─────────────────────────────────────────────────────────────

#[test]
fn header_without_colon_is_reported_on_its_line() {
    let err = parse_err("int g = 1\n\nFoo:\ng\n\nBar(int x)\nx\n");
    assert_eq!(err.code, ErrorCode::P002);
    assert_eq!(err.line(), 6);
    assert_eq!(err.line_text, "Bar(int x)");
}

#[test]
fn errors_carry_source_token_and_column() {
    let err = parse_err("Main:\n  int x = 1 +* 2\n");
    assert_eq!(err.code, ErrorCode::P001);
    assert_eq!(err.line(), 2);
    assert_eq!(err.column(), 14);
    assert_eq!(err.token, "*");
    assert_eq!(&*err.span.source, "test.sbl");
}

#[test]
fn ragged_array_literal() {
    let err = parse_err("int[,] m = {{1, 2}, {3}}");
    assert_eq!(err.code, ErrorCode::P004);
}

#[test]
fn rectangular_array_literal_dims() {
    let r = registry("dims({{1, 2}, {3, 4}})");
    assert_eq!(r.global().run(&mut Context::standard()).unwrap().to_string(), "{2, 2}");
}

#[test]
fn check_collects_every_section_error() {
    let mut file = ScriptFile::new(Registry::new());
    let errors = file.check("Ok:\n1\nBad:\nint = 3\nAlso(bool b):\nb = 2 +\nFine:\n2\n".as_bytes()).unwrap();
    let codes: Vec<_> = errors.iter().map(|e| e.code).collect();
    assert_eq!(codes, vec![ErrorCode::P002, ErrorCode::P001]);
    assert_eq!(file.registry().names(), vec!["Ok", "Bad", "Also", "Fine"]);
}

#[test]
fn section_lints() {
    let r = registry("Main(int n):\nprint(n)\n");
    let lints = r.get("Main").unwrap().lints();
    assert!(lints.iter().any(|l| l.kind == LintKind::Header && l.text == "Main"));
    assert!(lints.iter().any(|l| l.kind == LintKind::Function && l.text == "print" && l.span.line == 2));
}

// ─── Round-trip ──────────────────────────────────────────────────────────────

#[test]
fn written_expressions_evaluate_identically() {
    let scope = ContextScope::root();
    let mut ctx = Context::standard();
    for src in [
        "-3 + 4 * (2 - 7) % 3",
        "1 < 2 ? \"a\" + \"\"\"\" : \"b\"",
        "float3(1, 2, 3).y * 0xff",
        "{{1.5, 2}, {3, -4}}[1, 0]",
        "!(true && false) || 1 == 2",
    ] {
        let expr = parse_expression(&scope, "t", src, None).unwrap();
        let written = expr.to_source();
        let again = parse_expression(&scope, "t", &written, None)
            .unwrap_or_else(|e| panic!("`{written}` (from `{src}`) did not re-parse: {e}"));
        assert_eq!(again.evaluate(&mut ctx).unwrap(), expr.evaluate(&mut ctx).unwrap(), "{src}");
    }
}

#[test]
fn written_file_reloads_identically() {
    let src = "\
int total
float[] xs = {1, 2.5, 4}

Sum:
foreach float x in xs { total = total + int(x) }
total

Pick(int i):
if i < 0 then xs[0] else { while i >= len(xs) i = i - len(xs)
xs[i] }
";
    let first = registry(src);
    let written = first.write();
    let second = registry(&written);
    assert_eq!(second.write(), written);
    assert_eq!(second.names(), first.names());
    for (name, args) in [("Sum", vec![]), ("Pick", vec![Val::Int(-1)]), ("Pick", vec![Val::Int(4)])] {
        assert_eq!(call(&second, name, &args), call(&first, name, &args), "{name}");
    }
}

// ─── Files ───────────────────────────────────────────────────────────────────

#[test]
fn load_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.sbl");
    fs::write(&path, FILE).unwrap();

    let r = load(&path, EngineConfig::default()).unwrap();
    assert_eq!(r.names(), vec!["Foo", "Bar"]);
    assert_eq!(r.source(), path.display().to_string());

    let missing = load(dir.path().join("nope.sbl"), EngineConfig::default());
    assert!(matches!(missing, Err(ScriptError::Io { .. })));
}

#[test]
fn disk_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.sbl");
    fs::write(&path, "A:\n\"open\n").unwrap();

    let Err(ScriptError::Parse(e)) = load(&path, EngineConfig::default()) else {
        panic!("expected a parse error");
    };
    assert_eq!(e.code, ErrorCode::L002);
    assert_eq!(e.line(), 2);
    assert_eq!(&*e.span.source, path.display().to_string());
}
