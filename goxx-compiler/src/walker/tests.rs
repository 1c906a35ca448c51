use super::*;
use crate::config::TranslatorConfig;
use goxx_ast::builder::{assign, expr_stmt, PackageBuilder, ProgramBuilder};
use goxx_ast::{
    AssignOp, BasicKind, BinaryOp, BindingKind, BranchKind, CaseClause, ExprKind, IdentKind, LitKind, Program,
    Receiver, RecvDecl, Stmt, UnaryOp,
};
use goxx_checker::SatisfactionIndex;

fn emit_named(program: &Program, name: &str) -> CodegenResult<String> {
    let index = SatisfactionIndex::build(program).unwrap();
    let config = TranslatorConfig::default();
    let package = &program.packages[0];
    let func = package
        .symbols()
        .find_map(|o| match o {
            Object::Func(f) if f.name == name => Some(f),
            _ => None,
        })
        .unwrap();
    let cx = EmitContext::new(program, package, &index, &config);
    let mut session = Session::new();
    emit_function(cx, &mut session, func, &function_name(func, 0))
}

fn func(name: &str, sig: TypeId, scope: ScopeId, stmts: Vec<Stmt>) -> FuncDecl {
    FuncDecl {
        name: name.to_string(),
        recv: None,
        sig,
        body: Some(Block::new(stmts, None)),
        scope,
        escapes: Vec::new(),
    }
}

/// `main` with the given body, in a single-file package
fn program_with_main(build: impl FnOnce(&mut PackageBuilder<'_>, ScopeId) -> Vec<Stmt>) -> Program {
    let mut b = ProgramBuilder::new();
    let unit = b.func(&[], &[]);
    let mut pkg = b.package("main");
    let file = pkg.file("main.go");
    let scope = pkg.scope(None);
    let body = build(&mut pkg, scope);
    pkg.func_decl(file, func("main", unit, scope, body));
    pkg.finish();
    b.build()
}

fn call_stmt(pkg: &mut PackageBuilder<'_>, name: &str) -> Stmt {
    let unit = pkg.types().func(&[], &[]);
    let f = pkg.func_ref(name, unit);
    expr_stmt(pkg.call(f, Vec::new(), None))
}

#[test]
fn test_multi_value_call_destructures_with_tie() {
    let program = program_with_main(|pkg, scope| {
        let int = pkg.types().basic(BasicKind::Int);
        let string = pkg.types().basic(BasicKind::String);
        let pair_sig = pkg.types().func(&[], &[int, string]);
        let tuple = pkg.types().tuple(vec![int, string]);
        pkg.bind(scope, "a", int, BindingKind::Var);
        pkg.bind(scope, "s", string, BindingKind::Var);
        let a = pkg.var("a", int);
        let s = pkg.var("s", string);
        let f = pkg.func_ref("pair", pair_sig);
        let call = pkg.call(f, Vec::new(), Some(tuple));
        vec![assign(vec![a, s], AssignOp::Define, vec![call])]
    });

    let out = emit_named(&program, "main").unwrap();
    assert_eq!(
        out,
        "void _main() {\n    int64_t a{0};\n    std::string s{\"\"};\n    std::tie(a, s) = pair();\n}\n"
    );
}

#[test]
fn test_comma_ok_assertion_uses_try_assert() {
    let mut b = ProgramBuilder::new();
    let any = b.empty_interface();
    let int = b.basic(BasicKind::Int);
    let boolean = b.basic(BasicKind::Bool);
    let sig = b.func_named(&[("x", any)], &[], false);
    let mut pkg = b.package("main");
    let file = pkg.file("main.go");
    let scope = pkg.scope(None);
    pkg.bind(scope, "x", any, BindingKind::Param);
    pkg.bind(scope, "v", int, BindingKind::Var);
    pkg.bind(scope, "ok", boolean, BindingKind::Var);

    let (v, ok, x) = (pkg.var("v", int), pkg.var("ok", boolean), pkg.var("x", any));
    let checked = pkg.type_assert(x, int);
    let (v2, x2) = (pkg.var("v", int), pkg.var("x", any));
    let unchecked = pkg.type_assert(x2, int);
    let body = vec![
        assign(vec![v, ok], AssignOp::Define, vec![checked]),
        assign(vec![v2], AssignOp::Assign, vec![unchecked]),
    ];
    pkg.func_decl(file, func("unwrap", sig, scope, body));
    pkg.finish();
    let program = b.build();

    let out = emit_named(&program, "unwrap").unwrap();
    assert!(out.starts_with("void unwrap(goxx::interface x) {\n"));
    assert!(out.contains("    std::tie(v, ok) = goxx::try_assert<int64_t>(x);\n"));
    assert!(out.contains("    v = goxx::type_assert<int64_t>(x);\n"));
}

#[test]
fn test_defers_register_in_source_order() {
    let program = program_with_main(|pkg, _| {
        ["p", "q", "r"]
            .iter()
            .map(|name| {
                let Stmt::Expr { x } = call_stmt(pkg, name) else {
                    unreachable!()
                };
                Stmt::Defer { call: x }
            })
            .collect()
    });

    let out = emit_named(&program, "main").unwrap();
    let lines: Vec<&str> = out.lines().map(str::trim).collect();
    assert_eq!(
        lines,
        vec![
            "void _main() {",
            "goxx::defer _defer_;",
            "_defer_.push([=]() mutable { p(); });",
            "_defer_.push([=]() mutable { q(); });",
            "_defer_.push([=]() mutable { r(); });",
            "}",
        ]
    );
}

#[test]
fn test_nil_comparison_and_interface_boxing() {
    let mut b = ProgramBuilder::new();
    let any = b.empty_interface();
    let error = b.error_type();
    let boolean = b.basic(BasicKind::Bool);
    let show_sig = b.func_named(&[("v", any)], &[], false);
    let sig = b.func_named(&[("err", error)], &[], false);
    let mut pkg = b.package("main");
    let file = pkg.file("main.go");
    let scope = pkg.scope(None);
    let if_scope = pkg.scope(Some(scope));
    pkg.bind(scope, "err", error, BindingKind::Param);

    let err = pkg.var("err", error);
    let nil = pkg.nil();
    let cond = pkg.binary(BinaryOp::Eql, err, nil, boolean);
    let show = pkg.func_ref("show", show_sig);
    let five = pkg.int(5);
    let call = pkg.call(show, vec![five], None);
    let body = vec![Stmt::If {
        init: None,
        cond,
        then: Block::new(vec![expr_stmt(call)], None),
        els: None,
        scope: if_scope,
    }];
    pkg.func_decl(file, func("check", sig, scope, body));
    pkg.finish();
    let program = b.build();

    let out = emit_named(&program, "check").unwrap();
    assert_eq!(
        out,
        "void check(goxx::error err) {\n    if (goxx::is_zero(err)) {\n        show(goxx::make_iface<int64_t>(5));\n    }\n}\n"
    );
}

#[test]
fn test_switch_lowers_to_cascade_with_fallthrough_goto() {
    let program = program_with_main(|pkg, scope| {
        let int = pkg.types().basic(BasicKind::Int);
        pkg.bind(scope, "n", int, BindingKind::Var);
        let switch_scope = pkg.scope(Some(scope));
        let scopes: Vec<ScopeId> = (0..3).map(|_| pkg.scope(Some(switch_scope))).collect();

        let default = CaseClause {
            values: None,
            body: vec![call_stmt(pkg, "c")],
            scope: scopes[0],
        };
        let one = pkg.int(1);
        let first = CaseClause {
            values: Some(vec![one]),
            body: vec![
                call_stmt(pkg, "a"),
                Stmt::Branch {
                    tok: BranchKind::Fallthrough,
                    label: None,
                },
            ],
            scope: scopes[1],
        };
        let two = pkg.int(2);
        let second = CaseClause {
            values: Some(vec![two]),
            body: vec![call_stmt(pkg, "b")],
            scope: scopes[2],
        };
        let tag = pkg.var("n", int);
        vec![Stmt::Switch {
            init: None,
            tag: Some(tag),
            clauses: vec![default, first, second],
            scope: switch_scope,
        }]
    });

    let out = emit_named(&program, "main").unwrap();
    let expected = "\
void _main() {
    int64_t n{0};
    {
        if (n == 1) {
            a();
            goto _label_1_;
        } else if (n == 2) {
        _label_1_:;
            b();
        } else {
            c();
        }
    }
}
";
    assert_eq!(out, expected);
}

#[test]
fn test_break_inside_switch_jumps_past_cascade() {
    let program = program_with_main(|pkg, scope| {
        let switch_scope = pkg.scope(Some(scope));
        let clause_scope = pkg.scope(Some(switch_scope));
        let one = pkg.int(1);
        let tag = pkg.int(1);
        vec![Stmt::Switch {
            init: None,
            tag: Some(tag),
            clauses: vec![CaseClause {
                values: Some(vec![one]),
                body: vec![Stmt::Branch {
                    tok: BranchKind::Break,
                    label: None,
                }],
                scope: clause_scope,
            }],
            scope: switch_scope,
        }]
    });

    let out = emit_named(&program, "main").unwrap();
    assert!(out.contains("            goto _label_1_;\n"));
    assert!(out.contains("    _label_1_:;\n"));
}

#[test]
fn test_range_flavors() {
    let program = program_with_main(|pkg, scope| {
        let int = pkg.types().basic(BasicKind::Int);
        let ints = pkg.types().slice(int);
        pkg.bind(scope, "xs", ints, BindingKind::Var);

        let both_scope = pkg.scope(Some(scope));
        pkg.bind(both_scope, "i", int, BindingKind::Var);
        pkg.bind(both_scope, "v", int, BindingKind::Var);
        let (i, v, xs) = (pkg.var("i", int), pkg.var("v", int), pkg.var("xs", ints));
        let both = Stmt::Range {
            key: Some(i),
            value: Some(v),
            define: true,
            x: xs,
            body: Block::new(Vec::new(), None),
            scope: both_scope,
        };

        let value_scope = pkg.scope(Some(scope));
        pkg.bind(value_scope, "v", int, BindingKind::Var);
        let (blank, v, xs) = (pkg.blank(), pkg.var("v", int), pkg.var("xs", ints));
        let values = Stmt::Range {
            key: Some(blank),
            value: Some(v),
            define: true,
            x: xs,
            body: Block::new(Vec::new(), None),
            scope: value_scope,
        };

        let void_scope = pkg.scope(Some(scope));
        let xs = pkg.var("xs", ints);
        let bare = Stmt::Range {
            key: None,
            value: None,
            define: false,
            x: xs,
            body: Block::new(Vec::new(), None),
            scope: void_scope,
        };
        vec![both, values, bare]
    });

    let out = emit_named(&program, "main").unwrap();
    assert!(out.contains("for (auto _ident_1_ : goxx::range_key_value(xs)) {\n"));
    assert!(out.contains("std::tie(i, v) = _ident_1_;\n"));
    assert!(out.contains("for (auto _ident_2_ : goxx::range_value(xs)) {\n"));
    assert!(out.contains("v = _ident_2_;\n"));
    assert!(out.contains("for (auto _ident_3_ : goxx::range_void(xs)) {\n"));
    assert!(out.contains("(void)_ident_3_;\n"));
}

#[test]
fn test_range_over_call_and_slice_results() {
    let program = program_with_main(|pkg, scope| {
        let int = pkg.types().basic(BasicKind::Int);
        let ints = pkg.types().slice(int);
        let nums_sig = pkg.types().func(&[], &[ints]);
        pkg.bind(scope, "xs", ints, BindingKind::Var);

        let call_scope = pkg.scope(Some(scope));
        pkg.bind(call_scope, "v", int, BindingKind::Var);
        let nums = pkg.func_ref("nums", nums_sig);
        let source = pkg.call(nums, Vec::new(), Some(ints));
        let (blank, v) = (pkg.blank(), pkg.var("v", int));
        let over_call = Stmt::Range {
            key: Some(blank),
            value: Some(v),
            define: true,
            x: source,
            body: Block::new(Vec::new(), None),
            scope: call_scope,
        };

        let slice_scope = pkg.scope(Some(scope));
        pkg.bind(slice_scope, "i", int, BindingKind::Var);
        let (xs, one) = (pkg.var("xs", ints), pkg.int(1));
        let tail = pkg.expr(
            ExprKind::Slice {
                x: Box::new(xs),
                low: Some(Box::new(one)),
                high: None,
                max: None,
            },
            Some(ints),
        );
        let i = pkg.var("i", int);
        let over_slice = Stmt::Range {
            key: Some(i),
            value: None,
            define: true,
            x: tail,
            body: Block::new(Vec::new(), None),
            scope: slice_scope,
        };
        vec![over_call, over_slice]
    });

    let out = emit_named(&program, "main").unwrap();
    assert!(out.contains("for (auto _ident_1_ : goxx::range_value(nums())) {\n"));
    assert!(out.contains(
        "for (auto _ident_2_ : goxx::range_key(goxx::slice_expr(xs, 1, goxx::npos, goxx::npos))) {\n"
    ));

    // Temporaries bind to the adapters' const reference parameters
    let runtime = crate::runtime::runtime_source();
    assert!(runtime.contains("auto range_value(const C &c) {"));
    assert!(runtime.contains("auto range_key(const slice<T> &s) {"));
}

#[test]
fn test_recover_is_unsupported() {
    let program = program_with_main(|pkg, _| {
        let recover = pkg.builtin("recover");
        vec![expr_stmt(pkg.call(recover, Vec::new(), None))]
    });
    let err = emit_named(&program, "main").unwrap_err();
    assert!(matches!(err.root(), CodegenError::Unsupported { construct } if construct == "builtin `recover`"));
}

struct PointFixture {
    program: Program,
}

/// `type Point struct{ x int }` satisfying `Stringer` through a value method,
/// with a pointer method `Scale` and a value method `Norm` nobody requires
fn point_fixture() -> PointFixture {
    let mut b = ProgramBuilder::new();
    let int = b.basic(BasicKind::Int);
    let string = b.basic(BasicKind::String);
    let string_sig = b.func(&[], &[string]);
    let stringer_iface = b.interface(&[("String", string_sig)]);
    let stringer = b.named("main", "Stringer", stringer_iface);
    let fields = b.struct_type(&[("x", int)]);
    let point = b.named("main", "Point", fields);
    let ptr = b.pointer(point);
    let scale_sig = b.func_named(&[("k", int)], &[], false);
    let norm_sig = b.func(&[], &[int]);
    b.method(point, "String", string_sig, Receiver::ByValue);
    b.method(point, "Scale", scale_sig, Receiver::ByRef);
    b.method(point, "Norm", norm_sig, Receiver::ByValue);
    let unit = b.func(&[], &[]);

    let mut pkg = b.package("main");
    let file = pkg.file("main.go");
    pkg.type_name(file, "Stringer", stringer);
    pkg.type_name(file, "Point", point);

    let method = |pkg: &mut PackageBuilder<'_>, name: &str, sig: TypeId, kind: Receiver, stmts: Vec<Stmt>, scope| {
        pkg.func_decl(
            file,
            FuncDecl {
                name: name.to_string(),
                recv: Some(RecvDecl {
                    name: Some("p".to_string()),
                    ty: point,
                    kind,
                }),
                sig,
                body: Some(Block::new(stmts, None)),
                scope,
                escapes: Vec::new(),
            },
        );
    };

    let scope = pkg.scope(None);
    pkg.bind(scope, "p", point, BindingKind::Receiver);
    let label = pkg.string("point");
    method(&mut pkg, "String", string_sig, Receiver::ByValue, vec![Stmt::Return { results: vec![label] }], scope);

    let scope = pkg.scope(None);
    pkg.bind(scope, "p", ptr, BindingKind::Receiver);
    pkg.bind(scope, "k", int, BindingKind::Param);
    let recv = pkg.ident("p", IdentKind::Receiver, Some(ptr));
    let field = pkg.selector(recv, "x", Some(int));
    let k = pkg.var("k", int);
    method(
        &mut pkg,
        "Scale",
        scale_sig,
        Receiver::ByRef,
        vec![assign(vec![field], AssignOp::Mul, vec![k])],
        scope,
    );

    let scope = pkg.scope(None);
    pkg.bind(scope, "p", point, BindingKind::Receiver);
    let recv = pkg.ident("p", IdentKind::Receiver, Some(point));
    let field = pkg.selector(recv, "x", Some(int));
    method(&mut pkg, "Norm", norm_sig, Receiver::ByValue, vec![Stmt::Return { results: vec![field] }], scope);

    // func main() { var s Stringer; pt := Point{x: 1}; s = pt; pp := &Point{x: 2} }
    let scope = pkg.scope(None);
    pkg.bind(scope, "s", stringer, BindingKind::Var);
    pkg.bind(scope, "pt", point, BindingKind::Var);
    pkg.bind(scope, "pp", ptr, BindingKind::Var);
    let key = pkg.ident("x", IdentKind::Var, None);
    let one = pkg.int(1);
    let kv = pkg.expr(
        ExprKind::KeyValue {
            key: Box::new(key),
            value: Box::new(one),
        },
        None,
    );
    let lit = pkg.expr(ExprKind::CompositeLit { elts: vec![kv] }, Some(point));
    let pt = pkg.var("pt", point);
    let define = assign(vec![pt], AssignOp::Define, vec![lit]);
    let (s, pt) = (pkg.var("s", stringer), pkg.var("pt", point));
    let boxed = assign(vec![s], AssignOp::Assign, vec![pt]);
    let key = pkg.ident("x", IdentKind::Var, None);
    let two = pkg.int(2);
    let kv = pkg.expr(
        ExprKind::KeyValue {
            key: Box::new(key),
            value: Box::new(two),
        },
        None,
    );
    let lit = pkg.expr(ExprKind::CompositeLit { elts: vec![kv] }, Some(point));
    let addr = pkg.expr(
        ExprKind::Unary {
            op: UnaryOp::Addr,
            x: Box::new(lit),
        },
        Some(ptr),
    );
    let pp = pkg.var("pp", ptr);
    let heap = assign(vec![pp], AssignOp::Define, vec![addr]);
    pkg.func_decl(file, func("main", unit, scope, vec![define, boxed, heap]));
    pkg.finish();

    PointFixture { program: b.build() }
}

#[test]
fn test_required_value_method_gets_by_value_body() {
    let fixture = point_fixture();
    let out = emit_named(&fixture.program, "String").unwrap();
    assert_eq!(
        out,
        "std::string Point::_StringByValue() {\n    return std::string(\"point\");\n}\n"
    );
}

#[test]
fn test_pointer_method_uses_this() {
    let fixture = point_fixture();
    let out = emit_named(&fixture.program, "Scale").unwrap();
    assert_eq!(out, "void Point::Scale(int64_t k) {\n    this->x *= k;\n}\n");
}

#[test]
fn test_plain_value_method_works_on_copy() {
    let fixture = point_fixture();
    let out = emit_named(&fixture.program, "Norm").unwrap();
    assert_eq!(
        out,
        "int64_t Point::Norm() {\n    Point _recv = *this;\n    return _recv.x;\n}\n"
    );
}

#[test]
fn test_struct_literals_and_contract_boxing() {
    let fixture = point_fixture();
    let out = emit_named(&fixture.program, "main").unwrap();
    assert!(out.contains("    Stringer* s{};\n"));
    assert!(out.contains("    pt = [&]() { Point _v; _v.x = 1; return _v; }();\n"));
    assert!(out.contains("    s = new Point(pt);\n"));
    assert!(out.contains("    pp = new Point([&]() { Point _v; _v.x = 2; return _v; }());\n"));
}

#[test]
fn test_function_literal_owns_its_defer_stack() {
    let program = program_with_main(|pkg, scope| {
        let unit = pkg.types().func(&[], &[]);
        pkg.bind(scope, "f", unit, BindingKind::Var);
        let lit_scope = pkg.scope(Some(scope));
        let Stmt::Expr { x: call } = call_stmt(pkg, "cleanup") else {
            unreachable!()
        };
        let lit = pkg.func_lit(unit, Block::new(vec![Stmt::Defer { call }], None), lit_scope);
        let f = pkg.var("f", unit);
        vec![assign(vec![f], AssignOp::Define, vec![lit])]
    });

    let out = emit_named(&program, "main").unwrap();
    let expected = "\
void _main() {
    std::function<void()> f{nullptr};
    f = [&]() -> void {
        goxx::defer _defer_;
        _defer_.push([=]() mutable { cleanup(); });
    };
}
";
    assert_eq!(out, expected);
}

#[test]
fn test_unsupported_constructs_name_the_function() {
    let program = program_with_main(|pkg, _| {
        let imag = pkg.expr(
            ExprKind::BasicLit {
                lit: LitKind::Imag,
                value: "2i".to_string(),
            },
            None,
        );
        vec![expr_stmt(imag)]
    });
    let err = emit_named(&program, "main").unwrap_err();
    assert!(matches!(err.root(), CodegenError::Unsupported { .. }));
    assert!(err.to_string().starts_with("function `main`"));

    let program = program_with_main(|_, _| vec![Stmt::Select]);
    let err = emit_named(&program, "main").unwrap_err();
    assert!(matches!(err.root(), CodegenError::Unsupported { .. }));

    let program = program_with_main(|pkg, scope| {
        let body_scope = pkg.scope(Some(scope));
        vec![Stmt::For {
            init: None,
            cond: None,
            post: None,
            body: Block::new(
                vec![Stmt::Branch {
                    tok: BranchKind::Break,
                    label: Some("outer".to_string()),
                }],
                None,
            ),
            scope: body_scope,
        }]
    });
    let err = emit_named(&program, "main").unwrap_err();
    assert!(err.to_string().contains("labeled break to `outer`"));
}

#[test]
fn test_arity_mismatch_is_structural() {
    let program = program_with_main(|pkg, scope| {
        let int = pkg.types().basic(BasicKind::Int);
        pkg.bind(scope, "a", int, BindingKind::Var);
        pkg.bind(scope, "b", int, BindingKind::Var);
        let (a, b) = (pkg.var("a", int), pkg.var("b", int));
        let one = pkg.int(1);
        vec![assign(vec![a, b], AssignOp::Assign, vec![one])]
    });
    let err = emit_named(&program, "main").unwrap_err();
    assert!(matches!(err.root(), CodegenError::StructuralMismatch { .. }));
}

#[test]
fn test_package_init_assigns_in_order() {
    let mut b = ProgramBuilder::new();
    let int = b.basic(BasicKind::Int);
    let mut pkg = b.package("main");
    let file = pkg.file("main.go");
    pkg.global(file, "counter", int);
    pkg.global(file, "limit", int);
    let seven = pkg.int(7);
    pkg.init_var(&["counter"], seven);
    let counter = pkg.var("counter", int);
    let two = pkg.int(2);
    let doubled = pkg.binary(BinaryOp::Mul, counter, two, int);
    pkg.init_var(&["limit"], doubled);
    pkg.finish();
    let program = b.build();

    let index = SatisfactionIndex::build(&program).unwrap();
    let config = TranslatorConfig::default();
    let cx = EmitContext::new(&program, &program.packages[0], &index, &config);
    let mut session = Session::new();
    let out = emit_package_init(cx, &mut session, &program.packages[0].init_order).unwrap();
    assert_eq!(
        out,
        "void _package_init() {\n    counter = 7;\n    limit = (counter * 2);\n}\n"
    );
}

#[test]
fn test_function_names() {
    let f = func("main", TypeId(0), ScopeId(0), Vec::new());
    assert_eq!(function_name(&f, 0), "_main");
    let f = func("init", TypeId(0), ScopeId(0), Vec::new());
    assert_eq!(function_name(&f, 2), "_init_2");
    let f = func("helper", TypeId(0), ScopeId(0), Vec::new());
    assert_eq!(function_name(&f, 0), "helper");
}
