use criterion::{black_box, criterion_group, criterion_main, Criterion};
use goxx::ast::builder::ProgramBuilder;
use goxx::ast::{BasicKind, Block, FuncDecl, Program, Receiver, RecvDecl};
use goxx::{analyze, translate, SatisfactionIndex, TranslatorConfig};

/// `contracts` single-method interfaces and `types` structs, each type
/// implementing every other contract
fn wide_program(contracts: usize, types: usize) -> Program {
    let mut b = ProgramBuilder::new();
    let int = b.basic(BasicKind::Int);
    let unit = b.func(&[], &[]);
    let getter = b.func(&[], &[int]);

    let ifaces: Vec<_> = (0..contracts)
        .map(|i| {
            let iface = b.interface(&[(&format!("M{}", i), getter)]);
            b.named("main", &format!("I{}", i), iface)
        })
        .collect();
    let structs: Vec<_> = (0..types)
        .map(|i| {
            let fields = b.struct_type(&[("value", int)]);
            let named = b.named("main", &format!("T{}", i), fields);
            for m in (i % 2..contracts).step_by(2) {
                b.method(named, &format!("M{}", m), getter, Receiver::ByRef);
            }
            named
        })
        .collect();

    let mut pkg = b.package("main");
    let file = pkg.file("main.go");
    for (i, &iface) in ifaces.iter().enumerate() {
        pkg.type_name(file, &format!("I{}", i), iface);
    }
    for (i, &ty) in structs.iter().enumerate() {
        pkg.type_name(file, &format!("T{}", i), ty);
        for m in (i % 2..contracts).step_by(2) {
            let scope = pkg.scope(None);
            let value = pkg.int(m as i64);
            pkg.func_decl(
                file,
                FuncDecl {
                    name: format!("M{}", m),
                    recv: Some(RecvDecl {
                        name: Some("t".to_string()),
                        ty,
                        kind: Receiver::ByRef,
                    }),
                    sig: getter,
                    body: Some(Block::new(
                        vec![goxx::ast::Stmt::Return { results: vec![value] }],
                        None,
                    )),
                    scope,
                    escapes: Vec::new(),
                },
            );
        }
    }
    let scope = pkg.scope(None);
    pkg.func_decl(
        file,
        FuncDecl {
            name: "main".to_string(),
            recv: None,
            sig: unit,
            body: Some(Block::new(Vec::new(), None)),
            scope,
            escapes: Vec::new(),
        },
    );
    pkg.finish();
    b.build()
}

fn benchmark_satisfaction_index(c: &mut Criterion) {
    let program = wide_program(16, 64);

    c.bench_function("satisfaction_index", |b| {
        b.iter(|| SatisfactionIndex::build(black_box(&program)))
    });
}

fn benchmark_analyze(c: &mut Criterion) {
    let program = wide_program(8, 32);

    c.bench_function("analyze", |b| b.iter(|| analyze(black_box(&program))));
}

fn benchmark_translate(c: &mut Criterion) {
    let program = wide_program(16, 64);

    c.bench_function("translate_program", |b| {
        b.iter(|| translate(black_box(&program), TranslatorConfig::default()))
    });
}

criterion_group!(benches, benchmark_satisfaction_index, benchmark_analyze, benchmark_translate);
criterion_main!(benches);
