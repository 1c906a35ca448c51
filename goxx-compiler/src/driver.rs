//! Namespace driver
//!
//! Walks every package in program order and appends, per source file, a
//! declarations chunk to `<package>.h` and an implementation chunk to
//! `<package>.cpp`. Each chunk is wrapped in the package namespace. After
//! the packages come the program entry point, the aux header and the
//! runtime header.
//!
//! A failing file stops at its first error. Text already produced for it is
//! kept, the failure is recorded and the driver moves on to the next file.

use crate::config::TranslatorConfig;
use crate::context::EmitContext;
use crate::emitter::CppEmitter;
use crate::error::{CodegenError, CodegenResult, ResultExt};
use crate::named_types::NamedTypeEmitter;
use crate::runtime::runtime_source;
use crate::scope::const_declaration;
use crate::session::Session;
use crate::typesig::TypeTranslator;
use crate::utils::{namespace_name, sanitize_identifier};
use crate::walker::{emit_function, emit_package_init, function_name};
use goxx_ast::{File, FuncDecl, Object, Package, Program, TypeId};
use goxx_checker::{order_type_decls, SatisfactionIndex};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A source file whose translation stopped at an error
#[derive(Debug)]
pub struct FileFailure {
    pub package: String,
    pub file: String,
    pub error: CodegenError,
}

/// Everything one translation produced
#[derive(Debug, Default)]
pub struct DriverOutput {
    /// Generated units keyed by path relative to the output directory
    pub files: BTreeMap<PathBuf, String>,
    pub failures: Vec<FileFailure>,
}

/// Per-package bookkeeping shared by its files
struct PackageState {
    header: PathBuf,
    source: PathBuf,
    /// Global-scope specializations, written after the last file's header chunk
    globals: String,
    init_ordinal: usize,
}

pub struct NamespaceDriver<'a> {
    program: &'a Program,
    index: &'a SatisfactionIndex,
    config: &'a TranslatorConfig,
    session: Session,
    output: DriverOutput,
}

impl<'a> NamespaceDriver<'a> {
    pub fn new(program: &'a Program, index: &'a SatisfactionIndex, config: &'a TranslatorConfig) -> Self {
        Self {
            program,
            index,
            config,
            session: Session::new(),
            output: DriverOutput::default(),
        }
    }

    pub fn run(mut self) -> DriverOutput {
        let (program, config) = (self.program, self.config);
        for package in &program.packages {
            self.emit_package(package);
        }
        self.emit_entry_point();
        self.emit_aux_header();
        if config.emit_runtime {
            self.append(Path::new(&config.runtime_header), runtime_source());
        }
        self.output
    }

    fn append(&mut self, path: &Path, text: &str) {
        self.output
            .files
            .entry(path.to_path_buf())
            .or_default()
            .push_str(text);
    }

    fn emitter(&self) -> CppEmitter {
        CppEmitter::new(self.config.indent_width)
    }

    fn emit_package(&mut self, package: &'a Package) {
        debug!(package = %package.name, files = package.files.len(), "emitting package");
        let cx = EmitContext::new(self.program, package, self.index, self.config);
        let mut state = PackageState {
            header: PathBuf::from(format!("{}.h", package.name)),
            source: PathBuf::from(format!("{}.cpp", package.name)),
            globals: String::new(),
            init_ordinal: 0,
        };

        let count = package.files.len();
        for (i, file) in package.files.iter().enumerate() {
            let first = i == 0;
            let last = i + 1 == count;
            if let Err(error) = self.emit_file(cx, file, first, last, &mut state) {
                warn!(package = %package.name, file = %file.name, %error, "file translation failed");
                self.output.failures.push(FileFailure {
                    package: package.name.clone(),
                    file: file.name.clone(),
                    error,
                });
            }
        }
    }

    fn emit_file(
        &mut self,
        cx: EmitContext<'a>,
        file: &'a File,
        first: bool,
        last: bool,
        state: &mut PackageState,
    ) -> CodegenResult<()> {
        debug!(package = %cx.package.name, file = %file.name, "emitting file");
        let names = self.function_names(cx, file, state);

        let mut header = self.emitter();
        if first {
            self.header_preamble(cx, &mut header);
        }
        header.emit_line(&format!("namespace {} {{", cx.namespace()));
        header.emit_line("");
        let result = self.header_chunk(cx, file, first, &names, &mut header, state);
        header.emit_line(&format!("}} // namespace {}", cx.namespace()));
        if last && !state.globals.is_empty() {
            header.emit_line("");
            header.emit_raw(&state.globals);
        }
        let header_path = state.header.clone();
        self.append(&header_path, &header.finish());
        result.context(|| format!("declarations of {}", file.name))?;

        let mut source = self.emitter();
        if first {
            source.emit_line(&format!("#include \"{}\"", state.header.display()));
            source.emit_line("");
        }
        source.emit_line(&format!("namespace {} {{", cx.namespace()));
        source.emit_line("");
        let result = self.source_chunk(cx, file, last, &names, &mut source);
        source.emit_line(&format!("}} // namespace {}", cx.namespace()));
        let source_path = state.source.clone();
        self.append(&source_path, &source.finish());
        result.context(|| format!("definitions of {}", file.name))
    }

    /// C++ names of the file's functions, registering `init` functions
    fn function_names(&mut self, cx: EmitContext<'a>, file: &'a File, state: &mut PackageState) -> Vec<(&'a FuncDecl, String)> {
        let mut names = Vec::new();
        for object in &file.objects {
            let Object::Func(func) = object else {
                continue;
            };
            if func.is_method() {
                names.push((func, sanitize_identifier(&func.name)));
                continue;
            }
            let name = function_name(func, state.init_ordinal);
            if func.name == "init" {
                state.init_ordinal += 1;
                self.session
                    .add_init_call(format!("{}::{}", cx.namespace(), name));
            }
            names.push((func, name));
        }
        names
    }

    fn header_preamble(&self, cx: EmitContext<'a>, out: &mut CppEmitter) {
        out.emit_line("#pragma once");
        out.emit_line("");
        out.emit_line(&format!("#include \"{}\"", self.config.runtime_header));
        out.emit_line(&format!("#include \"{}\"", self.config.aux_header));
        for import in &cx.package.imports {
            out.emit_line(&format!("#include \"{}.h\"", import));
        }
        out.emit_line("");
    }

    fn header_chunk(
        &mut self,
        cx: EmitContext<'a>,
        file: &'a File,
        first: bool,
        names: &[(&'a FuncDecl, String)],
        out: &mut CppEmitter,
        state: &mut PackageState,
    ) -> CodegenResult<()> {
        let namespace = cx.namespace();

        for object in &file.objects {
            if let Object::Const { name, ty, value } = object {
                let sig = cx.type_sig(&mut self.session, *ty)?;
                let line = const_declaration(&cx, &sig, &sanitize_identifier(name), *ty, value);
                self.emit_once(&namespace, &line, out);
            }
        }

        let declared: Vec<TypeId> = file
            .objects
            .iter()
            .filter_map(|o| match o {
                Object::TypeName { ty, .. } if cx.types().named(*ty).is_some() => Some(*ty),
                _ => None,
            })
            .collect();
        let declared = if self.config.order_type_declarations {
            order_type_decls(cx.types(), self.index, &declared)
        } else {
            declared
        };
        for ty in declared {
            let decl = NamedTypeEmitter::new(cx, &mut self.session).emit(ty)?;
            if self.session.once(&namespace, &decl.decl) {
                out.emit_raw(&decl.decl);
                out.emit_line("");
            }
            state.globals.push_str(&decl.global);
        }

        let translator = cx.translator();
        for (func, name) in names.iter().filter(|(f, _)| !f.is_method()) {
            let sig = translator.signature(func.sig)?;
            let rendered = translator.function_sig(&mut self.session, sig)?;
            let line = format!("{} {}({});", rendered.result, name, rendered.params_decl());
            self.emit_once(&namespace, &line, out);
        }

        for object in &file.objects {
            if let Object::Var { name, ty } = object {
                let line = self.variable_declaration(&translator, name, *ty)?;
                self.emit_once(&namespace, &line, out);
            }
        }

        if first && !cx.package.init_order.is_empty() {
            self.emit_once(&namespace, "void _package_init();", out);
        }
        out.emit_line("");
        Ok(())
    }

    fn variable_declaration(&mut self, translator: &TypeTranslator<'_>, name: &str, ty: TypeId) -> CodegenResult<String> {
        let sig = translator.type_sig(&mut self.session, ty)?;
        let zero = translator.nil_val(ty)?;
        Ok(format!("inline {} {}{{{}}};", sig, sanitize_identifier(name), zero))
    }

    fn emit_once(&mut self, namespace: &str, line: &str, out: &mut CppEmitter) {
        if self.session.once(namespace, line) {
            out.emit_line(line);
        }
    }

    fn source_chunk(
        &mut self,
        cx: EmitContext<'a>,
        file: &'a File,
        last: bool,
        names: &[(&'a FuncDecl, String)],
        out: &mut CppEmitter,
    ) -> CodegenResult<()> {
        for (func, name) in names {
            let text = emit_function(cx, &mut self.session, func, name)?;
            if !text.is_empty() {
                out.emit_raw(&text);
                out.emit_line("");
            }
        }
        if last && !cx.package.init_order.is_empty() {
            let text = emit_package_init(cx, &mut self.session, &cx.package.init_order)
                .context(|| format!("package initializer of {}", file.name))?;
            out.emit_raw(&text);
            out.emit_line("");
            self.session.add_package_init(cx.namespace());
        }
        Ok(())
    }

    /// `int main()` in the entry package's implementation unit
    fn emit_entry_point(&mut self) {
        let (program, config) = (self.program, self.config);
        let entry = &config.entry_package;
        let Some(package) = program.package(entry) else {
            warn!(package = %entry, "entry package not found; no entry point emitted");
            return;
        };
        let has_main = package
            .symbols()
            .any(|o| matches!(o, Object::Func(f) if f.name == "main" && !f.is_method()));
        if !has_main {
            warn!(package = %entry, "entry package has no main function");
            return;
        }

        let mut out = self.emitter();
        out.emit_line("int main() {");
        out.indent();
        for call in self.session.init_calls() {
            out.emit_line(&format!("{}();", call));
        }
        for namespace in self.session.package_inits() {
            out.emit_line(&format!("{}::_package_init();", namespace));
        }
        out.emit_line(&format!("{}::_main();", namespace_name(entry)));
        out.emit_line("return 0;");
        out.dedent();
        out.emit_line("}");
        let path = PathBuf::from(format!("{}.cpp", package.name));
        self.append(&path, &out.finish());
    }

    /// Forward declarations of every struct-like named type, then the
    /// hoisted aliases that may refer to them
    fn emit_aux_header(&mut self) {
        let (program, config) = (self.program, self.config);
        let mut out = self.emitter();
        out.emit_line("#pragma once");
        out.emit_line("");
        out.emit_line(&format!("#include \"{}\"", config.runtime_header));
        out.emit_line("");

        let translator = TypeTranslator::new(&program.types, None);
        for package in &program.packages {
            for object in package.symbols() {
                let Object::TypeName { ty, .. } = object else {
                    continue;
                };
                let Some(named) = program.types.named(*ty) else {
                    continue;
                };
                if !translator.is_struct_like(*ty) || named.is_error() {
                    continue;
                }
                out.emit_line(&format!(
                    "namespace {} {{ struct {}; }}",
                    namespace_name(&named.package),
                    sanitize_identifier(&named.name)
                ));
            }
        }

        if !self.session.aliases().is_empty() {
            out.emit_line("");
        }
        for (alias, signature) in self.session.aliases() {
            out.emit_line(&format!("using {} = {};", alias, signature));
        }
        let path = PathBuf::from(&config.aux_header);
        self.append(&path, &out.finish());
    }
}

/// Translate every package of a program
pub fn translate_program(program: &Program, index: &SatisfactionIndex, config: &TranslatorConfig) -> DriverOutput {
    NamespaceDriver::new(program, index, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use goxx_ast::builder::{assign, expr_stmt, ProgramBuilder};
    use goxx_ast::{AssignOp, BasicKind, BindingKind, Block, ExprKind, IdentKind, LitKind, Receiver, RecvDecl, Stmt};

    /// `store` declares `Item` with a value method satisfying `Named`;
    /// `main` keeps a map of item slices and calls into `store`
    fn two_package_program() -> Program {
        let mut b = ProgramBuilder::new();
        let int = b.basic(BasicKind::Int);
        let string = b.basic(BasicKind::String);
        let name_sig = b.func(&[], &[string]);
        let named_iface = b.interface(&[("Name", name_sig)]);
        let named = b.named("store", "Named", named_iface);
        let fields = b.struct_type(&[("id", int), ("label", string)]);
        let item = b.named("store", "Item", fields);
        b.method(item, "Name", name_sig, Receiver::ByValue);
        let items = b.slice(item);
        let index = b.map(string, items);
        let unit = b.func(&[], &[]);
        let count_sig = b.func(&[], &[int]);

        let mut store = b.package("store");
        let file = store.file("item.go");
        store.type_name(file, "Named", named);
        store.type_name(file, "Item", item);
        store.object(
            file,
            Object::Const {
                name: "Limit".to_string(),
                ty: int,
                value: "8".to_string(),
            },
        );
        let scope = store.scope(None);
        store.bind(scope, "it", item, BindingKind::Receiver);
        let recv = store.ident("it", IdentKind::Receiver, Some(item));
        let label = store.selector(recv, "label", Some(string));
        store.func_decl(
            file,
            FuncDecl {
                name: "Name".to_string(),
                recv: Some(RecvDecl {
                    name: Some("it".to_string()),
                    ty: item,
                    kind: Receiver::ByValue,
                }),
                sig: name_sig,
                body: Some(Block::new(vec![Stmt::Return { results: vec![label] }], None)),
                scope,
                escapes: Vec::new(),
            },
        );
        let scope = store.scope(None);
        let limit = store.ident("Limit", IdentKind::Const, Some(int));
        store.func_decl(
            file,
            FuncDecl {
                name: "Count".to_string(),
                recv: None,
                sig: count_sig,
                body: Some(Block::new(vec![Stmt::Return { results: vec![limit] }], None)),
                scope,
                escapes: Vec::new(),
            },
        );
        store.global(file, "total", int);
        let zero = store.int(0);
        store.init_var(&["total"], zero);
        store.finish();

        let mut main = b.package("main");
        main.import("store");
        let file = main.file("main.go");
        main.global(file, "byName", index);
        let scope = main.scope(None);
        main.bind(scope, "n", int, BindingKind::Var);
        let pkg = main.ident("store", IdentKind::Package, None);
        let count = main.selector(pkg, "Count", Some(count_sig));
        let call = main.call(count, Vec::new(), Some(int));
        let n = main.var("n", int);
        let body = vec![assign(vec![n], AssignOp::Define, vec![call])];
        main.func_decl(
            file,
            FuncDecl {
                name: "main".to_string(),
                recv: None,
                sig: unit,
                body: Some(Block::new(body, None)),
                scope,
                escapes: Vec::new(),
            },
        );
        let scope = main.scope(None);
        main.func_decl(
            file,
            FuncDecl {
                name: "init".to_string(),
                recv: None,
                sig: unit,
                body: Some(Block::new(Vec::new(), None)),
                scope,
                escapes: Vec::new(),
            },
        );
        main.finish();
        b.build()
    }

    fn run(program: &Program) -> DriverOutput {
        let index = SatisfactionIndex::build(program).unwrap();
        translate_program(program, &index, &TranslatorConfig::default())
    }

    fn file<'o>(output: &'o DriverOutput, name: &str) -> &'o str {
        output.files.get(Path::new(name)).map(String::as_str).unwrap()
    }

    #[test]
    fn test_units_per_package() {
        let output = run(&two_package_program());
        assert!(output.failures.is_empty(), "{:?}", output.failures);

        let names: Vec<String> = output.files.keys().map(|p| p.display().to_string()).collect();
        assert_eq!(
            names,
            vec!["goxx_aux.h", "goxx_runtime.h", "main.cpp", "main.h", "store.cpp", "store.h"]
        );

        let store_h = file(&output, "store.h");
        assert!(store_h.starts_with("#pragma once\n\n#include \"goxx_runtime.h\"\n#include \"goxx_aux.h\"\n"));
        assert!(store_h.contains("namespace store {\n"));
        assert!(store_h.contains("constexpr int64_t Limit = 8;\n"));
        assert!(store_h.contains("struct Item : public Named {\n"));
        assert!(store_h.contains("int64_t Count();\n"));
        assert!(store_h.contains("inline int64_t total{0};\n"));
        assert!(store_h.contains("void _package_init();\n"));
        assert!(store_h.contains("inline bool goxx::is_zero<store::Item>(const store::Item &v) {\n"));

        let main_h = file(&output, "main.h");
        assert!(main_h.contains("#include \"store.h\"\n"));
        assert!(main_h.contains("namespace main_ {\n"));
        assert!(main_h.contains("void _main();\n"));
        assert!(main_h.contains("void _init_0();\n"));
        assert!(main_h.contains("inline std::map<std::string, _ident_1_> byName{};\n"));
    }

    #[test]
    fn test_implementation_units() {
        let output = run(&two_package_program());
        let store_cpp = file(&output, "store.cpp");
        assert!(store_cpp.starts_with("#include \"store.h\"\n\nnamespace store {\n"));
        assert!(store_cpp.contains("std::string Item::_NameByValue() {\n    return (*this).label;\n}\n"));
        assert!(store_cpp.contains("int64_t Count() {\n    return Limit;\n}\n"));
        assert!(store_cpp.contains("void _package_init() {\n    total = 0;\n}\n"));

        let main_cpp = file(&output, "main.cpp");
        assert!(main_cpp.contains("    n = store::Count();\n"));
        assert!(main_cpp.ends_with(
            "int main() {\n    main_::_init_0();\n    store::_package_init();\n    main_::_main();\n    return 0;\n}\n"
        ));
    }

    #[test]
    fn test_aux_header_forward_declares_and_aliases() {
        let output = run(&two_package_program());
        let aux = file(&output, "goxx_aux.h");
        assert!(aux.contains("namespace store { struct Named; }\n"));
        assert!(aux.contains("namespace store { struct Item; }\n"));
        assert!(aux.contains("using _ident_1_ = goxx::slice<store::Item>;\n"));
    }

    #[test]
    fn test_failed_file_keeps_other_files() {
        let mut b = ProgramBuilder::new();
        let unit = b.func(&[], &[]);
        let mut main = b.package("main");
        let broken = main.file("broken.go");
        let fine = main.file("fine.go");
        let scope = main.scope(None);
        let imag = main.expr(
            ExprKind::BasicLit {
                lit: LitKind::Imag,
                value: "1i".to_string(),
            },
            None,
        );
        main.func_decl(
            broken,
            FuncDecl {
                name: "bad".to_string(),
                recv: None,
                sig: unit,
                body: Some(Block::new(vec![expr_stmt(imag)], None)),
                scope,
                escapes: Vec::new(),
            },
        );
        let scope = main.scope(None);
        main.func_decl(
            fine,
            FuncDecl {
                name: "main".to_string(),
                recv: None,
                sig: unit,
                body: Some(Block::new(Vec::new(), None)),
                scope,
                escapes: Vec::new(),
            },
        );
        main.finish();
        let program = b.build();

        let output = run(&program);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].file, "broken.go");
        assert!(matches!(output.failures[0].error.root(), CodegenError::Unsupported { .. }));

        let main_cpp = file(&output, "main.cpp");
        assert!(main_cpp.contains("void _main() {\n}\n"));
        assert!(main_cpp.contains("int main() {\n"));
        // The broken file's declarations chunk was written before the failure.
        assert!(file(&output, "main.h").contains("void bad();\n"));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let program = two_package_program();
        let first = run(&program);
        let second = run(&program);
        assert_eq!(first.files, second.files);
    }

    #[test]
    fn test_external_runtime_is_not_written() {
        let program = two_package_program();
        let index = SatisfactionIndex::build(&program).unwrap();
        let config = crate::config::presets::external_runtime("vendor/goxx.h");
        let output = translate_program(&program, &index, &config);
        assert!(!output.files.contains_key(Path::new("vendor/goxx.h")));
        assert!(file(&output, "store.h").contains("#include \"vendor/goxx.h\"\n"));
    }
}
