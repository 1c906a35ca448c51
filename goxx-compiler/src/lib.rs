//! goxx Code Generator
//!
//! This crate turns a whole, type-checked Go program into C++17 source. It
//! emits one header and one implementation unit per package, a program-wide
//! aux header and, optionally, the support runtime the generated code
//! targets.

pub mod config;
pub mod context;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod named_types;
pub mod pipeline;
pub mod runtime;
pub mod scope;
pub mod session;
pub mod typesig;
pub mod utils;
pub mod walker;

// Re-export main types
pub use config::{ConfigError, TranslatorConfig};
pub use driver::{translate_program, DriverOutput, FileFailure, NamespaceDriver};
pub use error::{CodegenError, CodegenResult};
pub use pipeline::{PipelineResult, PipelineStage, TranslationPipeline};
pub use runtime::{runtime_source, RUNTIME_HEADER};
pub use typesig::TypeTranslator;

use goxx_ast::Program;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CompilerError>;

/// Translate an in-memory program with the given configuration
pub fn translate(program: &Program, config: TranslatorConfig) -> Result<TranslationResult> {
    TranslationPipeline::new(config).translate_program(program)
}

/// Load a program description and write its translation to `output_dir`
pub fn translate_file(input: &Path, output_dir: &Path, config: TranslatorConfig) -> Result<TranslationResult> {
    TranslationPipeline::new(config).translate_file(input, output_dir)
}

/// Translation result
#[derive(Debug)]
pub struct TranslationResult {
    /// Generated units keyed by path relative to the output directory
    pub files: BTreeMap<PathBuf, String>,
    /// Paths written by the write stage, empty for in-memory translation
    pub written: Vec<PathBuf>,
    pub diagnostics: Vec<CompilerDiagnostic>,
    pub metadata: TranslationMetadata,
}

impl TranslationResult {
    pub fn errors(&self) -> impl Iterator<Item = &CompilerDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub fn is_success(&self) -> bool {
        self.errors().next().is_none()
    }
}

/// Translation metadata
#[derive(Debug, Clone)]
pub struct TranslationMetadata {
    pub load_time: Duration,
    pub analyze_time: Duration,
    pub codegen_time: Duration,
    pub write_time: Duration,
    pub total_time: Duration,
    pub packages: usize,
    pub files_translated: usize,
    pub generated_files: usize,
    pub total_output_size: usize,
    /// SHA-256 over every unit in path order, hex encoded
    pub output_digest: String,
}

/// Hash generated units in path order
pub fn output_digest(files: &BTreeMap<PathBuf, String>) -> String {
    let mut hasher = Sha256::new();
    for (path, text) in files {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// Translator diagnostic
#[derive(Debug, Clone)]
pub struct CompilerDiagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub source: DiagnosticSource,
    /// `package/file` of the failing source file, when known
    pub location: Option<String>,
}

/// Source of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSource {
    Loader,
    Analyzer,
    CodeGenerator,
    Writer,
}

/// Translator errors
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("Failed to load program: {0}")]
    Load(#[from] goxx_ast::LoadError),

    #[error("Analysis failed: {0}")]
    Check(#[from] goxx_checker::CheckError),

    #[error("Code generation failed for {package}/{file}: {source}")]
    Codegen {
        package: String,
        file: String,
        source: CodegenError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error for {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Refusing to clear output directory {path:?}")]
    UnsafeOutputDir { path: PathBuf },
}

impl From<FileFailure> for CompilerError {
    fn from(failure: FileFailure) -> Self {
        CompilerError::Codegen {
            package: failure.package,
            file: failure.file,
            source: failure.error,
        }
    }
}

/// Translator builder for fluent configuration
pub struct TranslatorBuilder {
    config: TranslatorConfig,
}

impl TranslatorBuilder {
    pub fn new() -> Self {
        Self {
            config: TranslatorConfig::default(),
        }
    }

    pub fn entry_package(mut self, package: &str) -> Self {
        self.config.entry_package = package.to_string();
        self
    }

    pub fn runtime_header(mut self, header: &str) -> Self {
        self.config.runtime_header = header.to_string();
        self
    }

    pub fn emit_runtime(mut self, enabled: bool) -> Self {
        self.config.emit_runtime = enabled;
        self
    }

    pub fn aux_header(mut self, header: &str) -> Self {
        self.config.aux_header = header.to_string();
        self
    }

    pub fn hoist_map_values(mut self, enabled: bool) -> Self {
        self.config.hoist_map_values = enabled;
        self
    }

    pub fn order_type_declarations(mut self, enabled: bool) -> Self {
        self.config.order_type_declarations = enabled;
        self
    }

    pub fn annotate_escapes(mut self, enabled: bool) -> Self {
        self.config.annotate_escapes = enabled;
        self
    }

    pub fn clear_output_dir(mut self, enabled: bool) -> Self {
        self.config.clear_output_dir = enabled;
        self
    }

    pub fn indent_width(mut self, width: usize) -> Self {
        self.config.indent_width = width;
        self
    }

    /// Validate the configuration and build the translator
    pub fn build(self) -> Result<Translator> {
        self.config.validate()?;
        Ok(Translator::new(self.config))
    }
}

impl Default for TranslatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main translator interface
pub struct Translator {
    pipeline: TranslationPipeline,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            pipeline: TranslationPipeline::new(config),
        }
    }

    pub fn translate(&self, program: &Program) -> Result<TranslationResult> {
        self.pipeline.translate_program(program)
    }

    pub fn translate_file(&self, input: &Path, output_dir: &Path) -> Result<TranslationResult> {
        self.pipeline.translate_file(input, output_dir)
    }

    pub fn config(&self) -> &TranslatorConfig {
        self.pipeline.config()
    }

    pub fn update_config(&mut self, config: TranslatorConfig) -> Result<()> {
        config.validate()?;
        self.pipeline.update_config(config);
        Ok(())
    }
}

/// Convenience functions
pub mod convenience {
    use super::*;
    use goxx_checker::{analyze, SatisfactionIndex};

    /// Translate with default settings, failing on the first broken file
    pub fn translate_to_strings(program: &Program) -> Result<BTreeMap<PathBuf, String>> {
        let config = TranslatorConfig::default();
        let analysis = analyze(program)?;
        let output = driver::translate_program(program, &analysis.index, &config);
        match output.failures.into_iter().next() {
            Some(failure) => Err(failure.into()),
            None => Ok(output.files),
        }
    }

    /// Translate a JSON program description with default settings
    pub fn translate_json(source: &str) -> Result<TranslationResult> {
        let program = Program::from_json(source)?;
        translate(&program, TranslatorConfig::default())
    }

    /// Analysis only
    pub fn satisfaction_index(program: &Program) -> Result<SatisfactionIndex> {
        Ok(analyze(program)?.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goxx_ast::builder::ProgramBuilder;
    use goxx_ast::{Block, FuncDecl, LitKind};

    fn program(body: Vec<goxx_ast::Stmt>) -> Program {
        let mut builder = ProgramBuilder::new();
        let main_sig = builder.func(&[], &[]);
        let mut pkg = builder.package("main");
        let scope = pkg.scope(None);
        let file = pkg.file("main.go");
        pkg.func_decl(
            file,
            FuncDecl {
                name: "main".to_string(),
                recv: None,
                sig: main_sig,
                body: Some(Block::new(body, None)),
                scope,
                escapes: Vec::new(),
            },
        );
        pkg.finish();
        builder.build()
    }

    #[test]
    fn test_translator_builder() {
        let translator = TranslatorBuilder::new()
            .entry_package("app")
            .indent_width(2)
            .emit_runtime(false)
            .build()
            .unwrap();

        assert_eq!(translator.config().entry_package, "app");
        assert_eq!(translator.config().indent_width, 2);
        assert!(!translator.config().emit_runtime);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = TranslatorBuilder::new().aux_header("goxx_runtime.h").build();
        assert!(matches!(result, Err(CompilerError::Config(_))));
    }

    #[test]
    fn test_digest_tracks_content() {
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from("a.h"), "int x;".to_string());
        let first = output_digest(&files);
        assert_eq!(first.len(), 64);
        assert_eq!(first, output_digest(&files.clone()));

        files.insert(PathBuf::from("a.h"), "int y;".to_string());
        assert_ne!(first, output_digest(&files));
    }

    #[test]
    fn test_convenience_reports_first_failure() {
        let mut builder = ProgramBuilder::new();
        let complex = builder.basic(goxx_ast::BasicKind::Complex128);
        let main_sig = builder.func(&[], &[]);
        let mut pkg = builder.package("main");
        let scope = pkg.scope(None);
        let file = pkg.file("main.go");
        let imag = pkg.expr(
            goxx_ast::ExprKind::BasicLit {
                lit: LitKind::Imag,
                value: "2i".to_string(),
            },
            Some(complex),
        );
        pkg.func_decl(
            file,
            FuncDecl {
                name: "main".to_string(),
                recv: None,
                sig: main_sig,
                body: Some(Block::new(vec![goxx_ast::builder::expr_stmt(imag)], None)),
                scope,
                escapes: Vec::new(),
            },
        );
        pkg.finish();

        let err = convenience::translate_to_strings(&builder.build()).unwrap_err();
        match err {
            CompilerError::Codegen { package, file, .. } => {
                assert_eq!(package, "main");
                assert_eq!(file, "main.go");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_translate_json_round_trip() {
        let json = program(Vec::new()).to_json().unwrap();
        let result = convenience::translate_json(&json).unwrap();
        assert!(result.is_success());
        assert_eq!(result.metadata.packages, 1);
        assert!(result.files.contains_key(Path::new(RUNTIME_HEADER)));
    }
}
