//! goxx: whole-program Go to C++ translation
//!
//! Facade over the workspace crates. `goxx_ast` holds the resolved program
//! model, `goxx_checker` the whole-program analyses and `goxx_compiler` the
//! code generator, pipeline and CLI.

pub use goxx_ast as ast;
pub use goxx_checker as checker;
pub use goxx_compiler as compiler;

pub use goxx_ast::{load_program, Program};
pub use goxx_checker::{analyze, SatisfactionIndex};
pub use goxx_compiler::{
    translate, translate_file, CompilerDiagnostic, CompilerError, DiagnosticSeverity,
    TranslationResult, Translator, TranslatorBuilder, TranslatorConfig,
};

/// Load `input`, translate it and write the units into `output_dir`,
/// failing if any source file could not be translated
pub fn translate_checked(
    input: &std::path::Path,
    output_dir: &std::path::Path,
    config: TranslatorConfig,
) -> anyhow::Result<TranslationResult> {
    let result = translate_file(input, output_dir, config)?;
    if let Some(first) = result.errors().next() {
        anyhow::bail!(
            "{} ({} file(s) failed)",
            first.message,
            result.errors().count()
        );
    }
    Ok(result)
}
