//! Translation pipeline for orchestrating a whole-program translation

use crate::{
    config::TranslatorConfig,
    driver::{translate_program, DriverOutput},
    output_digest, CompilerDiagnostic, CompilerError, DiagnosticSeverity, DiagnosticSource,
    TranslationMetadata, TranslationResult,
};
use goxx_ast::{load_program, Object, Program};
use goxx_checker::{analyze, Analysis};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Translation pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Load,
    Analyze,
    CodeGen,
    Write,
}

/// Pipeline stage result
#[derive(Debug)]
pub struct PipelineResult<T> {
    pub stage: PipelineStage,
    pub result: T,
    pub duration: Duration,
    pub diagnostics: Vec<CompilerDiagnostic>,
}

/// Translation pipeline
pub struct TranslationPipeline {
    config: TranslatorConfig,
}

impl TranslationPipeline {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    /// Load a program description, translate it and write the units
    pub fn translate_file(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<TranslationResult, CompilerError> {
        let total_start = Instant::now();

        let load = self.run_load_stage(input)?;
        let program = load.result;

        let mut result = self.translate_loaded(&program, load.duration, load.diagnostics)?;

        let write = self.run_write_stage(&result.files, output_dir)?;
        result.diagnostics.extend(write.diagnostics);
        result.written = write.result;
        result.metadata.write_time = write.duration;
        result.metadata.total_time = total_start.elapsed();
        Ok(result)
    }

    /// Translate an already loaded program without touching the filesystem
    pub fn translate_program(&self, program: &Program) -> Result<TranslationResult, CompilerError> {
        let total_start = Instant::now();
        let mut result = self.translate_loaded(program, Duration::ZERO, Vec::new())?;
        result.metadata.total_time = total_start.elapsed();
        Ok(result)
    }

    fn translate_loaded(
        &self,
        program: &Program,
        load_time: Duration,
        mut diagnostics: Vec<CompilerDiagnostic>,
    ) -> Result<TranslationResult, CompilerError> {
        let analysis = self.run_analyze_stage(program)?;
        diagnostics.extend(analysis.diagnostics);

        let codegen = self.run_codegen_stage(program, &analysis.result)?;
        diagnostics.extend(codegen.diagnostics);
        let files = codegen.result;

        let files_translated = program.packages.iter().map(|p| p.files.len()).sum();
        let metadata = TranslationMetadata {
            load_time,
            analyze_time: analysis.duration,
            codegen_time: codegen.duration,
            write_time: Duration::ZERO,
            total_time: Duration::ZERO,
            packages: program.packages.len(),
            files_translated,
            generated_files: files.len(),
            total_output_size: files.values().map(String::len).sum(),
            output_digest: output_digest(&files),
        };

        Ok(TranslationResult {
            files,
            written: Vec::new(),
            diagnostics,
            metadata,
        })
    }

    /// Run load stage
    fn run_load_stage(&self, input: &Path) -> Result<PipelineResult<Program>, CompilerError> {
        let start = Instant::now();
        let program = load_program(input)?;
        let duration = start.elapsed();
        info!(?duration, packages = program.packages.len(), "load stage finished");

        Ok(PipelineResult {
            stage: PipelineStage::Load,
            result: program,
            duration,
            diagnostics: Vec::new(),
        })
    }

    /// Run analysis stage
    fn run_analyze_stage(&self, program: &Program) -> Result<PipelineResult<Analysis>, CompilerError> {
        let start = Instant::now();
        let analysis = analyze(program)?;
        let duration = start.elapsed();
        info!(?duration, pairs = analysis.index.pair_count(), "analyze stage finished");

        Ok(PipelineResult {
            stage: PipelineStage::Analyze,
            result: analysis,
            duration,
            diagnostics: Vec::new(),
        })
    }

    /// Run code generation stage
    fn run_codegen_stage(
        &self,
        program: &Program,
        analysis: &Analysis,
    ) -> Result<PipelineResult<BTreeMap<PathBuf, String>>, CompilerError> {
        let start = Instant::now();
        let DriverOutput { files, failures } = translate_program(program, &analysis.index, &self.config);
        let duration = start.elapsed();
        info!(?duration, files = files.len(), failures = failures.len(), "codegen stage finished");

        let mut diagnostics: Vec<CompilerDiagnostic> = failures
            .into_iter()
            .map(|failure| CompilerDiagnostic {
                severity: DiagnosticSeverity::Error,
                message: failure.error.to_string(),
                source: DiagnosticSource::CodeGenerator,
                location: Some(format!("{}/{}", failure.package, failure.file)),
            })
            .collect();

        let has_main = program
            .package(&self.config.entry_package)
            .is_some_and(|p| matches!(p.lookup("main"), Some(Object::Func(f)) if !f.is_method()));
        if !has_main {
            diagnostics.push(CompilerDiagnostic {
                severity: DiagnosticSeverity::Warning,
                message: format!(
                    "package `{}` has no main function, the entry point calls nothing",
                    self.config.entry_package
                ),
                source: DiagnosticSource::CodeGenerator,
                location: None,
            });
        }

        Ok(PipelineResult {
            stage: PipelineStage::CodeGen,
            result: files,
            duration,
            diagnostics,
        })
    }

    /// Run file writing stage
    ///
    /// Units are appended to their files, so without `clear_output_dir` a
    /// second run extends the previous output.
    fn run_write_stage(
        &self,
        files: &BTreeMap<PathBuf, String>,
        output_dir: &Path,
    ) -> Result<PipelineResult<Vec<PathBuf>>, CompilerError> {
        let start = Instant::now();
        let mut written = Vec::new();
        let mut diagnostics = Vec::new();

        if self.config.clear_output_dir && output_dir.exists() {
            if !names_a_directory(output_dir) {
                return Err(CompilerError::UnsafeOutputDir {
                    path: output_dir.to_path_buf(),
                });
            }
            std::fs::remove_dir_all(output_dir).map_err(|e| CompilerError::Io {
                path: output_dir.to_path_buf(),
                error: e,
            })?;
        }

        for (relative_path, content) in files {
            let full_path = output_dir.join(relative_path);

            if let Some(parent) = full_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    diagnostics.push(CompilerDiagnostic {
                        severity: DiagnosticSeverity::Error,
                        message: format!("Failed to create directory {}: {}", parent.display(), e),
                        source: DiagnosticSource::Writer,
                        location: None,
                    });
                    continue;
                }
            }

            let appended = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&full_path)
                .and_then(|mut f| f.write_all(content.as_bytes()));
            match appended {
                Ok(()) => written.push(full_path),
                Err(e) => diagnostics.push(CompilerDiagnostic {
                    severity: DiagnosticSeverity::Error,
                    message: format!("Failed to write file {}: {}", full_path.display(), e),
                    source: DiagnosticSource::Writer,
                    location: None,
                }),
            }
        }

        let duration = start.elapsed();
        info!(?duration, files = written.len(), "write stage finished");

        Ok(PipelineResult {
            stage: PipelineStage::Write,
            result: written,
            duration,
            diagnostics,
        })
    }

    /// Get pipeline configuration
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Update pipeline configuration
    pub fn update_config(&mut self, config: TranslatorConfig) {
        self.config = config;
    }
}

/// Whether clearing `dir` removes something narrower than the working
/// directory, one of its ancestors or a filesystem root
fn names_a_directory(dir: &Path) -> bool {
    dir.components().any(|c| matches!(c, Component::Normal(_)))
}
