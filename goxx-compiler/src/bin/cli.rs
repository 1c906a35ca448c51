//! goxx translator CLI

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use goxx_ast::load_program;
use goxx_compiler::{
    config::presets, convenience, DiagnosticSeverity, TranslatorConfig, Translator,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "goxx")]
#[command(about = "Translate whole, type-checked Go programs to C++")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a program description to C++
    Translate(TranslateArgs),

    /// Analyze a program and print its interface satisfaction index
    Check(CheckArgs),

    /// Create default configuration file
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "goxx.toml")]
        output: PathBuf,

        /// Start from the literal preset (no hoisting, no reordering)
        #[arg(long)]
        literal: bool,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file path
        path: PathBuf,
    },
}

#[derive(Args)]
struct TranslateArgs {
    /// Resolved program description (JSON)
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not write the support runtime header
    #[arg(long)]
    no_runtime: bool,

    /// Print the SHA-256 digest of the generated units
    #[arg(long)]
    digest: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct CheckArgs {
    /// Resolved program description (JSON)
    input: PathBuf,

    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct SatisfactionReport {
    types: Vec<goxx_checker::IndexedType>,
    pairs: Vec<(String, String)>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Translate(args) => handle_translate(args),
        Commands::Check(args) => handle_check(args),
        Commands::InitConfig { output, literal } => handle_init_config(output, literal),
        Commands::ValidateConfig { path } => handle_validate_config(path),
    }
}

fn handle_translate(args: TranslateArgs) -> Result<()> {
    info!("Translating {} into {}", args.input.display(), args.output.display());

    let mut config = match &args.config {
        Some(path) => TranslatorConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => TranslatorConfig::default(),
    };
    if args.no_runtime {
        config.emit_runtime = false;
    }
    config.validate().context("invalid configuration")?;

    let translator = Translator::new(config);
    let result = translator
        .translate_file(&args.input, &args.output)
        .with_context(|| format!("translating {}", args.input.display()))?;

    for diagnostic in &result.diagnostics {
        let location = diagnostic.location.as_deref().unwrap_or("-");
        match diagnostic.severity {
            DiagnosticSeverity::Error => error!(%location, "{}", diagnostic.message),
            DiagnosticSeverity::Warning => warn!(%location, "{}", diagnostic.message),
            DiagnosticSeverity::Info => info!(%location, "{}", diagnostic.message),
        }
    }

    info!("  Load time: {:?}", result.metadata.load_time);
    info!("  Analyze time: {:?}", result.metadata.analyze_time);
    info!("  Code generation time: {:?}", result.metadata.codegen_time);
    info!("  Write time: {:?}", result.metadata.write_time);
    info!("  Total time: {:?}", result.metadata.total_time);
    info!(
        "  Generated {} files from {} source files",
        result.metadata.generated_files, result.metadata.files_translated
    );

    if args.digest {
        println!("{}", result.metadata.output_digest);
    }

    let failed = result.errors().count();
    if failed > 0 {
        bail!("{} file(s) failed to translate", failed);
    }
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<()> {
    info!("Analyzing {}", args.input.display());

    let program = load_program(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let index = convenience::satisfaction_index(&program)?;

    let name = |id| {
        index
            .entry(id)
            .map(|t| t.qualified_name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let pairs: Vec<(String, String)> = index.pairs().map(|(t, c)| (name(t), name(c))).collect();

    match args.format {
        OutputFormat::Json => {
            let report = SatisfactionReport {
                types: index.types().to_vec(),
                pairs,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for ty in index.types() {
                let kind = if ty.is_interface { "interface" } else { "type" };
                println!("{} {}", kind, ty.qualified_name);
            }
            for (ty, contract) in &pairs {
                println!("{} satisfies {}", ty, contract);
            }
        }
    }

    Ok(())
}

fn handle_init_config(output: PathBuf, literal: bool) -> Result<()> {
    info!("Creating configuration file at {}", output.display());

    let config = if literal {
        presets::literal()
    } else {
        presets::standard()
    };
    config.to_file(&output)?;

    info!("Configuration file created successfully!");
    Ok(())
}

fn handle_validate_config(path: PathBuf) -> Result<()> {
    info!("Validating configuration file {}", path.display());

    let config = TranslatorConfig::from_file(&path)?;
    config.validate()?;

    info!("Configuration file is valid!");
    Ok(())
}
