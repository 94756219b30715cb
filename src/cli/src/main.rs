//! rolegen - RBAC manifest generator
//!
//! Reads role definitions, resolves explicit ClusterRole reuse, validates
//! the reference graph and writes per-cluster Kubernetes RBAC manifests.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rolegen_cli::diagnostics;
use rolegen_cli::{DirectorySink, RolegenConfig, StdoutSink, YamlDefinitionSource};
use rolegen_core::DefinitionSource;
use rolegen_rbac::{GenerationReport, Generator, ManifestSink};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

/// rolegen CLI
#[derive(Parser)]
#[command(name = "rolegen")]
#[command(about = "Generate Kubernetes RBAC manifests from role definitions")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "ROLEGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate definitions and write manifests
    Generate {
        /// Definitions file or directory (overrides config)
        #[arg(short, long)]
        definitions: Option<PathBuf>,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only emit objects for these clusters
        #[arg(long = "cluster")]
        clusters: Vec<String>,

        /// Print one YAML stream instead of writing files
        #[arg(long)]
        stdout: bool,

        /// Remove existing cluster directories under the output first
        #[arg(long, conflicts_with = "stdout")]
        prune: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Validate definitions without writing anything
    Validate {
        /// Definitions file or directory (overrides config)
        #[arg(short, long)]
        definitions: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List available namespace templates
    Templates,
}

/// Diagnostic output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for manifests and reports
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = match &cli.config {
        Some(path) => {
            let config = RolegenConfig::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => RolegenConfig::default(),
    };
    config.validate()?;

    match cli.command {
        Command::Generate {
            definitions,
            output,
            clusters,
            stdout,
            prune,
            format,
        } => {
            let definitions = definitions.unwrap_or_else(|| config.paths.definitions.clone());
            let report = run(&config, &definitions)?;
            print_report(&report, format, !stdout)?;

            let Some(manifests) = &report.manifests else {
                return Ok(ExitCode::FAILURE);
            };
            let manifests = if clusters.is_empty() {
                manifests.clone()
            } else {
                let unknown = manifests.unknown_clusters(&clusters);
                if !unknown.is_empty() {
                    anyhow::bail!(
                        "No generated objects target cluster(s) {} (known: {})",
                        unknown.join(", "),
                        manifests.clusters().into_iter().collect::<Vec<_>>().join(", ")
                    );
                }
                manifests.restrict_to(&clusters)
            };

            if stdout {
                StdoutSink.write(&manifests)?;
            } else {
                let output = output.unwrap_or_else(|| config.paths.output.clone());
                let written = DirectorySink::new(&output)
                    .pruning(prune)
                    .write(&manifests)
                    .with_context(|| format!("Failed to write manifests to {}", output.display()))?;
                if format == Format::Text {
                    println!("wrote {} files to {}", written, output.display());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate {
            definitions,
            format,
        } => {
            let definitions = definitions.unwrap_or_else(|| config.paths.definitions.clone());
            let report = run(&config, &definitions)?;
            print_report(&report, format, true)?;
            Ok(exit_code(&report))
        }
        Command::Templates => {
            for (name, template) in config.catalog().iter() {
                match &template.description {
                    Some(description) => println!("{:<16} {}", name, description),
                    None => println!("{}", name),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load definitions and run one generation
fn run(config: &RolegenConfig, definitions: &Path) -> Result<GenerationReport> {
    let records = YamlDefinitionSource::new(definitions)
        .load()
        .with_context(|| format!("Failed to load definitions from {}", definitions.display()))?;
    debug!(records = records.len(), "loaded definition records");

    let generator = Generator::with_config(config.catalog(), config.synthesizer_config())?;
    Ok(generator.generate_report(&records)?)
}

/// Print diagnostics; text goes to stderr when stdout carries manifests
fn print_report(report: &GenerationReport, format: Format, to_stdout: bool) -> Result<()> {
    let rendered = match format {
        Format::Json => report.to_json()?,
        Format::Text => diagnostics::render_text(report),
    };
    if to_stdout {
        print!("{}", rendered);
        if format == Format::Json {
            println!();
        }
    } else {
        eprint!("{}", rendered);
        if format == Format::Json {
            eprintln!();
        }
    }
    Ok(())
}

fn exit_code(report: &GenerationReport) -> ExitCode {
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
