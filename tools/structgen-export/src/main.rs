// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct layout export CLI
//!
//! Reads type metadata produced by the introspection collaborator and writes
//! the generated Rust declarations.
//!
//! # Usage
//!
//! ```bash
//! # Export to stdout with the built-in configuration
//! structgen-export --metadata types.json
//!
//! # Export to a file with a custom configuration
//! structgen-export --config structgen.toml --metadata types.json --output generated.rs
//!
//! # Write the default configuration
//! structgen-export gen-config --output structgen.toml
//!
//! # Check a configuration (and optionally a metadata file) without emitting
//! structgen-export validate --config structgen.toml --metadata types.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use structgen::{ExportConfig, ExportReport, Exporter, TypeLibrary};
use tracing_subscriber::EnvFilter;

/// Struct layout exporter
#[derive(Parser, Debug)]
#[command(name = "structgen-export")]
#[command(about = "Generate fixed-layout Rust declarations from type metadata")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Metadata JSON file
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Revision recorded in the output header (overrides the config)
    #[arg(long)]
    revision: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the default configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "structgen.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,

        /// Also build the registry from this metadata file
        #[arg(short, long)]
        metadata: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(&output),
            Commands::Validate { config, metadata } => cmd_validate(&config, metadata.as_deref()),
        };
    }

    let mut config = load_config(args.config.as_deref())?;
    if args.revision.is_some() {
        config.revision = args.revision;
    }

    let metadata = args
        .metadata
        .context("--metadata is required when no subcommand is given")?;
    let library = load_library(&metadata)?;

    let output = Exporter::new(&library, &config)
        .run()
        .context("Export failed")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &output.text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", output.text),
    }

    print_summary(&output.report);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ExportConfig> {
    match path {
        Some(path) => ExportConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ExportConfig::default()),
    }
}

fn load_library(path: &Path) -> Result<TypeLibrary> {
    let library = TypeLibrary::from_file(path)
        .with_context(|| format!("Failed to load metadata {}", path.display()))?;
    tracing::info!("Loaded {} type descriptions from {}", library.len(), path.display());
    Ok(library)
}

fn print_summary(report: &ExportReport) {
    eprintln!();
    eprintln!("Export summary");
    eprintln!("--------------");
    eprintln!("Registered declarations: {}", report.registered);
    eprintln!("Emitted declarations:    {}", report.emitted);
    eprintln!("Copy-tainted:            {}", report.tainted);
    eprintln!("Taint passes:            {:?}", report.taint_passes);
    eprintln!("Diagnostics:             {}", report.diagnostics.len());
    for diagnostic in &report.diagnostics {
        eprintln!("  - {}", diagnostic);
    }
}

fn cmd_gen_config(output: &Path) -> Result<()> {
    let config = ExportConfig::default();
    let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

    let content = format!(
        r#"# Struct layout export configuration
# Generated by structgen-export gen-config

{}
"#,
        toml_str
    );

    std::fs::write(output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: &Path, metadata: Option<&Path>) -> Result<()> {
    let config = match ExportConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    };

    println!("Configuration valid!");
    println!();
    println!("Namespaces: {}", config.namespaces.len());
    for mapping in &config.namespaces {
        println!(
            "  {} -> crate::{} {}",
            mapping.source,
            mapping.target.join("::"),
            if mapping.export { "" } else { "(external)" }
        );
    }
    println!("Field exclusions: {}", config.field_exclusions.len());
    println!("Derive suppressions: {}", config.no_derive.len());
    println!("External types: {}", config.external_types.len());

    if let Some(path) = metadata {
        let library = load_library(path)?;
        let ctx = Exporter::new(&library, &config)
            .build()
            .context("Registry build failed")?;
        println!();
        println!("Metadata: {} types, {} declarations", library.len(), ctx.registry.len());
        println!("Diagnostics: {}", ctx.diagnostics.len());
        for diagnostic in &ctx.diagnostics {
            println!("  - {}", diagnostic);
        }
    }

    Ok(())
}
