// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! vbind-gen CLI
//!
//! # Usage
//!
//! ```bash
//! # Write an example configuration
//! vbind-gen gen-config --output vbind.toml
//!
//! # Generate bindings and shim
//! vbind-gen generate --config vbind.toml
//!
//! # Reconcile without writing, fail on any skipped entity
//! vbind-gen check --config vbind.toml --strict
//!
//! # Inspect how a C type resolves
//! vbind-gen resolve "const char *" --signature
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vbind_gen::codegen::rust_backend::rust_type;
use vbind_gen::codegen::{ResolveContext, TypeResolver};
use vbind_gen::{GenConfig, GenerationReport, Generator};

/// Layout-checked binding generator
#[derive(Parser, Debug)]
#[command(name = "vbind-gen")]
#[command(about = "vbind binding generator - Rust bindings and C++ layout shim from a JSON API descriptor")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the bindings module and the shim
    Generate {
        /// Configuration file path
        #[arg(short, long, default_value = "vbind.toml")]
        config: PathBuf,

        /// Exit with an error when any entity was skipped
        #[arg(long)]
        strict: bool,
    },

    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "vbind.toml")]
        output: PathBuf,
    },

    /// Run every stage without writing outputs
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "vbind.toml")]
        config: PathBuf,

        /// Exit with an error when any entity was skipped
        #[arg(long)]
        strict: bool,
    },

    /// Resolve one C type string and print both renderings
    Resolve {
        /// Raw C type, e.g. "const char *"
        ty: String,

        /// Resolve in parameter position
        #[arg(long)]
        signature: bool,

        /// Apply the type overrides of this configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match args.command {
        Commands::Generate { config, strict } => cmd_generate(&config, strict),
        Commands::GenConfig { output } => cmd_gen_config(&output),
        Commands::Check { config, strict } => cmd_check(&config, strict),
        Commands::Resolve {
            ty,
            signature,
            config,
        } => cmd_resolve(&ty, signature, config.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn finish(report: &GenerationReport, strict: bool) -> ExitCode {
    report.summary();
    if strict && report.has_errors() {
        eprintln!(
            "[ERROR] {} entities skipped (--strict)",
            report.errors.len()
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn cmd_generate(config: &Path, strict: bool) -> anyhow::Result<ExitCode> {
    let generator = Generator::from_config_file(config)?;
    let report = generator.generate()?;
    Ok(finish(&report, strict))
}

fn cmd_check(config: &Path, strict: bool) -> anyhow::Result<ExitCode> {
    let generator = Generator::from_config_file(config)?;
    let report = generator.check()?;
    Ok(finish(&report, strict))
}

fn cmd_gen_config(output: &Path) -> anyhow::Result<ExitCode> {
    let config = GenConfig::example();
    let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

    let content = format!(
        "# vbind-gen configuration\n\
         # Generated by: vbind-gen gen-config\n\
         #\n\
         # Paths are relative to this file.\n\n\
         {toml_str}"
    );

    std::fs::write(output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Generated configuration file: {}", output.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_resolve(raw: &str, signature: bool, config: Option<&Path>) -> anyhow::Result<ExitCode> {
    let overrides = match config {
        Some(path) => {
            GenConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?
                .type_overrides
        }
        None => BTreeMap::new(),
    };
    let ctx = if signature {
        ResolveContext::SIGNATURE
    } else {
        ResolveContext::VALUE
    };

    match TypeResolver::new(&overrides).resolve(raw, ctx) {
        Ok(ty) => {
            println!("C:    {ty}");
            println!("Rust: {}", rust_type(&ty));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("[ERROR] {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
