//! migrategen CLI - schema snapshot to ordered migration plan

mod args;
mod config;
mod output;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use migrategen_core::{Diagnostic, SchemaBuilder, SchemaSnapshot, TargetFramework};

use crate::args::{Args, Command, OutputFormat};
use crate::config::Config;
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.quiet {
        tracing::Level::ERROR
    } else {
        match args.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Plan {
            snapshot,
            config: config_path,
            target,
            format,
            exclude,
        } => {
            // CLI takes precedence over migrategen.toml
            let config =
                Config::load(config_path.as_ref())?.merge_with_args(&target, &format, &exclude);

            let target = resolve_target(config.target.as_deref());
            let mut raw = load_snapshot(&snapshot)?;
            raw.exclude_tables(&config.exclude);
            if raw.database.is_none() {
                raw.database = config.database.clone();
            }

            let mut builder = SchemaBuilder::with_target(target);
            builder.add_snapshot(&raw);
            let (catalog, mut diagnostics) = builder.build();
            tracing::info!(
                tables = catalog.tables.len(),
                %target,
                "assembled schema catalog"
            );

            let formatter =
                OutputFormatter::new(config.output_format(), snapshot.display().to_string());
            let has_errors = diagnostics.iter().any(Diagnostic::is_error);

            match catalog.into_plan() {
                Ok(plan) => {
                    formatter.print_plan(&plan, &diagnostics)?;
                    if !args.quiet && config.output_format() == OutputFormat::Human {
                        eprintln!();
                        eprintln!(
                            "Ordered {} table(s), {} view(s), {} procedure(s), {} trigger(s)",
                            plan.tables.len(),
                            plan.views.len(),
                            plan.procedures.len(),
                            plan.triggers.len()
                        );
                    }
                    Ok(has_errors)
                }
                Err(err) => {
                    diagnostics.push(
                        Diagnostic::error(err.kind(), err.to_string()).with_help(
                            "break the cycle by adding one of the foreign keys in a later migration",
                        ),
                    );
                    formatter.print_diagnostics(&diagnostics)?;
                    Ok(true)
                }
            }
        }

        Command::Schema { snapshot, target } => {
            let config = Config::find_and_load()?.unwrap_or_default();
            let target = resolve_target(target.as_deref().or(config.target.as_deref()));
            let raw = load_snapshot(&snapshot)?;

            let mut builder = SchemaBuilder::with_target(target);
            builder.add_snapshot(&raw);
            let (catalog, diagnostics) = builder.build();

            output::print_schema(&catalog);
            if !diagnostics.is_empty() {
                let formatter =
                    OutputFormatter::new(OutputFormat::Human, snapshot.display().to_string());
                formatter.print_diagnostics(&diagnostics)?;
            }

            Ok(diagnostics.iter().any(Diagnostic::is_error))
        }
    }
}

fn resolve_target(key: Option<&str>) -> TargetFramework {
    key.map(TargetFramework::from_config_key).unwrap_or_default()
}

fn load_snapshot(path: &Path) -> Result<SchemaSnapshot> {
    let content = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to parse snapshot {}", path.display()))
}
