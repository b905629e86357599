//! Rule tree command line interface
//!
//! Checks JSON argument documents against a YAML rule document.
//!
//! # Usage
//!
//! ```bash
//! # Transform then validate a subject
//! echo '{"firstName": "  Ahmed ", "age": 15}' | ruletree check --rules rules.yaml
//!
//! # Same, stopping at the first failing field, machine-readable output
//! ruletree check --rules rules.yaml --input args.json --abort-early --format json
//!
//! # List compiled field paths and configuration faults
//! RULETREE_RULES=rules.yaml ruletree rules
//! ```
//!
//! Exit codes: 0 passed, 1 rejected (or faulty rule document for `rules`),
//! 2 usage or I/O error.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::{json, Map, Value};
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

use ruletree::config::RULES_ENV_VAR;
use ruletree::telemetry;
use ruletree::{
    FieldCall, FieldGuard, FieldInfo, GateDecision, GuardConfig, RuleConfigError, RuleDocument,
};

#[derive(Parser)]
#[command(name = "ruletree")]
#[command(version)]
#[command(about = "Validate and transform argument documents with rule trees")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: json or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform then validate a JSON subject
    Check {
        /// Rule document (YAML or JSON)
        #[arg(short, long, env = RULES_ENV_VAR)]
        rules: PathBuf,

        /// Subject document (reads stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Stop at the first failing field
        #[arg(long)]
        abort_early: bool,
    },

    /// List compiled rule paths and configuration faults
    Rules {
        /// Rule document (YAML or JSON)
        #[arg(short, long, env = RULES_ENV_VAR)]
        rules: PathBuf,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            rules,
            input,
            abort_early,
        } => cmd_check(&rules, input, abort_early, cli.format),
        Commands::Rules { rules } => cmd_rules(&rules, cli.format),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", json!({ "error": format!("{e:#}") }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::from(2)
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_check(rules: &Path, input: Option<PathBuf>, abort_early: bool, format: OutputFormat) -> Result<bool> {
    let compiled = RuleDocument::from_path(rules)?.compile();
    if format == OutputFormat::Pretty {
        print_faults(&compiled.faults);
    }

    let source = read_input(input)?;
    let subject: Value = serde_json::from_str(&source).context("subject is not valid JSON")?;
    let Value::Object(args) = subject else {
        bail!("subject must be a JSON object");
    };

    let mut config = compiled.guard_config(GuardConfig::default());
    config.abort_early |= abort_early;
    let guard = FieldGuard::new(config, |errors| {
        debug!(fields = errors.field_count(), "subject rejected");
    });

    let info = FieldInfo::new("cli", "check");
    let call = FieldCall {
        root: &Value::Null,
        args: Some(&args),
        context: &Value::Null,
        info: &info,
    };
    let decision = futures::executor::block_on(guard.check(&compiled.field_rules(), &call).resolve());

    match decision {
        GateDecision::Proceed(subject) => {
            let subject = Value::Object(subject.unwrap_or_default());
            match format {
                OutputFormat::Json => println!("{}", json!({ "valid": true, "subject": subject })),
                OutputFormat::Pretty => {
                    println!("{} subject passed", "OK".green().bold());
                    println!("{}", serde_json::to_string_pretty(&subject)?);
                }
            }
            Ok(true)
        }
        GateDecision::Rejected(errors) => {
            match format {
                OutputFormat::Json => println!("{}", json!({ "valid": false, "errors": errors })),
                OutputFormat::Pretty => {
                    println!(
                        "{} {} field(s) failed",
                        "FAILED".red().bold(),
                        errors.field_count()
                    );
                    print_failures(errors.as_map(), "");
                }
            }
            Ok(false)
        }
    }
}

fn cmd_rules(rules: &Path, format: OutputFormat) -> Result<bool> {
    let compiled = RuleDocument::from_path(rules)?.compile();
    let transform: Vec<String> = compiled
        .transformation
        .leaf_paths()
        .iter()
        .map(|path| path.join("."))
        .collect();
    let validate: Vec<String> = compiled
        .validation
        .leaf_paths()
        .iter()
        .map(|path| path.join("."))
        .collect();

    match format {
        OutputFormat::Json => {
            let faults: Vec<Value> = compiled
                .faults
                .iter()
                .map(|fault| json!({ "code": fault.code(), "message": fault.to_string() }))
                .collect();
            let output = json!({
                "abort_early": compiled.abort_early,
                "transform": transform,
                "validate": validate,
                "faults": faults,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Pretty => {
            for (section, paths) in [("transform", &transform), ("validate", &validate)] {
                println!("{} ({})", section.cyan().bold(), paths.len());
                for path in paths {
                    println!("  {path}");
                }
            }
            print_faults(&compiled.faults);
        }
    }

    Ok(compiled.faults.is_empty())
}

// =============================================================================
// HELPERS
// =============================================================================

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("failed to read '{}'", path.display())),
        None => {
            if io::stdin().is_terminal() {
                bail!("no subject provided; use --input or pipe JSON via stdin");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn print_faults(faults: &[RuleConfigError]) {
    for fault in faults {
        eprintln!("{} [{}] {}", "warning".yellow().bold(), fault.code(), fault);
    }
}

/// Print one line per failing field: `path: code, code`.
fn print_failures(tree: &Map<String, Value>, prefix: &str) {
    for (key, value) in tree {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => print_failures(nested, &path),
            failure => println!("  {}: {}", path.bold(), failure_codes(failure).join(", ")),
        }
    }
}

/// Codes of a wire-form failure: `[code, extras]` or `[[code, extras], ...]`.
fn failure_codes(failure: &Value) -> Vec<String> {
    match failure.as_array().map(Vec::as_slice) {
        Some([Value::String(code), _]) => vec![code.clone()],
        Some(errors) => errors.iter().flat_map(failure_codes).collect(),
        None => vec![failure.to_string()],
    }
}
