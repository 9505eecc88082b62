#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scopecheck::{collect_files, load_files, render_json, render_text, ConfigFile, Format};
use scopecheck_core::{Engine, RuleId};

#[derive(Parser, Debug)]
#[command(
    name = "scopecheck",
    version,
    about = "Structured-concurrency checks for Kotlin coroutine code"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Analyze Kotlin sources and report violations.
    Check {
        /// Files or directories to analyze.
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Configuration file (default: ./scopecheck.toml when present).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use only the textual fallback, never the type resolver.
        #[arg(long, default_value_t = false)]
        no_resolve: bool,

        /// Run only these rules (repeatable).
        #[arg(long = "rule", value_name = "ID")]
        rules: Vec<String>,
    },

    /// List the available rules.
    Rules,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.cmd {
        Cmd::Check {
            paths,
            format,
            config,
            no_resolve,
            rules,
        } => {
            let found = check(&paths, format, config, no_resolve, &rules)?;
            if found > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Cmd::Rules => {
            list_rules();
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn check(
    paths: &[PathBuf],
    format: Format,
    config: Option<PathBuf>,
    no_resolve: bool,
    rules: &[String],
) -> miette::Result<usize> {
    let config = match config {
        Some(path) => ConfigFile::load(&path)?,
        None => ConfigFile::discover(&std::env::current_dir().into_diagnostic()?)?,
    };
    let only = rules
        .iter()
        .map(|id| id.parse::<RuleId>())
        .collect::<Result<Vec<_>, _>>()?;
    let engine = config.engine(no_resolve, &only)?;

    info!("Checking {} path(s)", paths.len());
    let files = collect_files(paths);
    let loaded = load_files(&files);
    for failure in &loaded.failures {
        eprintln!("{failure:?}");
    }
    for err in &loaded.parse_errors {
        warn!("{err:?}");
    }

    let report = engine.run(loaded.inputs());
    for fault in &report.faults {
        warn!("{} failed on {}: {}", fault.rule_id, fault.file, fault.message);
    }

    match format {
        Format::Text => print!("{}", render_text(&report.findings, &report.faults, &loaded)),
        Format::Json => println!("{}", render_json(&report.findings)?),
    }
    Ok(report.findings.len())
}

fn list_rules() {
    let engine = Engine::default();
    for rule in engine.rules() {
        let options = rule.options();
        println!(
            "{:<36} {:<10} {:<12} {}",
            rule.id(),
            options.severity.as_str(),
            options.debt.as_str(),
            rule.description()
        );
    }
}
