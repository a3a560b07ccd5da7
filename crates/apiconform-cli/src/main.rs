//! apiconform CLI - check a live REST API against its OpenAPI contract

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use apiconform_core::dryrun::{ValidationStatus, validate_config};
use apiconform_core::{Config, DryRunPlan, Specification, VerdictPolicy};
use apiconform_runner::{HttpSession, ScenarioRunner, TestContext};

use crate::storage::RunStore;

#[derive(Parser)]
#[command(name = "apiconform")]
#[command(about = "Check a live REST API against its OpenAPI contract")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Strict mode (schema warnings fail the run). Use --strict true to enable.
    #[arg(long, global = true, default_value_t = false, action = ArgAction::Set)]
    strict: bool,

    /// Log every request (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured scenarios
    Run {
        /// Config file (default: .apiconform.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// OpenAPI document, overriding the config
        #[arg(long)]
        openapi: Option<PathBuf>,

        /// Base URL, overriding the config
        #[arg(long)]
        base_url: Option<String>,

        /// Test the local deployment (basic auth, local_base_url)
        #[arg(long)]
        local: bool,

        /// Only run scenarios whose name or endpoint contains this
        #[arg(short, long)]
        filter: Option<String>,

        /// Show execution plan without sending requests
        #[arg(long)]
        dry_run: bool,

        /// Directory for reproductions.http
        #[arg(short, long, default_value = ".apiconform")]
        output_dir: PathBuf,

        /// Do not save the run under ~/.apiconform/runs
        #[arg(long)]
        no_save: bool,
    },

    /// Initialize config file
    Init,

    /// Validate config and OpenAPI document without sending requests
    Doctor {
        /// Config file (default: .apiconform.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Export JSON Schema for the run report
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

/// Logs go to stderr so `--output json` stays parseable.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            config,
            openapi,
            base_url,
            local,
            filter,
            dry_run,
            output_dir,
            no_save,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(openapi) = openapi {
                cfg.openapi = openapi;
            }
            if local {
                cfg.local_test = true;
            }
            if let Some(base_url) = base_url {
                if cfg.local_test {
                    cfg.local_base_url = Some(base_url);
                } else {
                    cfg.base_url = base_url;
                }
            }

            // Dry run: show plan and exit
            if dry_run {
                let spec = Specification::load(&cfg.openapi).ok();
                let plan = DryRunPlan::build(&cfg, spec.as_ref(), filter.as_deref());
                match cli.output {
                    OutputFormat::Terminal => println!("{}", plan.to_terminal()),
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                    OutputFormat::Silent => {}
                }
                return Ok(if plan.has_errors() { 1 } else { 0 });
            }

            let spec = Specification::load(&cfg.openapi)
                .with_context(|| format!("loading {}", cfg.openapi.display()))?;

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  openapi:  {}", cfg.openapi.display());
                eprintln!("  base_url: {}", cfg.target_base_url());
                eprintln!(
                    "  mode:     {}",
                    if cfg.local_test { "local" } else { "remote" }
                );
                eprintln!("  scenarios: {}", cfg.scenarios.len());
                eprintln!();
            }

            let session = HttpSession::connect(&cfg).context("opening HTTP session")?;
            let ctx = TestContext::new(cfg.target_base_url(), cfg.local_test, session, spec);

            let policy = VerdictPolicy {
                strict: cli.strict,
                ignore_failure_types: cfg.ignore.clone(),
            };
            let report = ScenarioRunner::new(&ctx, &cfg).report(filter.as_deref(), &policy);

            // Nothing ran → tool error, not a pass
            if report.cases.is_empty() {
                eprintln!("Error: No scenarios were run. Check scenarios and --filter.");
                return Ok(3);
            }

            match cli.output {
                OutputFormat::Terminal => {
                    println!("{}", report.to_terminal());
                    println!("  Exit code: {}", report.verdict.exit_code);

                    match storage::write_reproductions(&output_dir, &report) {
                        Ok(Some(path)) => println!("Reproductions: {}", path.display()),
                        Ok(None) => {}
                        Err(e) => eprintln!("Warning: failed to write .http file: {e}"),
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Silent => {}
            }

            if !no_save {
                match RunStore::in_home().and_then(|store| store.save(&cfg, &report)) {
                    Ok(path) => {
                        if cli.output != OutputFormat::Silent {
                            eprintln!("Report saved: {}", path.display());
                        }
                    }
                    Err(e) => eprintln!("Warning: failed to save report: {e}"),
                }
            }

            Ok(report.verdict.exit_code)
        }

        Commands::Init => {
            let config_path = ".apiconform.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - openapi: path to your OpenAPI document");
            println!("  - base_url / local_base_url: deployments to test");
            println!("  - auth: basic auth (local) or OAuth2 client credentials (remote)");
            println!("  - scenarios: endpoints, resources and expectations");
            Ok(0)
        }

        Commands::Doctor { config } => {
            println!("apiconform doctor");
            println!("=================\n");

            let cfg = match load_config(config.as_deref()) {
                Ok(cfg) => {
                    println!("[OK] Config file");
                    cfg
                }
                Err(e) => {
                    println!("[NG] Config file: {e:#}");
                    println!("\nCreate config file:");
                    println!("  apiconform init");
                    return Ok(1);
                }
            };

            let spec = Specification::load(&cfg.openapi).ok();
            let validations = validate_config(&cfg, spec.as_ref());
            for v in &validations {
                println!("[{}] {}", v.status, v.message);
            }

            if validations
                .iter()
                .any(|v| v.status == ValidationStatus::Error)
            {
                println!("\nFix the errors above before running.");
                return Ok(1);
            }

            println!("\nReady to run!");
            Ok(0)
        }

        Commands::Schema => {
            let schema = apiconform_core::report::generate_schema();
            println!("{schema}");
            Ok(0)
        }
    }
}
