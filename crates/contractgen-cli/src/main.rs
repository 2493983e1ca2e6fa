//! contractgen CLI entrypoint
//! Parses command-line arguments and dispatches to the core library.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use contractgen_core::{
    build_contracts, generate::check, ApiDescription, Config, ConsistencyReport, DirectorySink,
    SecuritySemantics, TargetFramework,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contractgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the description and run settings come from
#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Path or URL of the normalized description (YAML or JSON)
    ///
    /// Example: --input petshop.yaml
    /// Example: --input https://example.com/petshop.json
    #[arg(long)]
    input: Option<String>,
    /// Configuration file (YAML or TOML); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Frameworks to emit (laravel, symfony, slim); repeat or separate with commas
    #[arg(long = "target", value_delimiter = ',')]
    targets: Vec<TargetFramework>,
    /// PHP namespace root (defaults to the description's namespace)
    #[arg(long)]
    namespace: Option<String>,
    /// How requirement objects naming several schemes are read
    #[arg(long)]
    security_semantics: Option<SecuritySemantics>,
    /// Only build these operationIds
    #[arg(long = "include", value_delimiter = ',')]
    include: Vec<String>,
    /// Skip these operationIds
    #[arg(long = "exclude", value_delimiter = ',')]
    exclude: Vec<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Build contracts, emit every target and write the artifacts
    Generate {
        #[command(flatten)]
        input: InputArgs,
        /// Output directory; each target gets a subdirectory
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Template override directory
        #[arg(long)]
        template_dir: Option<PathBuf>,
        /// Write the consistency report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Exit successfully even when targets disagree
        #[arg(long)]
        allow_inconsistency: bool,
    },
    /// Build contracts and compare targets without writing anything
    Check {
        #[command(flatten)]
        input: InputArgs,
        /// Write the consistency report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the canonical contracts as JSON
    Contracts {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Ok(false) when the run completed but must not pass
async fn run(command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Generate {
            input,
            output_dir,
            template_dir,
            report,
            allow_inconsistency,
        } => {
            let mut config = resolve_config(&input).await?;
            if let Some(dir) = output_dir {
                config.output_dir = dir.to_string_lossy().into_owned();
            }
            if let Some(dir) = template_dir {
                config.template_dir = Some(dir.to_string_lossy().into_owned());
            }
            if allow_inconsistency {
                config.fail_on_inconsistency = false;
            }

            let sink = DirectorySink::new(&config.output_dir);
            let result = contractgen_core::generate(&config, Arc::new(sink))
                .await
                .with_context(|| format!("Failed to generate from {}", config.input_path))?;

            for target in &result.targets {
                println!(
                    "{}: {} file(s) in {}",
                    target.target,
                    target.artifacts.len(),
                    Path::new(&config.output_dir).join(target.target.as_str()).display()
                );
            }
            finish(&result.consistency, report.as_deref(), config.fail_on_inconsistency).await
        }
        Commands::Check { input, report } => {
            let config = resolve_config(&input).await?;
            let description = load(&config).await?;
            let (contracts, bound, consistency) = check(&description, &config)
                .with_context(|| format!("Failed to check {}", config.input_path))?;
            println!(
                "{} contract(s), {} target(s)",
                contracts.len(),
                bound.len()
            );
            finish(&consistency, report.as_deref(), config.fail_on_inconsistency).await
        }
        Commands::Contracts { input } => {
            let config = resolve_config(&input).await?;
            let description = load(&config).await?;
            let contracts = build_contracts(&description, config.build_options())
                .with_context(|| format!("Failed to build contracts from {}", config.input_path))?;
            println!("{}", serde_json::to_string_pretty(contracts.contracts())?);
            Ok(true)
        }
    }
}

/// Config file values, then flag overrides
async fn resolve_config(args: &InputArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let input = args
                .input
                .as_deref()
                .context("--input is required when no --config is given")?;
            Config::new("contractgen", input, "generated")
        }
    };

    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if !args.targets.is_empty() {
        config.targets = args.targets.clone();
    }
    if let Some(namespace) = &args.namespace {
        config.namespace = Some(namespace.clone());
    }
    if let Some(semantics) = args.security_semantics {
        config.security_semantics = semantics;
    }
    if !args.include.is_empty() {
        config.include_operations = args.include.clone();
    }
    if !args.exclude.is_empty() {
        config.exclude_operations = args.exclude.clone();
    }
    config.validate()?;
    tracing::debug!("resolved configuration: {config:?}");
    Ok(config)
}

async fn load(config: &Config) -> anyhow::Result<ApiDescription> {
    ApiDescription::from_file_or_url(&config.input_path)
        .await
        .with_context(|| format!("Failed to load description {}", config.input_path))
}

/// Print findings, write the JSON report, and decide the exit status
async fn finish(
    report: &ConsistencyReport,
    report_path: Option<&Path>,
    fail_on_inconsistency: bool,
) -> anyhow::Result<bool> {
    if let Some(path) = report_path {
        tokio::fs::write(path, report.to_json()?)
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    if report.is_clean() {
        println!("targets are consistent ({})", report.emitters.join(", "));
        return Ok(true);
    }
    eprintln!("{} inconsistency finding(s):", report.findings.len());
    for finding in &report.findings {
        eprintln!("  - {finding}");
    }
    Ok(!fail_on_inconsistency)
}
