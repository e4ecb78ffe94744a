//! babel-deploy - Deterministic Babel protocol deployment
//!
//! Usage:
//!   babel-deploy deploy               # Deploy using ./deploy.toml
//!   babel-deploy plan                 # Simulate against the live nonce
//!   babel-deploy predict <addr> <n>   # Print CREATE addresses

mod interactive;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use babel_deploy_core::commands::{
    ContextOverrides, DeployCommand, DeployOptions, DeployReport, PlanCommand, PlanOptions,
    predict_range,
};
use babel_deploy_core::config::DEFAULT_CONFIG_FILE;
use babel_deploy_core::deploy::RunStatus;
use babel_deploy_core::types::Address;

use crate::interactive::ConfirmFlow;

#[derive(Parser)]
#[command(name = "babel-deploy")]
#[command(about = "Deterministic Babel protocol deployment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy and wire the protocol on the configured network
    Deploy(DeployArgs),

    /// Simulate the deployment and print the resulting addresses
    Plan(PlanArgs),

    /// Print the addresses of upcoming contract creations
    Predict {
        /// Deploying account
        address: Address,
        /// First nonce to predict
        nonce: u64,
        /// Number of consecutive nonces
        #[arg(long, short = 'n', default_value_t = 1)]
        count: usize,
        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct ContextArgs {
    /// Path to the deployment configuration
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// JSON-RPC endpoint (overrides network.rpc_url)
    #[arg(long)]
    rpc_url: Option<Url>,
    /// Deploying account (overrides network.deployer)
    #[arg(long)]
    deployer: Option<Address>,
    /// Compiled artifacts directory (overrides artifacts.dir)
    #[arg(long)]
    artifacts: Option<PathBuf>,
    /// Expected chain id (overrides network.chain_id)
    #[arg(long)]
    chain_id: Option<u64>,
}

impl ContextArgs {
    fn overrides(&self) -> ContextOverrides {
        ContextOverrides {
            rpc_url: self.rpc_url.clone(),
            deployer: self.deployer,
            artifacts_dir: self.artifacts.clone(),
            chain_id: self.chain_id,
        }
    }
}

#[derive(Args)]
struct DeployArgs {
    #[command(flatten)]
    context: ContextArgs,
    /// Manifest destination (default: deployments/<chain_id>.json)
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Skip the confirmation prompt (for CI/CD)
    #[arg(short = 'y', long)]
    yes: bool,
    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct PlanArgs {
    #[command(flatten)]
    context: ContextArgs,
    /// Simulate from this nonce without contacting the node
    #[arg(long)]
    nonce: Option<u64>,
    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "babel_deploy=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run_cli(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run_cli(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Deploy(args) => run_deploy(args),
        Commands::Plan(args) => run_plan(args),
        Commands::Predict {
            address,
            nonce,
            count,
            format,
        } => {
            run_predict(address, nonce, count, format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_deploy(args: DeployArgs) -> Result<ExitCode> {
    let mut options = DeployOptions::new(&args.context.config)
        .with_overrides(args.context.overrides());
    if let Some(path) = &args.manifest {
        options = options.with_manifest(path);
    }

    let command = DeployCommand::connect(&options)?;
    let rpc_url = command.ledger().url().to_string();
    if !ConfirmFlow::new(args.yes).confirm(command.summary(), &rpc_url)? {
        tracing::info!("deployment cancelled by operator");
        println!("Deployment cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    tracing::info!(rpc = %rpc_url, "starting deployment");
    let report = command.execute()?;
    print_report(&report, args.format)?;
    Ok(exit_code(&report))
}

fn run_plan(args: PlanArgs) -> Result<ExitCode> {
    let mut options = PlanOptions::new(&args.context.config).with_overrides(args.context.overrides());
    if let Some(nonce) = args.nonce {
        options = options.with_nonce(nonce);
    }

    let report = PlanCommand::execute(&options)?;
    print_report(&report, args.format)?;
    Ok(exit_code(&report))
}

fn run_predict(address: Address, nonce: u64, count: usize, format: OutputFormat) -> Result<()> {
    let predictions = predict_range(address, nonce, count);
    match format {
        OutputFormat::Table => {
            println!("{:<8} Address", "Nonce");
            println!("{}", "-".repeat(52));
            for (nonce, predicted) in predictions {
                println!("{nonce:<8} {predicted}");
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = predictions
                .iter()
                .map(|(nonce, predicted)| serde_json::json!({ "nonce": nonce, "address": predicted }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn exit_code(report: &DeployReport) -> ExitCode {
    if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &DeployReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn print_table(report: &DeployReport) {
    let summary = &report.summary;
    println!("Chain: {}", summary.chain_id);
    println!("Deployer: {}", summary.deployer);
    println!();

    println!("{:<20} {:<10} {:<7} Address", "Contract", "Batch", "Nonce");
    println!("{}", "-".repeat(84));
    for resource in &report.run.deployed {
        println!(
            "{:<20} {:<10} {:<7} {}",
            resource.name, resource.batch, resource.nonce, resource.address
        );
    }

    if !report.run.wiring.is_empty() {
        println!();
        println!("Wiring ({}/{}):", report.run.wiring.len(), summary.wiring_steps);
        for outcome in &report.run.wiring {
            let detail = match (&outcome.tx_hash, &outcome.output) {
                (_, Some(output)) => format!("-> {output}"),
                (Some(tx), None) => format!("tx {tx}"),
                (None, None) => String::new(),
            };
            println!("  {} {} {}", style("✓").green(), outcome.label, style(detail).dim());
        }
    }

    println!();
    match &report.run.status {
        RunStatus::Complete => println!("{}", style("Deployment complete").green().bold()),
        RunStatus::Halted { at, error } => {
            println!("{} at {}", style("Deployment halted").red().bold(), at);
            println!("  {error}");
        }
        RunStatus::Pending => println!("Deployment not started"),
    }
    if let Some(path) = &report.manifest_path {
        println!("Manifest: {}", path.display());
    }
    for note in &report.notes {
        println!("{} {note}", style("note:").yellow());
    }
}
