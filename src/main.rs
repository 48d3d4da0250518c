//! --- Pocket Treasury Entrypoint ---
//! Loads address files, runs the category pools against `pocketd` and prints
//! the resulting treasury report.

use clap::{Args, Parser, Subcommand};
use pocket_treasury::{
    address::{Address, AddressKind, AddressRules, Category},
    config::{ConfigError, TreasuryConfig, DEFAULT_CONFIG_PATH},
    ledger::{LedgerClient, PocketdClient, QueryError, ThrottledClient},
    loader::{self, LoadError},
    orchestrator::{CategoryOrchestrator, TreasuryError},
    progress::TracingProgress,
    render,
    validation::{TreasuryPlan, ValidationError},
};
use std::fs;
use std::io;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Error)]
enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Load(#[from] LoadError),
    /// The offending addresses have already been printed.
    #[error("Address validation failed")]
    ValidationFailed,
    #[error("Treasury run failed: {0}")]
    Treasury(#[from] TreasuryError),
    #[error("Ledger query failed: {0}")]
    Query(#[from] QueryError),
    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    InvalidArgument(String),
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Aggregates liquid and staked POKT holdings of a treasury across the Pocket Network."
)]
struct Cli {
    /// Configuration file; defaults apply when it does not exist.
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Log filter, e.g. `info` or `pocket_treasury=debug`.
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,
    /// RPC endpoint passed to pocketd.
    #[arg(long, global = true, value_name = "URL")]
    node: Option<String>,
    /// Process-wide query rate limit in queries per second.
    #[arg(long, global = true, value_name = "QPS")]
    rate_limit: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query every category of a treasury JSON file and print the totals.
    Treasury {
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Query a single category from a text or JSON address file.
    TreasuryTools {
        #[command(subcommand)]
        tool: ToolCommands,
    },
    /// List the supplier operator addresses staked by an owner.
    FetchSuppliers {
        #[arg(long, value_name = "ADDRESS")]
        owner_address: String,
        #[arg(long, value_name = "FILE")]
        output_file: Option<PathBuf>,
    },
    /// Write the default configuration.
    InitConfig {
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ToolCommands {
    LiquidBalance(ToolArgs),
    AppStakes(ToolArgs),
    NodeStakes(ToolArgs),
    ValidatorStakes(ToolArgs),
    DelegatorStakes(ToolArgs),
}

impl ToolCommands {
    fn split(self) -> (Category, ToolArgs) {
        match self {
            ToolCommands::LiquidBalance(args) => (Category::Liquid, args),
            ToolCommands::AppStakes(args) => (Category::AppStake, args),
            ToolCommands::NodeStakes(args) => (Category::NodeStake, args),
            ToolCommands::ValidatorStakes(args) => (Category::ValidatorStake, args),
            ToolCommands::DelegatorStakes(args) => (Category::DelegatorStake, args),
        }
    }
}

#[derive(Args, Debug)]
struct ToolArgs {
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Concurrent address queries per category.
    #[arg(long, value_name = "N")]
    max_workers: Option<usize>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

fn initialize_logging(level: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set up logging subscriber.");
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    if let Commands::InitConfig { output } = &cli.command {
        initialize_logging(cli.log_level.as_deref().unwrap_or("info"));
        return init_config(output.as_deref().unwrap_or(&cli.config));
    }

    let mut config = TreasuryConfig::load(&cli.config.display().to_string())?;
    if let Some(node) = cli.node {
        config.ledger.node_url = node;
    }
    if let Some(rate) = cli.rate_limit {
        config.pool.max_queries_per_second = Some(rate);
    }
    initialize_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    match cli.command {
        Commands::Treasury { file, run } => run_treasury(config, &file, run).await,
        Commands::TreasuryTools { tool } => {
            let (category, args) = tool.split();
            run_tool(config, category, &args.file, args.run).await
        }
        Commands::FetchSuppliers {
            owner_address,
            output_file,
        } => {
            config.validate()?;
            let client = ledger_client(&config);
            fetch_suppliers(
                &config,
                client.as_ref(),
                Address::from(owner_address.trim()),
                output_file.as_deref(),
            )
            .await
        }
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn init_config(path: &Path) -> Result<(), CliError> {
    let path = path.display().to_string();
    TreasuryConfig::default().save(&path)?;
    println!("Default configuration written to '{path}'.");
    Ok(())
}

/// Applies the run flags, validates the result and builds the orchestrator.
fn build_orchestrator(
    mut config: TreasuryConfig,
    run: &RunArgs,
) -> Result<(TreasuryConfig, CategoryOrchestrator), CliError> {
    if let Some(max_workers) = run.max_workers {
        config.pool.max_workers = max_workers;
    }
    config.validate()?;

    let max_workers = NonZeroUsize::new(config.pool.max_workers)
        .ok_or_else(|| CliError::InvalidArgument("max_workers must be at least 1".to_string()))?;
    let orchestrator = CategoryOrchestrator::new(
        ledger_client(&config),
        config.ledger.denom.clone(),
        max_workers,
    )
    .with_progress(Arc::new(TracingProgress));
    Ok((config, orchestrator))
}

fn ledger_client(config: &TreasuryConfig) -> Arc<dyn LedgerClient> {
    let client: Arc<dyn LedgerClient> = Arc::new(PocketdClient::new(&config.ledger));
    match config.pool.max_queries_per_second.and_then(NonZeroU32::new) {
        Some(rate) => {
            info!("Limiting ledger queries to {rate} per second");
            Arc::new(ThrottledClient::new(client, rate))
        }
        None => client,
    }
}

fn plan_or_report(
    config: &TreasuryConfig,
    build: impl FnOnce(Option<&AddressRules>) -> Result<TreasuryPlan, ValidationError>,
) -> Result<TreasuryPlan, CliError> {
    let rules = if config.addresses.enforce_format {
        Some(config.address_rules()?)
    } else {
        None
    };
    build(rules.as_ref()).map_err(|e| {
        render::print_validation_error(&e);
        CliError::ValidationFailed
    })
}

async fn run_treasury(config: TreasuryConfig, file: &Path, run: RunArgs) -> Result<(), CliError> {
    let (config, orchestrator) = build_orchestrator(config, &run)?;
    let categories = loader::load_treasury(file)?;
    let plan = plan_or_report(&config, |rules| TreasuryPlan::new(categories, rules))?;

    info!(
        "Querying {} addresses from {} with {} workers per category",
        plan.total_addresses(),
        file.display(),
        orchestrator.max_workers()
    );
    let report = orchestrator.run(&plan).await?;

    if run.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }
    Ok(())
}

async fn run_tool(
    config: TreasuryConfig,
    category: Category,
    file: &Path,
    run: RunArgs,
) -> Result<(), CliError> {
    let (config, orchestrator) = build_orchestrator(config, &run)?;
    let addresses = loader::load_category(file, category)?;
    let plan = plan_or_report(&config, |rules| {
        TreasuryPlan::single(category, addresses, rules)
    })?;
    if plan.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "No {} addresses found in '{}'",
            category.label(),
            file.display()
        )));
    }

    let result = orchestrator
        .run_category(category, plan.addresses(category).to_vec())
        .await;

    if run.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render::print_category(&result);
    }
    Ok(())
}

async fn fetch_suppliers(
    config: &TreasuryConfig,
    client: &dyn LedgerClient,
    owner: Address,
    output_file: Option<&Path>,
) -> Result<(), CliError> {
    if config.addresses.enforce_format {
        let rules = config.address_rules()?;
        if !rules.is_valid(&owner, AddressKind::Account) {
            return Err(CliError::InvalidArgument(format!(
                "Invalid owner address '{owner}' (expected {})",
                rules.describe(AddressKind::Account)
            )));
        }
    }

    info!("Fetching suppliers owned by {owner}...");
    let operators = client.suppliers_for_owner(&owner).await?;
    if operators.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "No suppliers found for owner {owner}"
        )));
    }
    println!("Found {} supplier(s) for {owner}", operators.len());
    for operator in &operators {
        println!("  {operator}");
    }

    if let Some(path) = output_file {
        let content: String = operators.iter().map(|o| format!("{o}\n")).collect();
        fs::write(path, content)?;
        println!("Operator addresses written to '{}'.", path.display());
    }
    Ok(())
}
