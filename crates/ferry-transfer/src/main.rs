//! ferry-transfer CLI
//!
//! Moves users, schemas, documents, files and functions between backends.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ferry_transfer::log::LogLevel;
use ferry_transfer::pipeline::logs_at;
use ferry_transfer::config::{DestinationConfig, SourceConfig};
use ferry_transfer::{CheckReport, MigrationConfig, Pipeline};

#[derive(Parser)]
#[command(name = "ferry-transfer")]
#[command(version)]
#[command(about = "Transfer resources between backend platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dry run mode (check both ends, transfer nothing)
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Batch size override
    #[arg(long, global = true)]
    batch_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a transfer from a config file
    Run {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Check that both ends are ready
    Check {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Generate an example configuration
    Init {
        /// Source backend
        #[arg(short, long, value_enum)]
        source: SourceKind,

        /// Destination backend
        #[arg(short, long, value_enum, default_value = "local")]
        destination: DestinationKind,

        /// Output file path
        #[arg(short, long, default_value = "transfer.yaml")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Nhost,
    Local,
}

#[derive(Clone, Copy, ValueEnum)]
enum DestinationKind {
    Local,
    Appwrite,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { config } => {
            run_transfer(&config, cli.dry_run, cli.batch_size).await?;
        }
        Commands::Validate { config } => {
            validate_config(&config)?;
        }
        Commands::Check { config } => {
            check_adapters(&config).await?;
        }
        Commands::Init {
            source,
            destination,
            output,
        } => {
            generate_config(source, destination, &output)?;
        }
    }

    Ok(())
}

fn load_config(
    config_path: &Path,
    dry_run: bool,
    batch_size: Option<usize>,
) -> anyhow::Result<MigrationConfig> {
    info!("Loading configuration from {:?}", config_path);

    let mut config = MigrationConfig::from_file(config_path)?;
    if dry_run {
        config.options.dry_run = true;
    }
    if let Some(bs) = batch_size {
        config.options.batch_size = bs;
    }
    config.validate()?;
    Ok(config)
}

async fn run_transfer(
    config_path: &Path,
    dry_run: bool,
    batch_size: Option<usize>,
) -> anyhow::Result<()> {
    let config = load_config(config_path, dry_run, batch_size)?;

    let mut pipeline = Pipeline::new(config)?.with_progress_bar(true);
    let stats = pipeline.run().await?;

    if stats.dry_run {
        println!("\nDry run: both ends are ready, nothing was transferred.");
        return Ok(());
    }

    println!("\nTransfer complete");
    for progress in &stats.progress {
        println!(
            "   {:<12} {} of {} transferred, {} failed, {} skipped",
            progress.resource.as_str(),
            progress.current,
            progress.total,
            progress.failed,
            progress.skipped
        );
    }
    println!("   Errors:     {}", stats.errors);
    println!("   Warnings:   {}", stats.warnings);
    println!("   Duration:   {:.2}s", stats.duration_secs);
    println!("   Throughput: {:.0} items/sec", stats.throughput());

    for log in logs_at(&stats, LogLevel::Error) {
        match &log.subject {
            Some(subject) => eprintln!("   [{} {}] {}", subject.resource, subject.id, log.message),
            None => eprintln!("   {}", log.message),
        }
    }

    Ok(())
}

fn validate_config(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path, false, None)?;

    println!("Configuration is valid");
    let source = match &config.source {
        SourceConfig::NHost(cfg) => format!("nhost ({}:{})", cfg.host, cfg.port),
        SourceConfig::Local(cfg) => format!("local ({})", cfg.path.display()),
    };
    let destination = match &config.destination {
        DestinationConfig::Local(cfg) => format!("local ({})", cfg.path.display()),
        DestinationConfig::Appwrite(cfg) => format!("appwrite ({})", cfg.endpoint),
    };
    println!("   Source:      {}", source);
    println!("   Destination: {}", destination);
    println!("   Batch size:  {}", config.options.batch_size);

    Ok(())
}

async fn check_adapters(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path, false, None)?;
    let mut pipeline = Pipeline::new(config)?;
    let resources = pipeline.resources();
    let (source, destination) = pipeline.check().await?;

    print_report("Source", &source);
    print_report("Destination", &destination);

    if !(source.is_ready() && destination.is_ready()) {
        anyhow::bail!("{} of {:?} not ready", config_path.display(), resources);
    }
    Ok(())
}

fn print_report(side: &str, report: &CheckReport) {
    println!("{}:", side);
    for (kind, problems) in report.iter() {
        if problems.is_empty() {
            println!("   {:<12} ready", kind.as_str());
        }
        for problem in problems {
            println!("   {:<12} {}", kind.as_str(), problem);
        }
    }
}

fn generate_config(
    source: SourceKind,
    destination: DestinationKind,
    output: &Path,
) -> anyhow::Result<()> {
    let source = match source {
        SourceKind::Nhost => NHOST_TEMPLATE,
        SourceKind::Local => LOCAL_SOURCE_TEMPLATE,
    };
    let destination = match destination {
        DestinationKind::Local => LOCAL_DESTINATION_TEMPLATE,
        DestinationKind::Appwrite => APPWRITE_TEMPLATE,
    };

    std::fs::write(output, format!("{}{}{}", source, destination, OPTIONS_TEMPLATE))?;
    println!("Generated configuration: {:?}", output);
    println!(
        "   Edit the file and run: ferry-transfer run --config {:?}",
        output
    );

    Ok(())
}

const NHOST_TEMPLATE: &str = r#"# ferry-transfer configuration
source:
  type: nhost
  host: your-subdomain.db.eu-central-1.nhost.run
  port: 5432
  database: your-subdomain
  username: postgres
  password: change-me

"#;

const LOCAL_SOURCE_TEMPLATE: &str = r#"# ferry-transfer configuration
source:
  type: local
  path: ./staging

"#;

const LOCAL_DESTINATION_TEMPLATE: &str = r#"destination:
  type: local
  path: ./staging

"#;

const APPWRITE_TEMPLATE: &str = r#"destination:
  type: appwrite
  endpoint: https://cloud.appwrite.io/v1
  project: your-project-id
  api_key: change-me

"#;

const OPTIONS_TEMPLATE: &str = r#"options:
  batch_size: 100
  file_batch_size: 5
  file_chunk_size: 5242880
  # empty = everything both ends support
  resources: [Users, Databases, Documents]
  dry_run: false
"#;
