//! DPM Tools - backup and restore of DPM partitions and storage groups
//!
//! The `dpm` command talks to one HMC and works on one CPC per run.
//!
//! ## Commands
//!
//! - `backup-partitions`: write every partition of the CPC to a backup file
//! - `backup-storage-groups`: write every storage group of the CPC
//! - `restore-partitions`: recreate partitions from a backup file
//! - `restore-storage-groups`: recreate storage groups from a backup file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dpm_config::ConfigDocument;
use dpm_core::obs::CommandSpan;
use dpm_core::{
    restore_partitions, restore_storage_groups, write_backup, BackupCollector, HmcSession,
    OperatorProfile, PartitionCollector, PartitionOutcome, ProvisionConfig, ProvisioningReport,
    StorageGroupCollector,
};
use hmc_rest::{ApiVersion, ClientConfig, HmcClient, Transport, DEFAULT_PORT};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "dpm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Backup and restore DPM partitions and storage groups through the HMC", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    console: ConsoleArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConsoleArgs {
    /// HMC host name, address or profile alias
    #[arg(long, env = "HMC_HOST")]
    hmc: String,

    /// HMC Web Services API port (default: profile, then 6794)
    #[arg(long, env = "HMC_PORT")]
    port: Option<u16>,

    /// HMC user (default: profile)
    #[arg(long, env = "HMC_USER")]
    user: Option<String>,

    /// HMC password
    #[arg(long, env = "HMC_PASSWORD", hide_env_values = true)]
    password: String,

    /// Name of the CPC to work on
    #[arg(long)]
    cpc: String,

    /// Accept self-signed HMC certificates
    #[arg(long)]
    insecure: bool,

    /// Operator profile (TOML)
    #[arg(long, env = "DPM_PROFILE")]
    profile: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up every partition on the CPC
    BackupPartitions {
        /// Directory for the backup file
        #[arg(long, default_value = ".")]
        backup_dir: PathBuf,
    },

    /// Back up every storage group owned by the CPC
    BackupStorageGroups {
        /// Directory for the backup file
        #[arg(long, default_value = ".")]
        backup_dir: PathBuf,
    },

    /// Recreate partitions from a partition backup file
    RestorePartitions {
        /// Partition backup file
        #[arg(long)]
        config: PathBuf,

        /// Maximum number of partitions restored at once (default: all)
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Recreate storage groups from a storage group backup file
    RestoreStorageGroups {
        /// Storage group backup file
        #[arg(long)]
        config: PathBuf,

        /// Addresses notified about the fulfillment requests (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        email: Vec<String>,

        /// Maximum number of storage groups restored at once (default: all)
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::BackupPartitions { .. } => "backup-partitions",
            Commands::BackupStorageGroups { .. } => "backup-storage-groups",
            Commands::RestorePartitions { .. } => "restore-partitions",
            Commands::RestoreStorageGroups { .. } => "restore-storage-groups",
        }
    }
}

/// Connection settings after flags, environment and profile are merged.
#[derive(Debug, PartialEq, Eq)]
struct Connection {
    host: String,
    port: u16,
    user: String,
    accept_invalid_certs: bool,
}

impl Connection {
    fn resolve(args: &ConsoleArgs, profile: &OperatorProfile) -> Result<Self> {
        let user = args
            .user
            .clone()
            .or_else(|| profile.user.clone())
            .context("No HMC user given (use --user, HMC_USER or the profile)")?;
        Ok(Connection {
            host: profile.resolve_host(&args.hmc).to_string(),
            port: args.port.or(profile.port).unwrap_or(DEFAULT_PORT),
            user,
            accept_invalid_certs: args.insecure || profile.accept_invalid_certs,
        })
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.host)
            .with_port(self.port)
            .accept_invalid_certs(self.accept_invalid_certs)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    dpm_core::init_tracing(cli.json, level);

    let profile = match &cli.console.profile {
        Some(path) => OperatorProfile::load(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => OperatorProfile::default(),
    };
    let connection = Connection::resolve(&cli.console, &profile)?;

    let client = Arc::new(
        HmcClient::new(connection.client_config()).context("Failed to create HMC client")?,
    );
    let version = client
        .logon(&connection.user, &cli.console.password)
        .await
        .with_context(|| format!("Failed to log on to HMC {}", connection.host))?;

    let _span = CommandSpan::enter(cli.command.name(), &connection.host, &cli.console.cpc);
    let result = run(client.clone(), version, &cli.console.cpc, cli.command).await;

    // Failures are logged by the client; the command result decides the exit status.
    let _ = client.logoff().await;
    result
}

async fn run(
    transport: Arc<dyn Transport>,
    version: ApiVersion,
    cpc: &str,
    command: Commands,
) -> Result<()> {
    let session = HmcSession::open(transport, version, cpc)
        .await
        .with_context(|| format!("Failed to select CPC {cpc}"))?;

    match command {
        Commands::BackupPartitions { backup_dir } => {
            cmd_backup(&session, &PartitionCollector, &backup_dir)
                .await
                .map(drop)
        }
        Commands::BackupStorageGroups { backup_dir } => {
            cmd_backup(&session, &StorageGroupCollector, &backup_dir)
                .await
                .map(drop)
        }
        Commands::RestorePartitions {
            config,
            max_concurrent,
        } => cmd_restore_partitions(&session, &config, max_concurrent).await,
        Commands::RestoreStorageGroups {
            config,
            email,
            max_concurrent,
        } => cmd_restore_storage_groups(&session, &config, &email, max_concurrent).await,
    }
}

async fn cmd_backup(
    session: &HmcSession,
    collector: &dyn BackupCollector,
    backup_dir: &Path,
) -> Result<PathBuf> {
    let summary = write_backup(session, collector, backup_dir)
        .await
        .with_context(|| format!("Failed to back up {}", collector.kind()))?;

    println!("Backed up {} entities:", summary.sections.len());
    for name in &summary.sections {
        println!("  {name}");
    }
    println!("Backup file: {}", summary.path.display());
    Ok(summary.path)
}

fn read_document(path: &Path) -> Result<ConfigDocument> {
    ConfigDocument::read_file(path)
        .with_context(|| format!("Failed to read backup file {}", path.display()))
}

async fn cmd_restore_partitions(
    session: &HmcSession,
    config: &Path,
    max_concurrent: Option<usize>,
) -> Result<()> {
    let document = read_document(config)?;
    info!(sections = document.len(), "restoring partitions");
    let report =
        restore_partitions(session, &document, &ProvisionConfig { max_concurrent }).await;

    print_report("partitions", &report);
    for (name, outcome) in &report.succeeded {
        print_issues(name, outcome);
    }
    Ok(())
}

async fn cmd_restore_storage_groups(
    session: &HmcSession,
    config: &Path,
    emails: &[String],
    max_concurrent: Option<usize>,
) -> Result<()> {
    let document = read_document(config)?;
    info!(sections = document.len(), "restoring storage groups");
    let report = restore_storage_groups(
        session,
        &document,
        emails,
        &ProvisionConfig { max_concurrent },
    )
    .await;

    print_report("storage groups", &report);
    Ok(())
}

fn print_report<T>(kind: &str, report: &ProvisioningReport<T>) {
    println!("Created {kind}: {}", list_or_none(&report.succeeded_names()));
    println!("Failed {kind}: {}", list_or_none(&report.failed_names()));
    for (name, failure) in &report.failed {
        println!("  {name}: {failure}");
    }
}

fn print_issues(name: &str, outcome: &PartitionOutcome) {
    if outcome.issues.is_empty() {
        return;
    }
    println!("Partition {name} was created with problems:");
    for issue in &outcome.issues {
        println!("  {issue}");
    }
}

fn list_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}
