use anyhow::Context;
use clap::Parser;
use recent_changes::presenter::render_report;
use recent_changes::{ChangeMode, ChangeScan, ClientConfig, OrgConfig, SalesforceClient, ScanOptions};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Visualize recently modified metadata and generate package.xml
#[derive(Debug, Parser)]
#[command(name = "sf-recent-changes", version, about)]
struct Cli {
    /// The org to connect to
    #[arg(short = 'o', long = "target-org")]
    target_org: String,

    /// Number of days to look back
    #[arg(short, long, default_value_t = 15, value_parser = clap::value_parser!(i64).range(0..))]
    days: i64,

    /// Filter by created date instead of last modified date
    #[arg(short, long)]
    created: bool,

    /// Comma-separated list of metadata types to check, or "all"
    #[arg(short, long, default_value = "")]
    types: String,

    /// Only show changes made by the current user
    #[arg(short, long)]
    mine: bool,

    /// Print the changed components as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Override the API version used for calls and the manifest
    #[arg(long)]
    api_version: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,recent_changes=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut org = OrgConfig::from_env(&cli.target_org)
        .with_context(|| format!("Failed to load configuration for org '{}'", cli.target_org))?;
    if let Some(version) = cli.api_version {
        org.api_version = version;
    }
    info!("Connecting to {} (API v{})", org.instance_url, org.api_version);

    let client = SalesforceClient::new(org, ClientConfig::default())?;

    let mode = ChangeMode::from_created_flag(cli.created);
    let options = ScanOptions {
        days: cli.days,
        mode,
        types: cli.types,
        mine: cli.mine,
        output_dir: PathBuf::from("output"),
    };

    let scan = ChangeScan::new(&client, options);
    let plan = scan.prepare().await.map_err(|e| {
        error!("Scan aborted: {}", e);
        e
    })?;

    for warning in &plan.warnings {
        eprintln!("Warning: {}", warning);
    }
    if let Some(name) = plan.author_filter.as_ref().filter(|_| !cli.json) {
        println!("Filtering for user: {}", name);
    }

    let report = scan.execute(plan).await.map_err(|e| {
        error!("Scan aborted: {}", e);
        e
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.records)?);
        return Ok(());
    }

    println!("\n{}", render_report(&report.records, mode));

    if let Some(path) = &report.manifest_path {
        println!("\nGenerated {}", path.display());
    }

    Ok(())
}
