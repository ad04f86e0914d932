use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use newsdesk::config::{topics_from_names, AppConfig};
use newsdesk::pipeline::Pipeline;

/// Pull items from configured sources, classify them into topics, and
/// persist deduplicated partitions plus a markdown report.
#[derive(Parser, Debug)]
#[command(name = "newsdesk", version, about)]
struct Args {
    /// Config file (TOML or JSON); built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the partition store directory from the config.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the report output directory from the config.
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Comma-separated topic names; replaces configured topics with
    /// single-keyword topics.
    #[arg(long)]
    topics: Option<String>,

    /// Items per topic in the report.
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("starting newsdesk");

    let mut config =
        AppConfig::load_or_default(args.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir.display().to_string();
    }
    if let Some(dir) = args.reports_dir {
        config.reports_dir = dir.display().to_string();
    }

    let sources = config.validated_sources();
    if sources.is_empty() {
        anyhow::bail!("no valid sources configured");
    }

    let topics = match args.topics.as_deref() {
        Some(names) => topics_from_names(names),
        None => config.validated_topics(),
    };
    if topics.is_empty() {
        warn!("no valid topics configured, everything will be uncategorized");
    }

    let pipeline = Pipeline::from_config(&config);
    let summary = pipeline
        .run_once(&sources, &topics, args.top_n)
        .await
        .context("pipeline run failed")?;

    for failure in &summary.failures {
        warn!(source_id = %failure.source_id, reason = %failure.reason, "source failed");
    }
    for (partition, added) in &summary.new_by_partition {
        info!(partition = %partition, added, "partition updated");
    }
    if let Some(path) = &summary.report_path {
        info!(report = %path.display(), "report available");
    }
    info!(fetched = summary.fetched, "newsdesk finished");

    Ok(())
}
