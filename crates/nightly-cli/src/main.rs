//! Nightly scheduler CLI
//!
//! `schedule-nightly` runs inside a Taskcluster cron task. It renders the
//! repository's `.taskcluster.yml` for the `cron` trigger and submits the
//! resulting decision task through the Taskcluster proxy.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nightly_core::{
    discover_repository_root, prepare, schedule, HttpQueueClient, QueueClient, QueueConfig,
    SchedulerConfig, CRON_TASK_ID_ENV, CRON_TASK_ID_PLACEHOLDER,
};
use serde_json::json;
use tracing::Level;

/// Printed once the decision task has been accepted.
const CONFIRMATION: &str = "All scheduled!";

#[derive(Parser, Debug)]
#[command(name = "schedule-nightly")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schedule the nightly decision task for this repository", long_about = None)]
struct Cli {
    /// Perform a staging build (use dep workers, don't communicate with Google Play)
    #[arg(long)]
    staging: bool,

    /// Print the rendered decision task instead of submitting it
    #[arg(long)]
    dry_run: bool,

    /// Any directory inside the checkout to schedule
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Id of the cron task running this scheduler
    #[arg(long, env = CRON_TASK_ID_ENV, default_value = CRON_TASK_ID_PLACEHOLDER)]
    cron_task_id: String,

    /// Taskcluster proxy root
    #[arg(long, env = "TASKCLUSTER_PROXY_URL", default_value = "http://taskcluster")]
    proxy_url: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn scheduler_config(&self) -> Result<SchedulerConfig> {
        let root = discover_repository_root(&self.repo)
            .with_context(|| format!("{} is not inside a git checkout", self.repo.display()))?;
        Ok(SchedulerConfig::new(root)
            .with_staging(self.staging)
            .with_cron_task_id(&self.cron_task_id)
            .with_queue(QueueConfig::new(&self.proxy_url)))
    }
}

/// Schedule (or, with `--dry-run`, only render) and return the stdout text.
async fn run(cli: &Cli, config: &SchedulerConfig, queue: &dyn QueueClient) -> Result<String> {
    if cli.dry_run {
        let decision = prepare(config)?;
        let rendered = json!({"taskId": decision.task_id, "task": decision.task});
        return Ok(serde_json::to_string_pretty(&rendered)?);
    }

    schedule(config, queue).await?;
    Ok(CONFIRMATION.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    nightly_core::init_tracing(cli.json, level);

    let config = cli.scheduler_config()?;
    let queue = HttpQueueClient::new(config.queue.clone())?;

    let output = run(&cli, &config, &queue).await?;
    println!("{output}");
    Ok(())
}
