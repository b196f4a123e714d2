//! End-to-end scheduling: inspect, render, validate, submit.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::SchedulerConfig;
use crate::context::ScheduleParameters;
use crate::decision::{load_template, make_decision_task, DecisionTask};
use crate::error::Result;
use crate::git::inspect_repository;
use crate::queue::{schedule_task, QueueClient};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub task_id: String,
    /// Status response returned by the queue
    pub status: Value,
}

/// Everything up to, but not including, submission.
///
/// The repository is inspected before the template is read, so a bad
/// remote fails without touching `.taskcluster.yml`.
pub fn prepare(config: &SchedulerConfig) -> Result<DecisionTask> {
    let reference = inspect_repository(&config.repo_root)?;
    info!(
        repository = %reference.remote_url,
        branch = %reference.branch_name,
        revision = %reference.commit_hash,
        staging = config.is_staging,
        "Preparing nightly decision task"
    );

    let params = ScheduleParameters::new(reference, config.is_staging, config.cron_task_id.clone());
    let template = load_template(&config.template_path)?;
    make_decision_task(&params, &template)
}

/// Prepare the decision task and submit it exactly once.
pub async fn schedule(config: &SchedulerConfig, queue: &dyn QueueClient) -> Result<ScheduledTask> {
    let decision = prepare(config)?;
    let status = schedule_task(queue, &decision.task_id, &decision.task).await?;
    Ok(ScheduledTask {
        task_id: decision.task_id,
        status,
    })
}
