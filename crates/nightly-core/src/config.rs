//! Run configuration assembled from flags and the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::decision::TEMPLATE_FILE;
use crate::queue::QueueConfig;

/// Environment variable carrying the id of the cron task running us.
pub const CRON_TASK_ID_ENV: &str = "CRON_TASK_ID";

/// Used when `CRON_TASK_ID` is unset, e.g. for local runs.
pub const CRON_TASK_ID_PLACEHOLDER: &str = "<cron_task_id>";

/// `CRON_TASK_ID`, or the placeholder when it is unset.
pub fn cron_task_id_from_env() -> String {
    std::env::var(CRON_TASK_ID_ENV).unwrap_or_else(|_| CRON_TASK_ID_PLACEHOLDER.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Root of the working copy to schedule
    pub repo_root: PathBuf,
    pub template_path: PathBuf,
    pub is_staging: bool,
    pub cron_task_id: String,
    pub queue: QueueConfig,
}

impl SchedulerConfig {
    /// Production config for `repo_root`, with the rest read from the environment.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        SchedulerConfig {
            template_path: repo_root.join(TEMPLATE_FILE),
            repo_root,
            is_staging: false,
            cron_task_id: cron_task_id_from_env(),
            queue: QueueConfig::from_env(),
        }
    }

    pub fn with_staging(mut self, is_staging: bool) -> Self {
        self.is_staging = is_staging;
        self
    }

    pub fn with_cron_task_id(mut self, cron_task_id: &str) -> Self {
        self.cron_task_id = cron_task_id.to_string();
        self
    }

    pub fn with_template_path(mut self, template_path: impl Into<PathBuf>) -> Self {
        self.template_path = template_path.into();
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }
}
