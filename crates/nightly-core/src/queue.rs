//! Taskcluster queue client
//!
//! Submits tasks through the Taskcluster proxy, which attaches the
//! credentials of the task the scheduler itself is running in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, ScheduleError};

/// Environment variable naming the Taskcluster proxy.
pub const PROXY_URL_ENV: &str = "TASKCLUSTER_PROXY_URL";

/// Proxy address inside a Taskcluster worker.
pub const DEFAULT_PROXY_URL: &str = "http://taskcluster";

/// Queue API prefix below the proxy root.
pub const QUEUE_API_PATH: &str = "queue/v1";

/// Queue client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Proxy root URL
    pub proxy_url: String,
    pub user_agent: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            proxy_url: std::env::var(PROXY_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_PROXY_URL.to_string()),
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("nightly-scheduler/{}", env!("CARGO_PKG_VERSION"))
}

impl QueueConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Config for a specific proxy root
    pub fn new(proxy_url: &str) -> Self {
        QueueConfig {
            proxy_url: proxy_url.to_string(),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Base URL of the queue API.
    pub fn queue_url(&self) -> String {
        format!("{}/{}", self.proxy_url.trim_end_matches('/'), QUEUE_API_PATH)
    }

    /// `createTask` endpoint for `task_id`.
    pub fn task_url(&self, task_id: &str) -> String {
        format!("{}/task/{}", self.queue_url(), task_id)
    }
}

/// The one queue operation the scheduler needs.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Create `task` under `task_id`, returning the queue's status response.
    async fn create_task(&self, task_id: &str, task: &Value) -> Result<Value>;
}

/// HTTP implementation of [`QueueClient`]
pub struct HttpQueueClient {
    config: QueueConfig,
    http_client: reqwest::Client,
}

impl HttpQueueClient {
    pub fn new(config: QueueConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(HttpQueueClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

#[async_trait]
impl QueueClient for HttpQueueClient {
    async fn create_task(&self, task_id: &str, task: &Value) -> Result<Value> {
        let url = self.config.task_url(task_id);
        debug!("PUT {}", url);

        let response = self.http_client.put(&url).json(task).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScheduleError::Submission(format!(
                "queue returned {} for task {}: {}",
                status, task_id, body
            )));
        }

        Ok(response.json().await?)
    }
}

/// Submit `task` under `task_id` and log what was sent and received.
pub async fn schedule_task(queue: &dyn QueueClient, task_id: &str, task: &Value) -> Result<Value> {
    info!(task_id, "Scheduling decision task");
    info!("{}", serde_json::to_string_pretty(task)?);

    let status = queue.create_task(task_id, task).await?;

    info!(task_id, "Task created");
    debug!("{}", serde_json::to_string_pretty(&status)?);
    Ok(status)
}
