//! In-memory queue fake (testing only)
//!
//! `MemoryQueue` records every `create_task` call instead of talking to
//! Taskcluster, and can be armed to reject submissions.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, ScheduleError};
use crate::queue::QueueClient;

/// One recorded `create_task` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub task_id: String,
    pub task: Value,
}

#[derive(Debug, Default)]
pub struct MemoryQueue {
    submissions: Mutex<Vec<Submission>>,
    failure: Option<String>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that rejects every task with `message`.
    pub fn failing(message: &str) -> Self {
        MemoryQueue {
            submissions: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    /// Calls received so far, in order. Rejected calls are included.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    async fn create_task(&self, task_id: &str, task: &Value) -> Result<Value> {
        self.submissions.lock().unwrap().push(Submission {
            task_id: task_id.to_string(),
            task: task.clone(),
        });

        if let Some(message) = &self.failure {
            return Err(ScheduleError::Submission(message.clone()));
        }

        Ok(json!({
            "status": {
                "taskId": task_id,
                "state": "pending",
                "runs": []
            }
        }))
    }
}
