//! Render `.taskcluster.yml` into the single decision task.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::context::{RenderContext, ScheduleParameters};
use crate::error::{Result, ScheduleError};
use crate::slugid::SlugIdResolver;

/// Template file name at the repository root.
pub const TEMPLATE_FILE: &str = ".taskcluster.yml";

/// A rendered task ready for submission. `task` never carries `taskId`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTask {
    pub task_id: String,
    pub task: Value,
}

/// Read and parse a YAML template.
pub fn load_template(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| ScheduleError::TemplateLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_yaml::from_str(&text).map_err(|e| ScheduleError::TemplateLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Render `template` with a cron context stamped at the current time.
pub fn make_decision_task(params: &ScheduleParameters, template: &Value) -> Result<DecisionTask> {
    make_decision_task_at(params, template, Utc::now())
}

/// Render `template` with a cron context stamped at `now`.
///
/// Each call gets its own slugid resolver, so identifiers never leak
/// between renders.
pub fn make_decision_task_at(
    params: &ScheduleParameters,
    template: &Value,
    now: DateTime<Utc>,
) -> Result<DecisionTask> {
    let context = RenderContext::build(params, now);
    let slugs = SlugIdResolver::new();
    let rendered = {
        let scope = context.scope(&slugs)?;
        nightly_jsone::render(template, &scope)?
    };
    debug!(slugids = ?slugs.issued(), "Rendered template");
    extract_single_task(rendered)
}

/// Pull the one task out of a rendered template and split off its `taskId`.
pub fn extract_single_task(rendered: Value) -> Result<DecisionTask> {
    let mut tasks = match rendered {
        Value::Object(mut map) => match map.remove("tasks") {
            Some(Value::Array(tasks)) => tasks,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    if tasks.len() != 1 {
        return Err(ScheduleError::Shape(format!(
            "expected exactly one task, got {}",
            tasks.len()
        )));
    }

    let mut task = match tasks.remove(0) {
        Value::Object(task) => task,
        other => {
            return Err(ScheduleError::Shape(format!(
                "expected task to be an object, got {}",
                nightly_jsone::value::type_name(&other)
            )))
        }
    };

    let task_id = match task.remove("taskId") {
        Some(Value::String(id)) => id,
        Some(other) => {
            return Err(ScheduleError::Shape(format!(
                "expected taskId to be a string, got {}",
                nightly_jsone::value::type_name(&other)
            )))
        }
        None => {
            return Err(ScheduleError::Shape(
                "rendered task has no taskId".to_string(),
            ))
        }
    };

    Ok(DecisionTask {
        task_id,
        task: Value::Object(task),
    })
}
