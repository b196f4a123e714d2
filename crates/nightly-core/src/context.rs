//! The cron render context handed to `.taskcluster.yml`.
//!
//! The template is written against GitHub-release-shaped event fields; a
//! nightly run fills them from the inspected repository.

use chrono::{DateTime, Utc};
use nightly_jsone::{format_timestamp, Context};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::git::RepositoryReference;
use crate::slugid::SlugIdResolver;

/// Value of `tasks_for` for scheduled runs.
pub const CRON_TRIGGER: &str = "cron";

/// Login reported as the event sender.
pub const HOOK_SENDER_LOGIN: &str = "TaskclusterHook";

/// Name under which the slugid helper is exposed to the template.
pub const AS_SLUGID: &str = "as_slugid";

/// Everything one scheduling run needs to build a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParameters {
    pub is_staging: bool,
    pub repository_github_http_url: String,
    pub head_rev: String,
    pub branch: String,
    pub cron_task_id: String,
}

impl ScheduleParameters {
    pub fn new(reference: RepositoryReference, is_staging: bool, cron_task_id: String) -> Self {
        Self {
            is_staging,
            repository_github_http_url: reference.remote_url,
            head_rev: reference.commit_hash,
            branch: reference.branch_name,
            cron_task_id,
        }
    }
}

/// Staging toggles, each a pure function of `is_staging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StagingToggles {
    pub command_staging_flag: &'static str,
    pub route_environment: &'static str,
    pub signing_environment: &'static str,
    pub pushapk_environment: &'static str,
    pub scriptworker_environment: &'static str,
}

impl StagingToggles {
    pub const STAGING: StagingToggles = StagingToggles {
        command_staging_flag: "--staging",
        route_environment: "staging-nightly",
        signing_environment: "dep-signing",
        pushapk_environment: ":dep",
        scriptworker_environment: "-dep",
    };

    pub const PRODUCTION: StagingToggles = StagingToggles {
        command_staging_flag: "",
        route_environment: "nightly",
        signing_environment: "release-signing",
        pushapk_environment: "",
        scriptworker_environment: "",
    };

    pub fn for_staging(is_staging: bool) -> Self {
        if is_staging {
            Self::STAGING
        } else {
            Self::PRODUCTION
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CronInfo {
    pub task_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRepository {
    pub clone_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRelease {
    /// Commit hash stands in for a tag name on nightlies
    pub tag_name: String,
    pub target_commitish: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSender {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseEvent {
    pub repository: EventRepository,
    pub release: EventRelease,
    pub sender: EventSender,
}

/// Data half of the render context. The `as_slugid` helper is attached by
/// [`RenderContext::scope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderContext {
    pub tasks_for: &'static str,
    pub cron: CronInfo,
    /// Render start time, millisecond precision, `Z`-suffixed
    pub now: String,
    #[serde(flatten)]
    pub toggles: StagingToggles,
    pub event: ReleaseEvent,
}

impl RenderContext {
    pub fn build(params: &ScheduleParameters, now: DateTime<Utc>) -> Self {
        Self {
            tasks_for: CRON_TRIGGER,
            cron: CronInfo {
                task_id: params.cron_task_id.clone(),
            },
            now: format_timestamp(now),
            toggles: StagingToggles::for_staging(params.is_staging),
            event: ReleaseEvent {
                repository: EventRepository {
                    clone_url: params.repository_github_http_url.clone(),
                },
                release: EventRelease {
                    tag_name: params.head_rev.clone(),
                    target_commitish: params.branch.clone(),
                },
                sender: EventSender {
                    login: HOOK_SENDER_LOGIN.to_string(),
                },
            },
        }
    }

    /// Engine scope with this data and `as_slugid` bound to `slugs`.
    pub fn scope<'a>(&self, slugs: &'a SlugIdResolver) -> Result<Context<'a>> {
        let value = serde_json::to_value(self)?;
        let context = Context::from_value(value)?.with_helper(AS_SLUGID, slugs);
        Ok(context)
    }
}
