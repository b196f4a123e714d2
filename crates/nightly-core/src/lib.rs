//! Nightly-Core: schedule a repository's nightly decision task
//!
//! A run inspects the local git checkout, renders `.taskcluster.yml` with a
//! cron context, checks that exactly one task came out, and submits it to
//! the Taskcluster queue.
//!
//! ```no_run
//! use nightly_core::{schedule, HttpQueueClient, SchedulerConfig};
//!
//! # async fn run() -> nightly_core::Result<()> {
//! let config = SchedulerConfig::new(".").with_staging(true);
//! let queue = HttpQueueClient::new(config.queue.clone())?;
//! let scheduled = schedule(&config, &queue).await?;
//! println!("{}", scheduled.task_id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod fakes;
pub mod git;
pub mod queue;
pub mod schedule;
pub mod slugid;
pub mod telemetry;

pub use config::{SchedulerConfig, CRON_TASK_ID_ENV, CRON_TASK_ID_PLACEHOLDER};
pub use context::{RenderContext, ScheduleParameters, StagingToggles};
pub use decision::{load_template, make_decision_task, DecisionTask, TEMPLATE_FILE};
pub use error::{Result, ScheduleError};
pub use git::{discover_repository_root, inspect_repository, RepositoryReference};
pub use queue::{schedule_task, HttpQueueClient, QueueClient, QueueConfig};
pub use schedule::{prepare, schedule, ScheduledTask};
pub use slugid::SlugIdResolver;
pub use telemetry::init_tracing;
