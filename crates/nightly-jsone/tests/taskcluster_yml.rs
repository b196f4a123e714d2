//! Render a realistic `.taskcluster.yml` through the engine.

use std::cell::RefCell;
use std::collections::HashMap;

use nightly_jsone::{render, Context, RenderError, Result};
use serde_json::{json, Value};

const TASKCLUSTER_YML: &str = r#"
version: 1
policy:
  pullRequests: public
tasks:
  $let:
    decision_task_id: {$eval: 'as_slugid("decision_task")'}
    expires_in: {$fromNow: '1 year'}
    short_rev: ${event.release.tag_name[:7]}
  in:
    $flattenDeep:
      - $if: 'tasks_for in ["github-pull-request", "github-push"]'
        then:
          taskId: ${as_slugid("push_decision")}
          metadata:
            name: "push decision"
      - $if: 'tasks_for == "cron"'
        then:
          taskId: ${decision_task_id}
          taskGroupId: ${decision_task_id}
          schedulerId: "mobile-level-3"
          created: {$fromNow: ''}
          deadline: {$fromNow: '1 day'}
          expires: ${expires_in}
          provisionerId: "mobile-3-decision${scriptworker_environment}"
          routes:
            - "index.project.mobile.fenix.v2.${route_environment}.latest"
            - "index.project.mobile.fenix.v2.${route_environment}.revision.${event.release.tag_name}"
          scopes:
            - "assume:hook-id:project-mobile/fenix-${route_environment}"
          payload:
            command:
              - /bin/bash
              - -c
              - >-
                python automation/taskcluster/decision_task_nightly.py
                ${command_staging_flag}
                --signing ${signing_environment}
            env:
              MOBILE_HEAD_REV: ${event.release.tag_name}
              MOBILE_HEAD_BRANCH: ${event.release.target_commitish}
              MOBILE_HEAD_REPOSITORY: ${event.repository.clone_url}
              PUSHAPK: "scriptworker-prov-v1/mobile-pushapk${pushapk_environment}"
              CRON_TASK_ID: ${cron.task_id}
          extra:
            cron: {$json: {task_id: "${cron.task_id}"}}
          metadata:
            name: "Nightly decision ${short_rev}"
            owner: ${event.sender.login}@users.noreply.github.com
            source: ${event.repository.clone_url}/raw/${event.release.tag_name}/.taskcluster.yml
"#;

struct Slugs {
    issued: RefCell<HashMap<String, String>>,
}

impl Slugs {
    fn new() -> Self {
        Slugs {
            issued: RefCell::new(HashMap::new()),
        }
    }

    fn resolve(&self, args: &[Value]) -> Result<Value> {
        let name = args[0].as_str().unwrap_or_default().to_string();
        let mut issued = self.issued.borrow_mut();
        let next = format!("slug-{}", issued.len());
        Ok(json!(issued.entry(name).or_insert(next).clone()))
    }
}

fn cron_context(staging: bool) -> Value {
    json!({
        "tasks_for": "cron",
        "cron": {"task_id": "cron-123"},
        "now": "2024-01-01T00:00:00.000Z",
        "command_staging_flag": if staging { "--staging" } else { "" },
        "route_environment": if staging { "staging-nightly" } else { "nightly" },
        "signing_environment": if staging { "dep-signing" } else { "release-signing" },
        "pushapk_environment": if staging { ":dep" } else { "" },
        "scriptworker_environment": if staging { "-dep" } else { "" },
        "event": {
            "repository": {"clone_url": "https://github.com/mozilla-mobile/fenix"},
            "release": {"tag_name": "0123456789abcdef", "target_commitish": "main"},
            "sender": {"login": "TaskclusterHook"}
        }
    })
}

fn render_yml(context: Value) -> Result<Value> {
    let template: Value = serde_yaml::from_str(TASKCLUSTER_YML).unwrap();
    let slugs = Slugs::new();
    let resolve = |args: &[Value]| slugs.resolve(args);
    let ctx = Context::from_value(context)?.with_helper("as_slugid", &resolve);
    render(&template, &ctx)
}

#[test]
fn test_cron_context_produces_single_decision_task() {
    let rendered = render_yml(cron_context(false)).unwrap();
    let tasks = rendered["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);

    let task = &tasks[0];
    assert_eq!(task["taskId"], json!("slug-0"));
    assert_eq!(task["taskGroupId"], task["taskId"]);
    assert_eq!(task["created"], json!("2024-01-01T00:00:00.000Z"));
    assert_eq!(task["deadline"], json!("2024-01-02T00:00:00.000Z"));
    assert_eq!(task["expires"], json!("2024-12-31T00:00:00.000Z"));
    assert_eq!(task["provisionerId"], json!("mobile-3-decision"));
    assert_eq!(
        task["routes"][1],
        json!("index.project.mobile.fenix.v2.nightly.revision.0123456789abcdef")
    );
    assert_eq!(task["payload"]["env"]["CRON_TASK_ID"], json!("cron-123"));
    assert_eq!(task["extra"]["cron"], json!("{\"task_id\":\"cron-123\"}"));
    assert_eq!(task["metadata"]["name"], json!("Nightly decision 0123456"));
    assert_eq!(
        task["metadata"]["owner"],
        json!("TaskclusterHook@users.noreply.github.com")
    );
}

#[test]
fn test_staging_toggles_flow_into_task() {
    let rendered = render_yml(cron_context(true)).unwrap();
    let task = &rendered["tasks"][0];

    assert_eq!(task["provisionerId"], json!("mobile-3-decision-dep"));
    assert_eq!(
        task["payload"]["env"]["PUSHAPK"],
        json!("scriptworker-prov-v1/mobile-pushapk:dep")
    );
    let command = task["payload"]["command"][2].as_str().unwrap();
    assert!(command.contains("--staging"));
    assert!(command.contains("--signing dep-signing"));
}

#[test]
fn test_push_context_takes_other_branch() {
    let mut context = cron_context(false);
    context["tasks_for"] = json!("github-push");
    let rendered = render_yml(context).unwrap();
    let tasks = rendered["tasks"].as_array().unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["metadata"]["name"], json!("push decision"));
    // the $let binding is still evaluated, so the push task gets the next slug
    assert_eq!(tasks[0]["taskId"], json!("slug-1"));
}

#[test]
fn test_missing_context_value_is_interpreter_error() {
    let mut context = cron_context(false);
    context.as_object_mut().unwrap().remove("route_environment");
    let err = render_yml(context).unwrap_err();
    assert!(matches!(err, RenderError::Interpreter(_)));
    assert!(err.to_string().contains("route_environment"));
}
