//! End-to-end coverage of the five planning commands through the
//! registry, against a real workspace directory and a scripted refiner.

use planpilot_commands::{CommandRegistry, CommandReply, Planner, install_planner_commands};
use planpilot_core::{PlannerConfig, TaskMap, TokenUsage};
use planpilot_llm::{GenerationError, PlanRefiner, Refinement};
use serde_json::{Value, json};
use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Refiner double: replies with a fixed revision, or fails every call.
struct ScriptedRefiner {
    revision: Option<&'static str>,
    calls: Cell<u32>,
}

impl ScriptedRefiner {
    fn replying(revision: &'static str) -> Self {
        Self {
            revision: Some(revision),
            calls: Cell::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            revision: None,
            calls: Cell::new(0),
        }
    }
}

impl PlanRefiner for ScriptedRefiner {
    fn refine(&self, _plan: &str, _tasks: &TaskMap) -> Result<Refinement, GenerationError> {
        self.calls.set(self.calls.get() + 1);
        match self.revision {
            Some(text) => Ok(Refinement {
                text: text.to_string(),
                usage: TokenUsage {
                    prompt_tokens: 100,
                    completion_tokens: 50,
                },
            }),
            None => Err(GenerationError::EmptyCompletion),
        }
    }
}

fn planner_with(workspace: &Path, refiner: ScriptedRefiner) -> Rc<Planner> {
    let cfg = PlannerConfig::default();
    Rc::new(Planner::new(workspace, &cfg, Box::new(refiner)).unwrap())
}

fn registry_for(planner: &Rc<Planner>) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    install_planner_commands(&mut registry, planner.clone());
    registry
}

#[test]
fn check_plan_creates_the_default_from_the_seed() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let reply = registry.dispatch("check_plan", &Value::Null);
    let CommandReply::Text(text) = reply else {
        panic!("check_plan must return text, got {reply:?}");
    };
    assert!(text.starts_with("# Task List and status:"));
    assert!(text.contains("- [ ] 0: Create a detailed checklist for the current plan and goals"));
    assert!(text.contains("- [ ] 1: Review that every new task is completed"));
    assert!(text.contains("## Notes:"));
    // persisted, and returned verbatim on the next call
    assert_eq!(fs::read_to_string(tmp.path().join("plan.md")).unwrap(), text);
    assert_eq!(
        registry.dispatch("check_plan", &Value::Null),
        CommandReply::Text(text)
    );
}

#[test]
fn create_task_on_an_empty_workspace_yields_id_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let reply = registry.dispatch("create_task", &json!({"task_description": "Ship release"}));
    let CommandReply::Json(tasks) = reply else {
        panic!("create_task must return the task map");
    };
    assert_eq!(tasks, json!({"0": ["Ship release", false]}));
}

#[test]
fn create_task_accepts_an_explicit_integer_id() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let reply = registry.dispatch(
        "create_task",
        &json!({"task_description": "pinned", "task_id": 7}),
    );
    let CommandReply::Json(tasks) = reply else {
        panic!("create_task must return the task map");
    };
    assert_eq!(tasks["7"], json!(["pinned", false]));

    // the same id again is a validation error, surfaced as a reply value
    let dup = registry.dispatch(
        "create_task",
        &json!({"task_description": "again", "task_id": 7}),
    );
    assert!(dup.is_error());
    assert!(dup.render().contains("already exists"));
}

#[test]
fn create_task_rejects_an_empty_description_through_dispatch() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let reply = registry.dispatch("create_task", &json!({"task_description": "  "}));
    assert!(reply.is_error());
    assert!(reply.render().contains("must not be empty"));
}

#[test]
fn load_tasks_seeds_an_empty_workspace() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let CommandReply::Json(tasks) = registry.dispatch("load_tasks", &Value::Null) else {
        panic!("load_tasks must return the task map");
    };
    assert_eq!(
        tasks,
        json!({
            "0": ["Create a detailed checklist for the current plan and goals", false],
            "1": ["Review that every new task is completed", false]
        })
    );
}

#[test]
fn load_tasks_recovers_from_corrupt_json() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("tasks.json"), "{not json").unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let CommandReply::Json(tasks) = registry.dispatch("load_tasks", &Value::Null) else {
        panic!("load_tasks must not fail on corrupt content");
    };
    assert_eq!(tasks.as_object().unwrap().len(), 2);
    // the corrupt file was overwritten with the seed
    let on_disk: Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("tasks.json")).unwrap()).unwrap();
    assert_eq!(on_disk, tasks);
}

#[test]
fn mark_task_completed_returns_the_confirmation_string() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("tasks.json"), r#"{"0": ["Write tests", false]}"#).unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let reply = registry.dispatch("mark_task_completed", &json!({"task_id": 0}));
    assert_eq!(
        reply,
        CommandReply::Text("Task with ID 0 has been marked as completed.".to_string())
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("tasks.json")).unwrap(),
        r#"{"0":["Write tests",true]}"#
    );
}

#[test]
fn mark_task_completed_signals_not_found_without_mutating() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("tasks.json"), r#"{"0": ["Write tests", false]}"#).unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let before = fs::read(tmp.path().join("tasks.json")).unwrap();
    let reply = registry.dispatch("mark_task_completed", &json!({"task_id": "5"}));
    assert_eq!(
        reply,
        CommandReply::Text("Task with ID 5 not found.".to_string())
    );
    assert_eq!(fs::read(tmp.path().join("tasks.json")).unwrap(), before);
}

#[test]
fn run_planning_cycle_replaces_the_plan_wholesale() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("# Revised plan\n- [ ] 0: x\n"));
    let registry = registry_for(&planner);

    let reply = registry.dispatch("run_planning_cycle", &Value::Null);
    assert_eq!(
        reply,
        CommandReply::Text("# Revised plan\n- [ ] 0: x\n".to_string())
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("plan.md")).unwrap(),
        "# Revised plan\n- [ ] 0: x\n"
    );
    // the cycle's token spend is accounted against the planner
    let totals = planner.usage_totals();
    assert_eq!(totals.calls, 1);
    assert_eq!(totals.prompt_tokens, 100);
    assert_eq!(totals.completion_tokens, 50);
}

#[test]
fn failed_refinement_leaves_the_plan_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::failing());
    let registry = registry_for(&planner);

    // materialize the default plan first
    registry.dispatch("check_plan", &Value::Null);
    let before = fs::read(tmp.path().join("plan.md")).unwrap();

    let reply = registry.dispatch("run_planning_cycle", &Value::Null);
    assert!(reply.is_error());
    assert_eq!(fs::read(tmp.path().join("plan.md")).unwrap(), before);
    assert_eq!(planner.usage_totals().calls, 0);
}

#[test]
fn unknown_commands_and_bad_arguments_never_panic() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    assert!(registry.dispatch("optimize_schedule", &Value::Null).is_error());
    assert!(
        registry
            .dispatch("mark_task_completed", &json!({}))
            .is_error()
    );
    assert!(
        registry
            .dispatch("create_task", &json!({"task_description": 1}))
            .is_error()
    );
    assert!(
        registry
            .dispatch("load_tasks", &json!({"extra": true}))
            .is_error()
    );
    assert!(registry.dispatch("check_plan", &json!("a string")).is_error());
}

#[test]
fn the_five_commands_are_announced_to_the_host() {
    let tmp = tempfile::tempdir().unwrap();
    let planner = planner_with(tmp.path(), ScriptedRefiner::replying("unused"));
    let registry = registry_for(&planner);

    let names: Vec<&str> = registry.specs().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "check_plan",
            "create_task",
            "load_tasks",
            "mark_task_completed",
            "run_planning_cycle"
        ]
    );
    for spec in registry.specs() {
        assert_eq!(spec.parameters["type"], "object");
        assert!(!spec.description.is_empty());
    }
}
