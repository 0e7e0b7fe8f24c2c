use crate::observe::Observer;
use crate::registry::{CommandRegistry, CommandReply};
use planpilot_core::{PlannerConfig, TaskMap, UsageTotals};
use planpilot_llm::{ChatRefiner, GenerationError, PlanRefiner};
use planpilot_store::{MarkOutcome, PlanDocument, StoreError, TaskStore, open_store};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Umbrella error for the planning operations a command can trigger.
#[derive(thiserror::Error, Debug)]
pub enum PlannerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Planner facade: binds a task store, the plan document, and a refiner,
/// and backs the five planning commands the host exposes to its model.
pub struct Planner {
    store: Box<dyn TaskStore>,
    plan: PlanDocument,
    refiner: Box<dyn PlanRefiner>,
    model: String,
    usage: RefCell<UsageTotals>,
    observer: Observer,
}

impl Planner {
    pub fn new(
        workspace: &Path,
        cfg: &PlannerConfig,
        refiner: Box<dyn PlanRefiner>,
    ) -> Result<Self, PlannerError> {
        Ok(Self {
            store: open_store(workspace, cfg.backend)?,
            plan: PlanDocument::new(workspace),
            refiner,
            model: cfg.refiner.model.clone(),
            usage: RefCell::new(UsageTotals::default()),
            observer: Observer::new(workspace, cfg.verbose),
        })
    }

    /// Production wiring: the configured chat endpoint as the refiner.
    pub fn from_config(workspace: &Path, cfg: &PlannerConfig) -> Result<Self, PlannerError> {
        let refiner = ChatRefiner::from_config(cfg.refiner.clone())?;
        Self::new(workspace, cfg, Box::new(refiner))
    }

    /// Plan text, creating the default from the task map if absent.
    pub fn check_plan(&self) -> Result<String, PlannerError> {
        Ok(self.plan.get_plan(self.store.as_ref())?)
    }

    /// One planning cycle: hand the current plan and a task snapshot to
    /// the refiner and replace plan.md with the revision. A refiner
    /// failure propagates and leaves the previous plan bytes untouched.
    pub fn run_planning_cycle(&self) -> Result<String, PlannerError> {
        let current = self.plan.get_plan(self.store.as_ref())?;
        let tasks = self.store.load_tasks()?;
        let refinement = self.refiner.refine(&current, &tasks)?;
        self.plan.write_plan(&refinement.text)?;
        self.usage.borrow_mut().record(refinement.usage);
        let totals = *self.usage.borrow();
        self.observer.verbose_log(&format!(
            "planning cycle used {} prompt + {} completion tokens (~${:.4} across {} calls)",
            refinement.usage.prompt_tokens,
            refinement.usage.completion_tokens,
            totals.estimated_cost(&self.model),
            totals.calls
        ));
        Ok(refinement.text)
    }

    /// Create a task and return the updated map, mirroring what the host
    /// shows the model after the call.
    pub fn create_task(
        &self,
        description: &str,
        explicit_id: Option<&str>,
    ) -> Result<TaskMap, PlannerError> {
        self.store.create_task(description, explicit_id)?;
        Ok(self.store.load_tasks()?)
    }

    pub fn load_tasks(&self) -> Result<TaskMap, PlannerError> {
        Ok(self.store.load_tasks()?)
    }

    /// Confirmation string for the host either way; an unknown id is a
    /// signal, not a failure.
    pub fn mark_task_completed(&self, id: &str) -> Result<String, PlannerError> {
        match self.store.mark_completed(id)? {
            MarkOutcome::Completed => {
                Ok(format!("Task with ID {id} has been marked as completed."))
            }
            MarkOutcome::NotFound => Ok(format!("Task with ID {id} not found.")),
        }
    }

    /// Token spend accumulated across planning cycles.
    pub fn usage_totals(&self) -> UsageTotals {
        *self.usage.borrow()
    }
}

/// Register the planner's command set. Called once at startup; the host
/// then routes each invocation through `CommandRegistry::dispatch`.
pub fn install_planner_commands(registry: &mut CommandRegistry, planner: Rc<Planner>) {
    let no_args = || json!({"type": "object", "properties": {}, "required": []});

    let p = planner.clone();
    registry.register(
        "check_plan",
        "Read the plan.md with the next goals to achieve",
        no_args(),
        Box::new(move |_| log_reply(&p, "check_plan", text_reply(p.check_plan()))),
    );

    let p = planner.clone();
    registry.register(
        "run_planning_cycle",
        "Improves the current plan.md and updates it with progress",
        no_args(),
        Box::new(move |_| {
            log_reply(&p, "run_planning_cycle", text_reply(p.run_planning_cycle()))
        }),
    );

    let p = planner.clone();
    registry.register(
        "create_task",
        "creates a task with a task id, description and a completed status of False",
        json!({
            "type": "object",
            "properties": {
                "task_description": {
                    "type": "string",
                    "description": "The task that must be performed"
                },
                "task_id": {
                    "type": ["integer", "string"],
                    "description": "Optional explicit id; the next free integer is used when omitted"
                }
            },
            "required": ["task_description"]
        }),
        Box::new(move |args| {
            let description = args
                .get("task_description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let explicit = args.get("task_id").and_then(task_id_value);
            log_reply(
                &p,
                "create_task",
                map_reply(p.create_task(description, explicit.as_deref())),
            )
        }),
    );

    let p = planner.clone();
    registry.register(
        "load_tasks",
        "Checks out the task ids, their descriptions and a completed status",
        no_args(),
        Box::new(move |_| log_reply(&p, "load_tasks", map_reply(p.load_tasks()))),
    );

    let p = planner.clone();
    registry.register(
        "mark_task_completed",
        "Updates the status of a task and marks it as completed",
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": ["integer", "string"],
                    "description": "Id of the task to mark as completed"
                }
            },
            "required": ["task_id"]
        }),
        Box::new(move |args| {
            let Some(id) = args.get("task_id").and_then(task_id_value) else {
                return CommandReply::Error("task_id must be an integer or string".to_string());
            };
            log_reply(
                &p,
                "mark_task_completed",
                text_reply(p.mark_task_completed(&id)),
            )
        }),
    );
}

/// Accept the id as either a JSON integer or a string, canonicalized to
/// the string key the store uses.
fn task_id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn text_reply(result: Result<String, PlannerError>) -> CommandReply {
    match result {
        Ok(text) => CommandReply::Text(text),
        Err(err) => CommandReply::Error(err.to_string()),
    }
}

fn map_reply(result: Result<TaskMap, PlannerError>) -> CommandReply {
    match result {
        Ok(tasks) => match serde_json::to_value(&tasks) {
            Ok(value) => CommandReply::Json(value),
            Err(err) => CommandReply::Error(err.to_string()),
        },
        Err(err) => CommandReply::Error(err.to_string()),
    }
}

fn log_reply(planner: &Rc<Planner>, name: &str, reply: CommandReply) -> CommandReply {
    if reply.is_error() {
        planner
            .observer
            .warn_log(&format!("command {name} failed: {}", reply.render()));
    } else {
        planner.observer.record(&format!("command {name} ok"));
    }
    reply
}
