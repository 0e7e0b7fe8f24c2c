use crate::{StoreError, TaskStore};
use planpilot_core::TaskMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const PLAN_FILE: &str = "plan.md";

const PLAN_HEADER: &str = "# Task List and status:";
const PLAN_NOTES: &str =
    "## Notes:\n- Use the run_planning_cycle command frequently to keep this plan up to date.";

/// Render the default checklist plan for the given task map: one line
/// per task, `[x]` iff completed, in map order, with the notes footer.
pub fn render_default_plan(tasks: &TaskMap) -> String {
    let mut plan = String::from(PLAN_HEADER);
    plan.push('\n');
    for (id, task) in tasks {
        let check = if task.completed { 'x' } else { ' ' };
        plan.push_str(&format!("- [{check}] {id}: {}\n", task.description));
    }
    plan.push('\n');
    plan.push_str(PLAN_NOTES);
    plan.push('\n');
    plan
}

/// Owner of `plan.md`: synthesized lazily from the task map, replaced
/// wholesale by each planning cycle.
#[derive(Debug, Clone)]
pub struct PlanDocument {
    path: PathBuf,
}

impl PlanDocument {
    pub fn new(workspace: &Path) -> Self {
        Self {
            path: workspace.join(PLAN_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Current plan text, creating the default from the task map when the
    /// file is absent or empty.
    pub fn get_plan(&self, store: &dyn TaskStore) -> Result<String, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(self.io_err(err)),
        }
        let plan = render_default_plan(&store.load_tasks()?);
        self.write_plan(&plan)?;
        Ok(plan)
    }

    /// Replace the plan wholesale, atomically. Callers that revise the
    /// plan must only get here with a usable replacement; a failed
    /// revision never reaches this method, so the old bytes survive it.
    pub fn write_plan(&self, text: &str) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("md.tmp");
        fs::write(&tmp, text).map_err(|err| StoreError::Io {
            path: tmp.clone(),
            source: err,
        })?;
        fs::rename(&tmp, &self.path).map_err(|err| self.io_err(err))?;
        Ok(())
    }
}
