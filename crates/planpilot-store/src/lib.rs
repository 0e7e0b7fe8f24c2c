//! Durable task and plan storage.
//!
//! Two task-store backends share one capability trait: a JSON file for
//! the common single-workspace case and a sqlite database for hosts that
//! already carry one. The plan document is file-only; both backends feed
//! it the same task map.

mod file;
mod plan;
mod sqlite;

pub use file::{FileTaskStore, TASKS_FILE};
pub use plan::{PLAN_FILE, PlanDocument, render_default_plan};
pub use sqlite::SqliteTaskStore;

use planpilot_core::{StoreBackend, TaskMap, TaskRecord};
use std::path::{Path, PathBuf};

/// Errors from the task store backends and the plan document.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Bad caller input: empty description, duplicate or malformed id.
    #[error("invalid task input: {0}")]
    Validation(String),
    /// The backing file could not be read or written for a reason other
    /// than being absent.
    #[error("storage unavailable at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage unavailable: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result of a mark-completed call. Not-found is a signal value rather
/// than an error so the host agent can fold its own mistakes back into
/// its reasoning instead of aborting the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Completed,
    NotFound,
}

/// Capability set shared by the file and sqlite backends.
pub trait TaskStore {
    /// All tasks. A missing or unreadable map is replaced by the seed set
    /// and persisted before returning.
    fn load_tasks(&self) -> Result<TaskMap, StoreError>;

    /// Insert a task, assigning the next integer id when none is given.
    /// Returns the id actually used. Operates on the store as-is (an
    /// absent map counts as empty); only `load_tasks` seeds.
    fn create_task(
        &self,
        description: &str,
        explicit_id: Option<&str>,
    ) -> Result<String, StoreError>;

    /// One-way completion flip. Marking an already-completed task is a
    /// no-op success; an unknown id leaves the store untouched.
    fn mark_completed(&self, id: &str) -> Result<MarkOutcome, StoreError>;

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, StoreError>;

    /// First incomplete task in map order, if any.
    fn current_task(&self) -> Result<Option<(String, TaskRecord)>, StoreError>;
}

/// Construct the backend selected by configuration.
pub fn open_store(
    workspace: &Path,
    backend: StoreBackend,
) -> Result<Box<dyn TaskStore>, StoreError> {
    match backend {
        StoreBackend::File => Ok(Box::new(FileTaskStore::new(workspace))),
        StoreBackend::Sqlite => Ok(Box::new(SqliteTaskStore::open(workspace)?)),
    }
}

pub(crate) fn validate_description(description: &str) -> Result<(), StoreError> {
    if description.trim().is_empty() {
        return Err(StoreError::Validation(
            "task description must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_explicit_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err(StoreError::Validation(format!(
            "task id '{id}' is malformed; use a bare integer or a short token without whitespace"
        )));
    }
    Ok(())
}
