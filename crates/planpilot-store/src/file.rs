use crate::{MarkOutcome, StoreError, TaskStore, validate_description, validate_explicit_id};
use planpilot_core::{TaskMap, TaskRecord, next_task_id, seed_tasks};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const TASKS_FILE: &str = "tasks.json";

/// File-backed task store. Owns `tasks.json` in the workspace root and
/// rewrites it wholesale on every mutation.
///
/// Single-process only: the atomic rename keeps a concurrent reader from
/// seeing a torn file, but two writers pointed at the same workspace
/// will still lose updates to each other.
#[derive(Debug, Clone)]
pub struct FileTaskStore {
    path: PathBuf,
}

impl FileTaskStore {
    pub fn new(workspace: &Path) -> Self {
        Self {
            path: workspace.join(TASKS_FILE),
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

    /// Raw map from disk. `Ok(None)` covers both an absent file and
    /// unparsable content; the caller reseeds either way. Reseeding on a
    /// parse failure discards whatever was in the file, which keeps the
    /// command loop alive at the price of the old task history.
    fn read_map(&self) -> Result<Option<TaskMap>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_err(err)),
        };
        Ok(serde_json::from_str::<TaskMap>(&raw).ok())
    }

    /// Current map without the reseeding side effect: an absent or
    /// corrupt file reads as empty. Mutations build on this so that the
    /// first task created in a fresh workspace really gets id 0.
    fn snapshot(&self) -> Result<TaskMap, StoreError> {
        Ok(self.read_map()?.unwrap_or_default())
    }

    /// Write-temp-then-rename so a crash mid-write never leaves a torn
    /// tasks.json behind.
    fn write_map(&self, tasks: &TaskMap) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(tasks).map_err(|err| self.io_err(io::Error::other(err)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload).map_err(|err| StoreError::Io {
            path: tmp.clone(),
            source: err,
        })?;
        fs::rename(&tmp, &self.path).map_err(|err| self.io_err(err))?;
        Ok(())
    }
}

impl TaskStore for FileTaskStore {
    fn load_tasks(&self) -> Result<TaskMap, StoreError> {
        if let Some(tasks) = self.read_map()? {
            return Ok(tasks);
        }
        let tasks = seed_tasks();
        self.write_map(&tasks)?;
        Ok(tasks)
    }

    fn create_task(
        &self,
        description: &str,
        explicit_id: Option<&str>,
    ) -> Result<String, StoreError> {
        validate_description(description)?;
        let mut tasks = self.snapshot()?;
        let id = match explicit_id {
            Some(id) => {
                validate_explicit_id(id)?;
                if tasks.contains_key(id) {
                    return Err(StoreError::Validation(format!(
                        "task id {id} already exists"
                    )));
                }
                id.to_string()
            }
            None => next_task_id(&tasks),
        };
        tasks.insert(id.clone(), TaskRecord::new(description));
        self.write_map(&tasks)?;
        Ok(id)
    }

    fn mark_completed(&self, id: &str) -> Result<MarkOutcome, StoreError> {
        let mut tasks = self.snapshot()?;
        match tasks.get_mut(id) {
            Some(task) => {
                task.completed = true;
                self.write_map(&tasks)?;
                Ok(MarkOutcome::Completed)
            }
            None => Ok(MarkOutcome::NotFound),
        }
    }

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, StoreError> {
        Ok(self.snapshot()?.get(id).cloned())
    }

    fn current_task(&self) -> Result<Option<(String, TaskRecord)>, StoreError> {
        Ok(self
            .load_tasks()?
            .into_iter()
            .find(|(_, task)| !task.completed))
    }
}
