use crate::{MarkOutcome, StoreError, TaskStore, validate_description, validate_explicit_id};
use planpilot_core::{TaskMap, TaskRecord, next_task_id, seed_tasks};
use rusqlite::{Connection, params};
use std::path::Path;

const DB_FILE: &str = "planpilot.db";

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        description TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0
     );",
)];

/// Sqlite-backed task store. Same observable contract as the file
/// variant, including the seed rows on a fresh database.
pub struct SqliteTaskStore {
    conn: Connection,
}

impl SqliteTaskStore {
    pub fn open(workspace: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(workspace.join(DB_FILE))?)
    }

    /// In-memory store, mostly for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        for (target, sql) in MIGRATIONS {
            if *target > version {
                self.conn.execute_batch(sql)?;
                self.conn.pragma_update(None, "user_version", *target)?;
            }
        }
        Ok(())
    }

    /// Row snapshot without the reseeding side effect; mutations build on
    /// this so the first task in a fresh database really gets id 0.
    fn snapshot(&self) -> Result<TaskMap, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, description, completed FROM tasks")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                TaskRecord {
                    description: row.get(1)?,
                    completed: row.get(2)?,
                },
            ))
        })?;
        let mut tasks = TaskMap::new();
        for row in rows {
            let (id, task) = row?;
            tasks.insert(id, task);
        }
        Ok(tasks)
    }

    fn insert(&self, id: &str, task: &TaskRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO tasks (id, description, completed) VALUES (?1, ?2, ?3)",
            params![id, task.description, task.completed],
        )?;
        Ok(())
    }
}

impl TaskStore for SqliteTaskStore {
    /// Tasks are never deleted, so an empty table can only mean a fresh
    /// database; seed it the same way the file backend seeds a missing
    /// tasks.json.
    fn load_tasks(&self) -> Result<TaskMap, StoreError> {
        let tasks = self.snapshot()?;
        if !tasks.is_empty() {
            return Ok(tasks);
        }
        let tasks = seed_tasks();
        for (id, task) in &tasks {
            self.insert(id, task)?;
        }
        Ok(tasks)
    }

    fn create_task(
        &self,
        description: &str,
        explicit_id: Option<&str>,
    ) -> Result<String, StoreError> {
        validate_description(description)?;
        let tasks = self.snapshot()?;
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
        self.insert(&id, &TaskRecord::new(description))?;
        Ok(id)
    }

    fn mark_completed(&self, id: &str) -> Result<MarkOutcome, StoreError> {
        let changed = self
            .conn
            .execute("UPDATE tasks SET completed = 1 WHERE id = ?1", params![id])?;
        if changed == 0 {
            Ok(MarkOutcome::NotFound)
        } else {
            Ok(MarkOutcome::Completed)
        }
    }

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT description, completed FROM tasks WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| {
            Ok(TaskRecord {
                description: row.get(0)?,
                completed: row.get(1)?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn current_task(&self) -> Result<Option<(String, TaskRecord)>, StoreError> {
        Ok(self
            .load_tasks()?
            .into_iter()
            .find(|(_, task)| !task.completed))
    }
}
