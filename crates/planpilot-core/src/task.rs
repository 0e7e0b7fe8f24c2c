use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A single unit of work tracked for the host agent.
///
/// On the wire this is the two-element `[description, completed]` array
/// that `tasks.json` maps each id to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub description: String,
    pub completed: bool,
}

impl TaskRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            completed: false,
        }
    }
}

impl Serialize for TaskRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.description)?;
        pair.serialize_element(&self.completed)?;
        pair.end()
    }
}

impl<'de> Deserialize<'de> for TaskRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairVisitor;

        impl<'de> Visitor<'de> for PairVisitor {
            type Value = TaskRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [description, completed] pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let description: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let completed: bool = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(TaskRecord {
                    description,
                    completed,
                })
            }
        }

        deserializer.deserialize_tuple(2, PairVisitor)
    }
}

/// All tasks known to the store, keyed by id. The ordered map keeps
/// iteration stable across load/save cycles, which is also the order the
/// plan checklist is rendered in.
pub type TaskMap = BTreeMap<String, TaskRecord>;

/// The two tasks a fresh (or unreadable) store is initialized with.
pub fn seed_tasks() -> TaskMap {
    let mut tasks = TaskMap::new();
    tasks.insert(
        "0".to_string(),
        TaskRecord::new("Create a detailed checklist for the current plan and goals"),
    );
    tasks.insert(
        "1".to_string(),
        TaskRecord::new("Review that every new task is completed"),
    );
    tasks
}

/// Next free auto-assigned id: one past the highest integer id in use,
/// starting at 0 for an empty map. Non-integer ids don't participate.
pub fn next_task_id(tasks: &TaskMap) -> String {
    tasks
        .keys()
        .filter_map(|id| id.parse::<u64>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(0)
        .to_string()
}
