//! Shared types and configuration for the planpilot workspace.
//!
//! The store, refiner, and command crates all speak in terms of the task
//! map defined here; configuration loading and token-usage accounting
//! also live here so the leaf crates stay dependency-light.

mod config;
mod task;
mod usage;

pub use config::{PlannerConfig, RefinerConfig, StoreBackend, runtime_dir};
pub use task::{TaskMap, TaskRecord, next_task_id, seed_tasks};
pub use usage::{TokenUsage, UsageTotals};
