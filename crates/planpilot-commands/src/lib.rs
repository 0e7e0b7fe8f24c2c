//! The command surface a host agent mounts.
//!
//! `Planner` binds a task store, the plan document, and a refiner;
//! `install_planner_commands` registers the five planning commands on a
//! `CommandRegistry`, which the host routes invocations through. All
//! failures a handler can produce come back as `CommandReply::Error`
//! values so a confused model never crashes the host loop.

mod observe;
mod planner;
mod registry;
mod validate;

pub use observe::Observer;
pub use planner::{Planner, PlannerError, install_planner_commands};
pub use registry::{CommandHandler, CommandRegistry, CommandReply, CommandSpec, PromptHost};
