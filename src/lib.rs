pub mod config;
pub mod dag;
pub mod errors;
pub mod input;
pub mod plan;
pub mod task;
pub mod team;

pub use errors::{PlanError, Result};
pub use input::{PlanInput, ProgressEntry, ProgressStatus, ProjectWindow};
pub use plan::{PlanOutcome, PlanResult, Planner, PlannerConfig};
