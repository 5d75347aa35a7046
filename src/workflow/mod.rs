// Workflow orchestration: script generation and per-scene media batches
pub mod aggregate;
pub mod coordinator;
pub mod locks;

#[cfg(test)]
pub mod testing;

pub use aggregate::aggregate_script_status;
pub use coordinator::{CoordinatorSettings, WorkflowCoordinator};
pub use locks::ScriptLocks;
