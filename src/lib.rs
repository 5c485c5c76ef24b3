//! Workflow execution coordinator.
//!
//! Consumes a backend's phase events for one workflow run, keeps the
//! authoritative phase state, mediates approval gates and input requests,
//! and routes recoverable failures to remediation.

pub mod audit_logger;
pub mod channel;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod logging;

#[cfg(test)]
mod test_support;

pub use config::CoordinatorConfig;
pub use coordinator::{CoordinatorSnapshot, RunReport, WorkflowCoordinator};
