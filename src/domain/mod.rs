//! Domain model for a single workflow run.
//!
//! # Architecture
//!
//! - **Types** (`types.rs`): identifiers and phase status
//! - **Definition** (`definition.rs`): the static phase list a run references
//! - **Records** (`records.rs`): phase records and execution log entries
//! - **Input** (`input.rs`): out-of-band input requests and answers
//! - **Failure** (`failure.rs`): remediation taxonomy and surfaced errors
//! - **Errors** (`errors.rs`): operator-facing error types

pub mod definition;
pub mod errors;
pub mod failure;
pub mod input;
pub mod records;
pub mod types;

pub use definition::{PhaseDefinition, WorkflowDefinition};
pub use errors::{CoordinatorError, InputValidationError};
pub use failure::{Remediation, RemediationKind, SurfacedError, SurfacedErrorKind};
pub use input::{InputAnswer, InputOption, InputType, InputValidation, UserInputRequest};
pub use records::{LogEntry, LogLevel, PhaseRecord};
pub use types::{InstanceId, PhaseNumber, PhaseStatus, RequestId, Timestamp};
