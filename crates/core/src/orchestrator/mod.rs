//! Stage orchestrator for the ticket pipeline.
//!
//! Request-driven, no background scheduler: every stage run happens
//! inside a caller's `trigger_stage` call, guarded by a conditional
//! status transition so at most one run per ticket is in flight.

mod runner;
mod types;

pub use runner::StageOrchestrator;
pub use types::{NewAttachment, NewTicket, OrchestratorError, Stage};
