//! Conversion orchestrator.
//!
//! Every file gets its own pipeline task:
//! - **Standard files**: short fixed delay, then ready with standard metadata
//! - **CAD files**: bucket, upload, translation job, then manifest polling
//!   until success, failure, or the attempt ceiling

mod clock;
mod config;
mod runner;
mod types;

pub use clock::{Sleeper, TokioSleeper};
pub use config::OrchestratorConfig;
pub use runner::ConversionOrchestrator;
pub use types::{ConversionJob, OrchestratorError, OrchestratorStatus, PipelineOutcome};
