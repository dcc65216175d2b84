//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the conversion orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Delay between manifest polls (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Manifest polls before a translation is declared timed out.
    /// With the default interval this is a 5 minute ceiling.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Simulated processing time for files that need no translation (milliseconds).
    #[serde(default = "default_standard_delay")]
    pub standard_processing_delay_ms: u64,
}

fn default_poll_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_max_poll_attempts() -> u32 {
    30
}

fn default_standard_delay() -> u64 {
    2_000 // 2 seconds
}

impl OrchestratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn standard_processing_delay(&self) -> Duration {
        Duration::from_millis(self.standard_processing_delay_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            standard_processing_delay_ms: default_standard_delay(),
        }
    }
}
