//! Timer seam for the pipeline.

use std::time::Duration;

use async_trait::async_trait;

/// Waits between pipeline steps.
///
/// Production uses [`TokioSleeper`]; tests inject sleepers that return
/// immediately so a 5 minute poll window runs in milliseconds.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timer backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
