//! Sleeper that never waits.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::orchestrator::Sleeper;

/// Records requested durations and returns after yielding once.
///
/// Yielding keeps concurrently spawned pipelines interleaving the way they
/// would with real timers.
#[derive(Debug, Clone, Default)]
pub struct InstantSleeper {
    sleeps: Arc<RwLock<Vec<Duration>>>,
}

impl InstantSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration requested so far, in order.
    pub async fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.read().await.clone()
    }

    /// Sum of all requested durations (the simulated wall-clock time).
    pub async fn total(&self) -> Duration {
        self.sleeps.read().await.iter().sum()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.write().await.push(duration);
        tokio::task::yield_now().await;
    }
}
