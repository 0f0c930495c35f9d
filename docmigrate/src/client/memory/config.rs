use std::time::Duration;

/// Configuration of an [super::InMemoryClient].
#[derive(Debug, Clone, Default)]
pub struct InMemoryClientConfig {
    latency: Duration,
}

impl InMemoryClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated latency of every deadline-bound operation.
    ///
    /// An operation whose latency exceeds the caller's timeout fails with
    /// [crate::errors::ErrorKind::Timeout] and has no effect. The client never
    /// actually sleeps.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn simulated_latency(&self) -> Duration {
        self.latency
    }
}
