//! Coordinator configuration

use std::time::Duration;

use peerlink_media_core::MediaConstraints;

/// Configuration for a [`crate::coordinator::NegotiationCoordinator`]
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Capture tracks requested on start
    pub constraints: MediaConstraints,

    /// Delay between simulated candidate probes
    pub gather_interval: Duration,

    /// Candidates each gatherer emits before going quiet (trickle keeps
    /// applying whatever still arrives after connect)
    pub max_candidates: u32,

    /// Capacity of the candidate, event, and inbox channels.
    ///
    /// Handlers push signaling messages into a counterpart coordinator's
    /// inbox while holding an endpoint lock; the inbox must absorb a full
    /// candidate flush from both endpoints of a pair, or the dispatch task
    /// can wedge behind that same lock. [`CoordinatorConfigBuilder::build`]
    /// raises any smaller value to that floor.
    pub channel_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            constraints: MediaConstraints::default(),
            gather_interval: Duration::from_millis(10),
            max_candidates: 4,
            channel_capacity: 100,
        }
    }
}

impl CoordinatorConfig {
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }
}

/// Builder for [`CoordinatorConfig`]
#[derive(Debug, Default)]
pub struct CoordinatorConfigBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorConfigBuilder {
    pub fn constraints(mut self, constraints: MediaConstraints) -> Self {
        self.config.constraints = constraints;
        self
    }

    pub fn gather_interval(mut self, interval: Duration) -> Self {
        self.config.gather_interval = interval;
        self
    }

    pub fn max_candidates(mut self, max: u32) -> Self {
        self.config.max_candidates = max;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> CoordinatorConfig {
        let mut config = self.config;
        // Worst-case in-lock burst: both endpoints flush max_candidates
        // each, plus the offer/answer/hangup control messages
        let floor = config.max_candidates as usize * 2 + 4;
        if config.channel_capacity < floor {
            config.channel_capacity = floor;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_channel_capacity_raised_to_flush_floor() {
        let config = CoordinatorConfig::builder()
            .max_candidates(4)
            .channel_capacity(1)
            .build();
        assert_eq!(config.channel_capacity, 12);
    }

    #[test]
    fn ample_channel_capacity_passes_through() {
        let config = CoordinatorConfig::builder().channel_capacity(256).build();
        assert_eq!(config.channel_capacity, 256);
    }
}
