use std::time::Duration;

use crate::config::PipelineConfig;

/// Inter-attempt delay. Two levels only: baseline after a success, cooldown
/// after a rate-limit signal. The value holds until the next transition.
#[derive(Debug, Clone)]
pub struct BackoffController {
    baseline: Duration,
    cooldown: Duration,
    current: Duration,
}

impl BackoffController {
    pub fn new(baseline: Duration, cooldown: Duration) -> Self {
        Self {
            baseline,
            cooldown,
            current: baseline,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.baseline_delay, config.cooldown_delay)
    }

    pub fn reset(&mut self) {
        self.current = self.baseline;
    }

    pub fn escalate(&mut self) {
        self.current = self.cooldown;
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn is_cooling_down(&self) -> bool {
        self.current == self.cooldown && self.cooldown != self.baseline
    }
}
