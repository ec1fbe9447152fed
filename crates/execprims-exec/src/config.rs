use std::time::Duration;

use execprims_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Largest frame payload accepted or sent. Default: 1 GiB.
    pub max_payload_size: usize,
    /// Upper bound on the whole response, measured from the moment the
    /// request is transmitted. `None` (the default) waits indefinitely.
    pub response_timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            response_timeout: None,
        }
    }
}

impl RunnerConfig {
    /// Set the response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Set the maximum payload size.
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    /// Frame settings for a helper channel. The response timeout is
    /// applied per read by the runner.
    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_wait_forever() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD);
        assert!(config.response_timeout.is_none());
    }

    #[test]
    fn frame_config_carries_payload_limit_only() {
        let config = RunnerConfig::default()
            .with_max_payload_size(64)
            .with_timeout(Duration::from_secs(1));
        let frame = config.frame_config();
        assert_eq!(frame.max_payload_size, 64);
    }
}
