//! Engine timing and buffering configuration.

use std::time::Duration;

/// Knobs for the job controller. Constructor-injected so tests can shrink
/// the timings; prices live in `airwave_core::pricing` and are not
/// configurable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sleep between status polls.
    pub poll_interval: Duration,
    /// Poll budget for the primary job. Exhaustion maps to `TimedOut` --
    /// this exists to stop the server from polling forever, not as an SLA.
    pub max_poll_attempts: u32,
    /// Poll budget for the cover-art sub-job.
    pub cover_poll_attempts: u32,
    /// Buffer size of the progress stream channel.
    pub stream_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            // 150 * 2s = 300s of wall time.
            max_poll_attempts: 150,
            cover_poll_attempts: 60,
            stream_buffer: 32,
        }
    }
}
