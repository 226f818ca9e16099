use crate::defs::{
    CONNECT_TIMEOUT_MSEC, DEFAULT_HOST, DEFAULT_PORT, READ_TIMEOUT_MSEC, RESEND_DELAY_MSEC,
};

use std::time::Duration;

/// Connection settings for a client run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Exchange host name or IP address.
    pub host: String,

    /// Exchange TCP port.
    pub port: u16,

    /// Upper bound for establishing a connection. `None` blocks indefinitely.
    pub connect_timeout: Option<Duration>,

    /// Upper bound for a single read. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,

    /// Gap recovery policy.
    pub recovery: RecoveryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Some(Duration::from_millis(CONNECT_TIMEOUT_MSEC)),
            read_timeout: Some(Duration::from_millis(READ_TIMEOUT_MSEC)),
            recovery: RecoveryConfig::default(),
        }
    }
}

/// How missing sequences are re-requested.
///
/// Every missing sequence gets its own connection; the only knob is the
/// pause inserted between two consecutive connection attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Pause before every resend connection attempt except the first.
    /// Sequences skipped without connecting add no pause. Zero disables it.
    pub resend_delay: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            resend_delay: Duration::from_millis(RESEND_DELAY_MSEC),
        }
    }
}
