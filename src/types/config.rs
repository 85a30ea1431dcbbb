use std::time::Duration;

/// Configuration for pairing and command sessions
#[derive(Debug, Clone)]
pub struct NukiConfig {
    /// Upper bound for a whole pairing run, discovery included (default: 60 seconds)
    pub pairing_timeout: Duration,

    /// Upper bound for one lock, unlock or state request (default: 30 seconds)
    pub command_timeout: Duration,

    /// Wait after a "new state" advertisement before reading the state,
    /// so a Nuki Bridge gets to read it first (default: none)
    pub bridge_read_delay: Option<Duration>,

    /// Largest ciphertext accepted on the command channel (default: 1024 bytes)
    pub max_frame_len: usize,
}

impl Default for NukiConfig {
    fn default() -> Self {
        Self {
            pairing_timeout: Duration::from_secs(60),
            command_timeout: Duration::from_secs(30),
            bridge_read_delay: None,
            max_frame_len: 1024,
        }
    }
}

impl NukiConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> NukiConfigBuilder {
        NukiConfigBuilder::default()
    }
}

/// Builder for `NukiConfig`
#[derive(Debug, Clone, Default)]
pub struct NukiConfigBuilder {
    config: NukiConfig,
}

impl NukiConfigBuilder {
    /// Set the overall pairing timeout
    #[must_use]
    pub fn pairing_timeout(mut self, timeout: Duration) -> Self {
        self.config.pairing_timeout = timeout;
        self
    }

    /// Set the per-command timeout
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Let a bridge read new states first
    #[must_use]
    pub fn bridge_read_delay(mut self, delay: Duration) -> Self {
        self.config.bridge_read_delay = Some(delay);
        self
    }

    /// Set the largest accepted ciphertext
    #[must_use]
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.config.max_frame_len = len;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> NukiConfig {
        self.config
    }
}
