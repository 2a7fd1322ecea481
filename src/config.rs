//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default request timeout applied to every outbound call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for connecting to the portal backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL including the versioned API path
    /// (e.g. "https://portal.example.com/api/v1")
    pub base_url: String,

    /// Fixed timeout for every request
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a config for the given base URL with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        // Joined paths always start with '/'
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
