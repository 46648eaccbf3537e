use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The shortest delay the background refresh waits between fetches.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// ClientConfig describes where a [crate::FlagClient] fetches flags from and how often.
///
/// It can be built in code:
///
/// ```
/// use std::time::Duration;
/// use flagsync::ClientConfig;
///
/// let config = ClientConfig::new("https://flags.example.com/flags.json", Duration::from_secs(60))
///     .timeout(Duration::from_secs(5));
/// assert!(config.verify_tls);
/// ```
///
/// or deserialized, with durations given in whole seconds:
///
/// ```
/// use flagsync::ClientConfig;
///
/// let config: ClientConfig =
///     serde_json::from_str(r#"{"url": "https://flags.example.com", "interval": 30}"#).unwrap();
/// assert_eq!(config.timeout.as_secs(), 10);
/// ```
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,

    /// Delay between the end of one refresh and the start of the next. Values below
    /// [MIN_REFRESH_INTERVAL], including zero, are raised to it by the refresh loop.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub interval: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_verify_tls() -> bool {
    true
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, interval: Duration) -> Self {
        Self {
            url: url.into(),
            interval,
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// The delay the background refresh actually waits: `interval`, but never less than
    /// [MIN_REFRESH_INTERVAL].
    pub fn refresh_interval(&self) -> Duration {
        self.interval.max(MIN_REFRESH_INTERVAL)
    }
}
