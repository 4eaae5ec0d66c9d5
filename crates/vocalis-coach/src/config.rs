//! Vapi connection settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Public Vapi REST endpoint used when no override is configured.
pub const DEFAULT_VAPI_BASE_URL: &str = "https://api.vapi.ai";

fn default_base_url() -> String {
    DEFAULT_VAPI_BASE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_line_settle_ms() -> u64 {
    2_000
}

fn default_exercise_settle_ms() -> u64 {
    3_000
}

/// Connection settings for the remote Vapi voice agent.
///
/// `api_key` and `assistant_id` are required for the remote tier. When either
/// is absent the coach runs permanently in fallback mode; that is a detected
/// condition, not a startup failure.
#[derive(Clone, Serialize, Deserialize)]
pub struct VapiConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request HTTP timeout. Default: 10 000 ms.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Shared budget for both connection-probe checks. Default: 5 000 ms.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Wait between starting a line-generation call and fetching it.
    #[serde(default = "default_line_settle_ms")]
    pub line_settle_ms: u64,
    /// Wait between starting an exercise call and fetching it.
    #[serde(default = "default_exercise_settle_ms")]
    pub exercise_settle_ms: u64,
    /// Probe the agent before every generation and skip the remote tier if
    /// it is unhealthy.
    #[serde(default)]
    pub probe_before_call: bool,
}

impl Default for VapiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            assistant_id: None,
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            line_settle_ms: default_line_settle_ms(),
            exercise_settle_ms: default_exercise_settle_ms(),
            probe_before_call: false,
        }
    }
}

impl fmt::Debug for VapiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("assistant_id", &self.assistant_id)
            .field("base_url", &self.base_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("probe_timeout_ms", &self.probe_timeout_ms)
            .field("line_settle_ms", &self.line_settle_ms)
            .field("exercise_settle_ms", &self.exercise_settle_ms)
            .field("probe_before_call", &self.probe_before_call)
            .finish()
    }
}

impl VapiConfig {
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            assistant_id: Some(assistant_id.into()),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns `true` if both required credentials are present and non-blank.
    pub fn has_credentials(&self) -> bool {
        is_present(&self.api_key) && is_present(&self.assistant_id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn line_settle(&self) -> Duration {
        Duration::from_millis(self.line_settle_ms)
    }

    pub fn exercise_settle(&self) -> Duration {
        Duration::from_millis(self.exercise_settle_ms)
    }
}

pub(crate) fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
