//! Client for the hosted Vapi voice agent.
//!
//! Each generation request starts one call, waits a fixed settle interval,
//! then fetches whatever the call has produced so far. There is no completion
//! signal: an unfinished call simply yields nothing extractable. The client
//! never retries; every failure is reported as
//! [`CoachError::RemoteUnavailable`] and the caller decides how to degrade.

use crate::config::{is_present, VapiConfig};
use crate::error::CoachError;
use reqwest::header;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use vocalis_types::VoiceMetrics;

/// Remote limit on the customer display name.
const CUSTOMER_NAME_LIMIT: usize = 40;
const CUSTOMER_NAME_PREFIX: &str = "User ";
/// Room left for the user id once the prefix is added.
const CUSTOMER_ID_CHARS: usize = CUSTOMER_NAME_LIMIT - CUSTOMER_NAME_PREFIX.len();

/// Call statuses that count as still active.
const ACTIVE_CALL_STATUSES: [&str; 3] = ["queued", "ringing", "in-progress"];

/// Discriminator sent with every call so the agent knows what to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    InitialVoiceAnalysis,
    CustomLinePractice,
}

/// Handle for one remote call, owned by a single generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHandle {
    id: String,
    kind: AnalysisType,
}

impl CallHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> AnalysisType {
        self.kind
    }

    pub fn into_id(self) -> String {
        self.id
    }
}

/// A single turn of the call conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMessage {
    pub role: String,
    #[serde(default, alias = "message")]
    pub content: String,
}

/// The portion of `GET /call/{id}` the pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetails {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub messages: Vec<CallMessage>,
}

/// Entry returned by `GET /call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSummary {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl CallSummary {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| ACTIVE_CALL_STATUSES.contains(&status))
    }
}

#[derive(Debug, Serialize)]
struct Customer {
    name: String,
}

/// Flat key-value metadata attached to a call.
#[derive(Debug, Serialize)]
struct CallMetadata<'a> {
    #[serde(flatten)]
    metrics: &'a VoiceMetrics,
    analysis_type: AnalysisType,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_line: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct StartCallRequest<'a> {
    /// Always an empty object.
    assistant: serde_json::Map<String, serde_json::Value>,
    customer: Customer,
    metadata: CallMetadata<'a>,
}

#[derive(Debug, Deserialize)]
struct StartCallResponse {
    id: String,
}

/// Builds the customer display name, truncating the user id before the
/// prefix is added so the result fits the remote field limit.
pub fn customer_name(user_id: &str) -> String {
    let truncated: String = user_id.chars().take(CUSTOMER_ID_CHARS).collect();
    format!("{}{}", CUSTOMER_NAME_PREFIX, truncated)
}

#[derive(Debug, Clone)]
pub struct VapiClient {
    http: reqwest::Client,
    api_key: String,
    assistant_id: String,
    base_url: String,
    line_settle: Duration,
    exercise_settle: Duration,
}

impl VapiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoachError::CredentialsMissing`] if the API key or assistant
    /// id is absent or blank, and [`CoachError::RemoteUnavailable`] if the HTTP
    /// client cannot be built.
    pub fn new(config: &VapiConfig) -> Result<Self, CoachError> {
        if !is_present(&config.api_key) {
            return Err(CoachError::CredentialsMissing("api_key"));
        }
        if !is_present(&config.assistant_id) {
            return Err(CoachError::CredentialsMissing("assistant_id"));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("vocalis/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone().unwrap_or_default(),
            assistant_id: config.assistant_id.clone().unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            line_settle: config.line_settle(),
            exercise_settle: config.exercise_settle(),
        })
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Starts a call asking the agent for a practice line.
    pub async fn start_analysis_call(
        &self,
        metrics: &VoiceMetrics,
        user_id: &str,
    ) -> Result<CallHandle, CoachError> {
        self.start_call(metrics, user_id, AnalysisType::InitialVoiceAnalysis, None)
            .await
    }

    /// Starts a call asking the agent to review a practice line and suggest
    /// an exercise.
    pub async fn start_practice_call(
        &self,
        metrics: &VoiceMetrics,
        custom_line: &str,
        user_id: &str,
    ) -> Result<CallHandle, CoachError> {
        self.start_call(
            metrics,
            user_id,
            AnalysisType::CustomLinePractice,
            Some(custom_line),
        )
        .await
    }

    async fn start_call(
        &self,
        metrics: &VoiceMetrics,
        user_id: &str,
        kind: AnalysisType,
        custom_line: Option<&str>,
    ) -> Result<CallHandle, CoachError> {
        let body = StartCallRequest {
            assistant: serde_json::Map::new(),
            customer: Customer {
                name: customer_name(user_id),
            },
            metadata: CallMetadata {
                metrics,
                analysis_type: kind,
                user_id,
                custom_line,
            },
        };

        let resp = self
            .http
            .post(self.url("/call"))
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;
        let started: StartCallResponse = check_status(resp)?.json().await?;

        info!(call_id = %started.id, analysis_type = ?kind, "started vapi call");
        Ok(CallHandle {
            id: started.id,
            kind,
        })
    }

    /// Waits the settle interval for the handle's call kind, then fetches
    /// the call.
    pub async fn await_call_details(&self, handle: &CallHandle) -> Result<CallDetails, CoachError> {
        let settle = match handle.kind {
            AnalysisType::InitialVoiceAnalysis => self.line_settle,
            AnalysisType::CustomLinePractice => self.exercise_settle,
        };
        debug!(call_id = %handle.id, settle_ms = settle.as_millis() as u64, "waiting for call to settle");
        tokio::time::sleep(settle).await;

        self.get_json(&format!("/call/{}", handle.id)).await
    }

    /// Fetches the configured assistant's definition.
    pub async fn assistant_details(&self) -> Result<serde_json::Value, CoachError> {
        self.get_json(&format!("/assistant/{}", self.assistant_id))
            .await
    }

    /// Lists calls known to the account.
    pub async fn list_calls(&self) -> Result<Vec<CallSummary>, CoachError> {
        self.get_json("/call").await
    }

    /// Checks that the agent API answers and the configured assistant exists.
    ///
    /// Both checks share one `timeout` budget. On expiry the in-flight request
    /// is dropped, which closes its connection. Never errors.
    pub async fn probe(&self, timeout: Duration) -> bool {
        let checks = async {
            self.check_ok("/assistant").await?;
            self.check_ok(&format!("/assistant/{}", self.assistant_id))
                .await
        };

        match tokio::time::timeout(timeout, checks).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "vapi connection probe failed");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "vapi connection probe timed out"
                );
                false
            }
        }
    }

    async fn check_ok(&self, path: &str) -> Result<(), CoachError> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        check_status(resp).map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CoachError> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        Ok(check_status(resp)?.json().await?)
    }
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, CoachError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(CoachError::RemoteUnavailable(format!(
            "{} returned HTTP {}",
            resp.url().path(),
            status
        )))
    }
}
