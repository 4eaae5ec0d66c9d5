//! The caller-facing generation service.
//!
//! Routes each request to the remote agent when one is configured and falls
//! back to the rule-based generator on any failure.

use crate::config::VapiConfig;
use crate::error::CoachError;
use crate::extract::{extract_exercise, extract_line, recommendations};
use crate::fallback::{fallback_exercise, fallback_line};
use crate::vapi::{CallSummary, VapiClient};
use std::time::Duration;
use tracing::{info, warn};
use vocalis_types::{ExerciseResult, GenerationTier, PracticeLineResult, VoiceMetrics};

/// User id substituted when a session id carries none.
const UNKNOWN_USER: &str = "unknown";

/// Which tier produced a value, before it is wrapped for the caller.
#[derive(Debug)]
enum Outcome<T> {
    Remote { call_id: String, value: T },
    Fallback(T),
}

/// Entry point of the generation pipeline.
///
/// Every generation operation returns a usable, `success: true` result. The
/// remote agent is tried when credentials are configured; any failure, miss
/// or timeout degrades to the rule-based generator.
#[derive(Debug, Clone)]
pub struct CoachService {
    vapi: Option<VapiClient>,
    probe_timeout: Duration,
    probe_before_call: bool,
}

impl CoachService {
    /// Builds a service that talks to the given client.
    pub fn new(vapi: VapiClient, config: &VapiConfig) -> Self {
        Self {
            vapi: Some(vapi),
            probe_timeout: config.probe_timeout(),
            probe_before_call: config.probe_before_call,
        }
    }

    /// Builds a service that never contacts the remote agent.
    pub fn fallback_only() -> Self {
        Self {
            vapi: None,
            probe_timeout: VapiConfig::default().probe_timeout(),
            probe_before_call: false,
        }
    }

    /// Builds a service from configuration, switching to fallback-only mode
    /// when the client cannot be constructed.
    pub fn from_config(config: &VapiConfig) -> Self {
        match VapiClient::new(config) {
            Ok(client) => {
                info!(
                    base_url = client.base_url(),
                    assistant_id = client.assistant_id(),
                    "vapi remote tier enabled"
                );
                Self::new(client, config)
            }
            Err(e) => {
                warn!(error = %e, "vapi remote tier disabled, using rule-based generation");
                Self::fallback_only()
            }
        }
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.vapi.is_some()
    }

    /// Returns the client to use for this request, or `None` to go straight
    /// to the fallback tier.
    async fn remote(&self) -> Option<&VapiClient> {
        let client = self.vapi.as_ref()?;
        if self.probe_before_call && !client.probe(self.probe_timeout).await {
            warn!("vapi probe failed, skipping remote tier");
            return None;
        }
        Some(client)
    }

    /// Generates a practice line for the user.
    pub async fn generate_practice_line(
        &self,
        metrics: &VoiceMetrics,
        user_id: &str,
    ) -> PracticeLineResult {
        let outcome = match self.remote().await {
            Some(client) => match remote_practice_line(client, metrics, user_id).await {
                Ok((call_id, line)) => Outcome::Remote {
                    call_id,
                    value: line,
                },
                Err(e) => {
                    warn!(user_id, error = %e, "practice line degraded to fallback");
                    Outcome::Fallback(fallback_line(&metrics.voice_type, metrics.mean_pitch))
                }
            },
            None => Outcome::Fallback(fallback_line(&metrics.voice_type, metrics.mean_pitch)),
        };

        let timestamp = chrono::Utc::now().timestamp_millis();
        match outcome {
            Outcome::Remote { call_id, value } => PracticeLineResult {
                success: true,
                custom_line: value,
                session_id: GenerationTier::Vapi.session_id(user_id, timestamp),
                call_id: Some(call_id),
                tier: GenerationTier::Vapi,
            },
            Outcome::Fallback(value) => PracticeLineResult {
                success: true,
                custom_line: value,
                session_id: GenerationTier::Fallback.session_id(user_id, timestamp),
                call_id: None,
                tier: GenerationTier::Fallback,
            },
        }
    }

    /// Generates feedback and an exercise for a practice line.
    ///
    /// The user id is recovered from `session_id`.
    pub async fn generate_exercise(
        &self,
        metrics: &VoiceMetrics,
        custom_line: &str,
        session_id: &str,
    ) -> ExerciseResult {
        let user_id = user_id_from_session(session_id);
        let rules = fallback_exercise(metrics, custom_line);

        let outcome = match self.remote().await {
            Some(client) => {
                match remote_exercise(client, metrics, custom_line, user_id, &rules).await {
                    Ok((call_id, result)) => Outcome::Remote {
                        call_id,
                        value: result,
                    },
                    Err(e) => {
                        warn!(user_id, session_id, error = %e, "exercise degraded to fallback");
                        Outcome::Fallback(rules)
                    }
                }
            }
            None => Outcome::Fallback(rules),
        };

        match outcome {
            Outcome::Remote { call_id, value } => ExerciseResult {
                call_id: Some(call_id),
                tier: GenerationTier::Vapi,
                ..value
            },
            Outcome::Fallback(value) => value,
        }
    }

    /// Probes the remote agent. Returns `false` in fallback-only mode.
    pub async fn test_connection(&self) -> bool {
        match &self.vapi {
            Some(client) => client.probe(self.probe_timeout).await,
            None => false,
        }
    }

    /// Returns the configured assistant's definition, if reachable.
    pub async fn voice_agent_details(&self) -> Option<serde_json::Value> {
        let client = self.vapi.as_ref()?;
        match client.assistant_details().await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!(error = %e, "failed to fetch vapi assistant details");
                None
            }
        }
    }

    /// Returns calls that are queued, ringing or in progress.
    pub async fn list_active_calls(&self) -> Vec<CallSummary> {
        let Some(client) = &self.vapi else {
            return Vec::new();
        };
        match client.list_calls().await {
            Ok(calls) => calls.into_iter().filter(CallSummary::is_active).collect(),
            Err(e) => {
                warn!(error = %e, "failed to list vapi calls");
                Vec::new()
            }
        }
    }
}

/// Extracts the user id from a `<tier>_<userId>_<timestamp>` session id.
pub fn user_id_from_session(session_id: &str) -> &str {
    session_id
        .split('_')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .unwrap_or(UNKNOWN_USER)
}

async fn remote_practice_line(
    client: &VapiClient,
    metrics: &VoiceMetrics,
    user_id: &str,
) -> Result<(String, String), CoachError> {
    let handle = client.start_analysis_call(metrics, user_id).await?;
    let details = client.await_call_details(&handle).await?;
    let line = extract_line(&details).ok_or(CoachError::ExtractionMiss)?;
    Ok((handle.into_id(), line))
}

/// Asks the agent for an exercise. The agent supplies the description and,
/// when it gives any, the feedback; everything else comes from `rules`.
async fn remote_exercise(
    client: &VapiClient,
    metrics: &VoiceMetrics,
    custom_line: &str,
    user_id: &str,
    rules: &ExerciseResult,
) -> Result<(String, ExerciseResult), CoachError> {
    let handle = client
        .start_practice_call(metrics, custom_line, user_id)
        .await?;
    let details = client.await_call_details(&handle).await?;
    let extracted = extract_exercise(&details);
    let description = extracted.exercise.ok_or(CoachError::ExtractionMiss)?;

    let mut result = rules.clone();
    result.exercise.description = description;
    if let Some(feedback) = extracted.feedback {
        result.recommendations = recommendations(&feedback);
        result.feedback = feedback;
    }
    Ok((handle.into_id(), result))
}
