//! API handlers for the Vocalis server.

use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use vocalis_coach::CallSummary;
use vocalis_types::{
    frequency_to_note, ExerciseResult, PracticeLineResult, VoiceMetrics, VoiceType,
};

/// Dynamics category assumed when the client sends none.
const DEFAULT_DYNAMICS: &str = "stable";

/// Separator between the segments of a session id.
const SESSION_ID_SEPARATOR: char = '_';

/// Voice metrics as sent by clients.
///
/// Only the four acoustic measurements are required. The classification
/// fields are derived from `mean_pitch` when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsInput {
    pub mean_pitch: f64,
    pub vibrato_rate: f64,
    pub jitter: f64,
    pub shimmer: f64,
    #[serde(default)]
    pub dynamics: Option<String>,
    #[serde(default)]
    pub voice_type: Option<String>,
    #[serde(default)]
    pub lowest_note: Option<String>,
    #[serde(default)]
    pub highest_note: Option<String>,
}

impl MetricsInput {
    /// Validates the measurements and fills in derived fields.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BadRequest`] if any measurement is NaN or infinite.
    pub fn into_metrics(self) -> Result<VoiceMetrics, ApiError> {
        for (name, value) in [
            ("mean_pitch", self.mean_pitch),
            ("vibrato_rate", self.vibrato_rate),
            ("jitter", self.jitter),
            ("shimmer", self.shimmer),
        ] {
            if !value.is_finite() {
                return Err(ApiError::BadRequest(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }

        let voice_type = present(self.voice_type)
            .map(VoiceType::from)
            .unwrap_or_else(|| VoiceType::from_mean_pitch(self.mean_pitch));
        let lowest_note = present(self.lowest_note)
            .unwrap_or_else(|| frequency_to_note(self.mean_pitch * 0.8));
        let highest_note = present(self.highest_note)
            .unwrap_or_else(|| frequency_to_note(self.mean_pitch * 1.2));

        Ok(VoiceMetrics {
            mean_pitch: self.mean_pitch,
            vibrato_rate: self.vibrato_rate,
            jitter: self.jitter,
            shimmer: self.shimmer,
            dynamics: present(self.dynamics).unwrap_or_else(|| DEFAULT_DYNAMICS.to_string()),
            voice_type,
            lowest_note,
            highest_note,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Request body for `POST /api/practice-line`.
///
/// `user_id` must not contain `_`: it becomes the middle segment of the
/// `<tier>_<userId>_<timestamp>` session id and is recovered by splitting on
/// `_`.
#[derive(Debug, Deserialize)]
pub struct PracticeLineRequest {
    pub user_id: String,
    pub metrics: MetricsInput,
}

/// Request body for `POST /api/exercise`.
#[derive(Debug, Deserialize)]
pub struct ExerciseRequest {
    pub session_id: String,
    #[serde(default)]
    pub custom_line: String,
    pub metrics: MetricsInput,
}

/// Response body for `GET /api/vapi/connection`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub connected: bool,
}

/// Response body for `GET /api/vapi/agent`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent: Option<serde_json::Value>,
}

/// Response body for `GET /api/vapi/calls`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallsResponse {
    pub calls: Vec<CallSummary>,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Handler for `POST /api/practice-line`.
pub async fn practice_line_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PracticeLineRequest>,
) -> Result<Json<PracticeLineResult>, ApiError> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if user_id.contains(SESSION_ID_SEPARATOR) {
        return Err(ApiError::BadRequest(format!(
            "user_id must not contain '{}'",
            SESSION_ID_SEPARATOR
        )));
    }
    let metrics = payload.metrics.into_metrics()?;

    let result = state.coach.generate_practice_line(&metrics, user_id).await;
    tracing::info!(
        user_id,
        tier = result.tier.prefix(),
        session_id = %result.session_id,
        "generated practice line"
    );
    Ok(Json(result))
}

/// Handler for `POST /api/exercise`.
pub async fn exercise_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ExerciseRequest>,
) -> Result<Json<ExerciseResult>, ApiError> {
    let metrics = payload.metrics.into_metrics()?;

    let result = state
        .coach
        .generate_exercise(&metrics, &payload.custom_line, &payload.session_id)
        .await;
    tracing::info!(
        session_id = %payload.session_id,
        tier = result.tier.prefix(),
        focus = result.assessed_focus.as_str(),
        "generated exercise"
    );
    Ok(Json(result))
}

/// Handler for `GET /api/vapi/connection`.
pub async fn connection_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<ConnectionResponse> {
    Json(ConnectionResponse {
        connected: state.coach.test_connection().await,
    })
}

/// Handler for `GET /api/vapi/agent`.
pub async fn agent_handler(Extension(state): Extension<Arc<AppState>>) -> Json<AgentResponse> {
    Json(AgentResponse {
        agent: state.coach.voice_agent_details().await,
    })
}

/// Handler for `GET /api/vapi/calls`.
pub async fn calls_handler(Extension(state): Extension<Arc<AppState>>) -> Json<CallsResponse> {
    Json(CallsResponse {
        calls: state.coach.list_active_calls().await,
    })
}
