use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use vocalis_coach::{CoachService, VapiConfig};
use vocalis_types::{Difficulty, GenerationTier, TargetFocus, VoiceMetrics, VoiceType};

const API_KEY: &str = "test-key";
const ASSISTANT_ID: &str = "assistant-1";
const CALL_ID: &str = "call-123";

/// Behaviour of the mock Vapi API.
#[derive(Clone)]
struct MockVapi {
    call_details: Value,
    start_status: StatusCode,
    /// Raw body returned by `POST /call` instead of the JSON call id.
    start_raw: Option<&'static str>,
    start_delay: Duration,
    details_status: StatusCode,
    /// Raw body returned by `GET /call/{id}` instead of `call_details`.
    details_raw: Option<&'static str>,
    assistant_delay: Duration,
    started: Arc<Mutex<Vec<Value>>>,
}

impl MockVapi {
    fn answering(call_details: Value) -> Self {
        Self {
            call_details,
            start_status: StatusCode::CREATED,
            start_raw: None,
            start_delay: Duration::ZERO,
            details_status: StatusCode::OK,
            details_raw: None,
            assistant_delay: Duration::ZERO,
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn started_calls(&self) -> Vec<Value> {
        self.started.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", API_KEY))
}

async fn start_call(
    State(mock): State<MockVapi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
    }
    tokio::time::sleep(mock.start_delay).await;
    mock.started.lock().unwrap().push(body);
    if !mock.start_status.is_success() {
        return (mock.start_status, Json(json!({ "error": "boom" }))).into_response();
    }
    if let Some(raw) = mock.start_raw {
        return (mock.start_status, raw).into_response();
    }
    (mock.start_status, Json(json!({ "id": CALL_ID }))).into_response()
}

async fn get_call(State(mock): State<MockVapi>, Path(id): Path<String>) -> Response {
    if id != CALL_ID {
        return StatusCode::NOT_FOUND.into_response();
    }
    if !mock.details_status.is_success() {
        return (mock.details_status, Json(json!({ "error": "upstream" }))).into_response();
    }
    if let Some(raw) = mock.details_raw {
        return raw.into_response();
    }
    Json(mock.call_details.clone()).into_response()
}

async fn list_calls() -> Json<Value> {
    Json(json!([
        { "id": "c1", "status": "in-progress", "createdAt": "2026-10-18T10:00:00Z" },
        { "id": "c2", "status": "ended" },
        { "id": "c3", "status": "queued" },
        { "id": "c4" }
    ]))
}

async fn list_assistants(State(mock): State<MockVapi>, headers: HeaderMap) -> StatusCode {
    tokio::time::sleep(mock.assistant_delay).await;
    if authorized(&headers) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn get_assistant(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    if id != ASSISTANT_ID {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "id": id, "name": "Vocal Coach" })))
}

async fn spawn_mock(mock: MockVapi) -> String {
    let app = Router::new()
        .route("/call", post(start_call).get(list_calls))
        .route("/call/{id}", get(get_call))
        .route("/assistant", get(list_assistants))
        .route("/assistant/{id}", get(get_assistant))
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn test_config(base_url: &str) -> VapiConfig {
    VapiConfig {
        request_timeout_ms: 2_000,
        probe_timeout_ms: 500,
        line_settle_ms: 10,
        exercise_settle_ms: 10,
        ..VapiConfig::new(API_KEY, ASSISTANT_ID).with_base_url(base_url)
    }
}

fn tenor_metrics() -> VoiceMetrics {
    VoiceMetrics {
        mean_pitch: 320.0,
        vibrato_rate: 0.9,
        jitter: 0.5,
        shimmer: 0.5,
        dynamics: "stable".to_string(),
        voice_type: VoiceType::Tenor,
        lowest_note: "C3".to_string(),
        highest_note: "A4".to_string(),
    }
}

fn soprano_metrics() -> VoiceMetrics {
    VoiceMetrics {
        mean_pitch: 440.0,
        vibrato_rate: 0.1,
        jitter: 3.0,
        shimmer: 4.0,
        dynamics: "variable".to_string(),
        voice_type: VoiceType::Soprano,
        lowest_note: "C4".to_string(),
        highest_note: "A5".to_string(),
    }
}

#[tokio::test]
async fn test_practice_line_from_agent() {
    let mock = MockVapi::answering(json!({
        "id": CALL_ID,
        "status": "ended",
        "messages": [
            { "role": "user", "content": "hello" },
            { "role": "assistant", "content": "Sing this: the tide rolls in beneath the moon" }
        ]
    }));
    let url = spawn_mock(mock.clone()).await;
    let service = CoachService::from_config(&test_config(&url));

    let result = service
        .generate_practice_line(&tenor_metrics(), "user42")
        .await;

    assert!(result.success);
    assert_eq!(result.tier, GenerationTier::Vapi);
    assert!(result.session_id.starts_with("vapi_user42_"));
    assert_eq!(result.call_id.as_deref(), Some(CALL_ID));
    assert_eq!(
        result.custom_line,
        "Sing this: the tide rolls in beneath the moon"
    );

    let started = mock.started_calls();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0]["assistant"], json!({}));
    assert_eq!(started[0]["customer"]["name"], "User user42");
    assert_eq!(
        started[0]["metadata"]["analysis_type"],
        "initial_voice_analysis"
    );
    assert_eq!(started[0]["metadata"]["voice_type"], "tenor");
    assert_eq!(started[0]["metadata"]["jitter"], 0.5);
    assert!(started[0]["metadata"].get("custom_line").is_none());
}

#[tokio::test]
async fn test_practice_line_from_transcript() {
    let mock = MockVapi::answering(json!({
        "id": CALL_ID,
        "transcript": "User: hi\nAssistant: Recite after me: warm winds over the valley"
    }));
    let url = spawn_mock(mock).await;
    let service = CoachService::from_config(&test_config(&url));

    let result = service
        .generate_practice_line(&tenor_metrics(), "user42")
        .await;

    assert_eq!(result.tier, GenerationTier::Vapi);
    assert_eq!(
        result.custom_line,
        "Recite after me: warm winds over the valley"
    );
}

#[tokio::test]
async fn test_long_user_ids_are_truncated_in_customer_name() {
    let mock = MockVapi::answering(json!({ "id": CALL_ID, "messages": [] }));
    let url = spawn_mock(mock.clone()).await;
    let service = CoachService::from_config(&test_config(&url));
    let user_id = "x".repeat(64);

    service.generate_practice_line(&tenor_metrics(), &user_id).await;

    let started = mock.started_calls();
    let name = started[0]["customer"]["name"].as_str().unwrap();
    assert_eq!(name.len(), 40);
    assert_eq!(name, format!("User {}", "x".repeat(35)));
    assert_eq!(started[0]["metadata"]["user_id"], user_id);
}

#[tokio::test]
async fn test_extraction_miss_falls_back() {
    let mock = MockVapi::answering(json!({
        "id": CALL_ID,
        "messages": [{ "role": "assistant", "content": "Hello! How are you today?" }]
    }));
    let url = spawn_mock(mock).await;
    let service = CoachService::from_config(&test_config(&url));

    let result = service
        .generate_practice_line(&tenor_metrics(), "user42")
        .await;

    assert!(result.success);
    assert_eq!(result.tier, GenerationTier::Fallback);
    assert!(result.session_id.starts_with("fallback_user42_"));
    assert_eq!(result.call_id, None);
    assert!(!result.custom_line.is_empty());
}

#[tokio::test]
async fn test_remote_error_falls_back() {
    let mock = MockVapi {
        start_status: StatusCode::INTERNAL_SERVER_ERROR,
        ..MockVapi::answering(json!({}))
    };
    let url = spawn_mock(mock).await;
    let service = CoachService::from_config(&test_config(&url));

    let line = service
        .generate_practice_line(&tenor_metrics(), "user42")
        .await;
    assert_eq!(line.tier, GenerationTier::Fallback);

    let exercise = service
        .generate_exercise(&tenor_metrics(), "some line", &line.session_id)
        .await;
    assert!(exercise.success);
    assert_eq!(exercise.tier, GenerationTier::Fallback);
    assert_eq!(exercise.call_id, None);
}

fn line_reply() -> Value {
    json!({
        "id": CALL_ID,
        "messages": [{ "role": "assistant", "content": "Sing this: bright morning bells" }]
    })
}

async fn assert_both_degrade(mock: MockVapi) {
    let url = spawn_mock(mock).await;
    let service = CoachService::from_config(&test_config(&url));

    let line = service
        .generate_practice_line(&tenor_metrics(), "user42")
        .await;
    assert!(line.success);
    assert_eq!(line.tier, GenerationTier::Fallback);
    assert!(line.session_id.starts_with("fallback_user42_"));
    assert_eq!(line.call_id, None);

    let exercise = service
        .generate_exercise(&tenor_metrics(), &line.custom_line, &line.session_id)
        .await;
    assert!(exercise.success);
    assert_eq!(exercise.tier, GenerationTier::Fallback);
    assert_eq!(exercise.call_id, None);
}

#[tokio::test]
async fn test_non_json_start_response_falls_back() {
    assert_both_degrade(MockVapi {
        start_raw: Some("not json"),
        ..MockVapi::answering(line_reply())
    })
    .await;
}

#[tokio::test]
async fn test_start_response_without_id_falls_back() {
    assert_both_degrade(MockVapi {
        start_raw: Some(r#"{"status":"queued"}"#),
        ..MockVapi::answering(line_reply())
    })
    .await;
}

#[tokio::test]
async fn test_failed_call_fetch_falls_back() {
    let mock = MockVapi {
        details_status: StatusCode::BAD_GATEWAY,
        ..MockVapi::answering(line_reply())
    };
    assert_both_degrade(mock.clone()).await;
    // The call was started; only the fetch failed.
    assert_eq!(mock.started_calls().len(), 2);
}

#[tokio::test]
async fn test_non_json_call_details_fall_back() {
    assert_both_degrade(MockVapi {
        details_raw: Some("<html>oops</html>"),
        ..MockVapi::answering(line_reply())
    })
    .await;
}

#[tokio::test]
async fn test_wrong_api_key_falls_back() {
    let mock = MockVapi::answering(json!({}));
    let url = spawn_mock(mock.clone()).await;
    let config = VapiConfig {
        api_key: Some("wrong".to_string()),
        ..test_config(&url)
    };
    let service = CoachService::from_config(&config);

    let result = service
        .generate_practice_line(&tenor_metrics(), "user42")
        .await;

    assert_eq!(result.tier, GenerationTier::Fallback);
    assert!(mock.started_calls().is_empty());
}

#[tokio::test]
async fn test_missing_credentials_never_touch_network() {
    let service = CoachService::from_config(&VapiConfig::default());

    let result = service
        .generate_practice_line(&tenor_metrics(), "user42")
        .await;
    assert!(result.success);
    assert!(result.session_id.starts_with("fallback_"));

    let exercise = service
        .generate_exercise(&tenor_metrics(), &result.custom_line, &result.session_id)
        .await;
    assert!(exercise.success);
    assert_eq!(exercise.tier, GenerationTier::Fallback);
    assert_eq!(exercise.exercise.target_focus, TargetFocus::AdvancedTechnique);
    assert_eq!(exercise.exercise.difficulty, Difficulty::Advanced);

    assert!(!service.test_connection().await);
    assert!(service.voice_agent_details().await.is_none());
    assert!(service.list_active_calls().await.is_empty());
}

#[tokio::test]
async fn test_unreachable_agent_degrades_exercise() {
    let mock = MockVapi {
        start_delay: Duration::from_secs(5),
        ..MockVapi::answering(json!({}))
    };
    let url = spawn_mock(mock).await;
    let config = VapiConfig {
        request_timeout_ms: 200,
        ..test_config(&url)
    };
    let service = CoachService::from_config(&config);

    let started = Instant::now();
    let result = service
        .generate_exercise(&soprano_metrics(), "Stars are singing", "vapi_user7_1700000000")
        .await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(result.success);
    assert_eq!(result.tier, GenerationTier::Fallback);
    assert_eq!(result.call_id, None);
    assert_eq!(result.assessed_focus, TargetFocus::VibratoDevelopment);
    assert_eq!(result.exercise.target_focus, TargetFocus::PitchStability);
    assert_eq!(result.exercise.difficulty, Difficulty::Beginner);

    let feedback = &result.feedback;
    let pitch = feedback.find("pitch is unstable").unwrap();
    let volume = feedback.find("volume control needs work").unwrap();
    let vibrato = feedback.find("developing a natural vibrato").unwrap();
    let range = feedback.find("soprano, your current range spans C4 to A5").unwrap();
    assert!(pitch < volume && volume < vibrato && vibrato < range);
}

#[tokio::test]
async fn test_exercise_from_agent() {
    let mock = MockVapi::answering(json!({
        "id": CALL_ID,
        "messages": [
            { "role": "assistant", "content": "Let's review your performance." },
            { "role": "user", "content": "ok" },
            { "role": "assistant", "content": "Feedback: your breath support has improved." },
            { "role": "assistant", "content": "Exercise: hum the line on a five-note scale." }
        ]
    }));
    let url = spawn_mock(mock.clone()).await;
    let service = CoachService::from_config(&test_config(&url));

    let result = service
        .generate_exercise(&tenor_metrics(), "Over the hills", "vapi_user42_1700000000")
        .await;

    assert!(result.success);
    assert_eq!(result.tier, GenerationTier::Vapi);
    assert_eq!(result.call_id.as_deref(), Some(CALL_ID));
    assert_eq!(result.feedback, "Feedback: your breath support has improved.");
    assert_eq!(
        result.exercise.description,
        "Exercise: hum the line on a five-note scale."
    );
    assert_eq!(result.exercise.title, "Agility Runs");
    assert_eq!(result.exercise.difficulty, Difficulty::Advanced);
    assert_eq!(
        result.recommendations,
        vec!["Focus on breath control exercises".to_string()]
    );

    let started = mock.started_calls();
    assert_eq!(started[0]["customer"]["name"], "User user42");
    assert_eq!(started[0]["metadata"]["analysis_type"], "custom_line_practice");
    assert_eq!(started[0]["metadata"]["custom_line"], "Over the hills");
}

#[tokio::test]
async fn test_exercise_session_without_user_uses_unknown() {
    let mock = MockVapi::answering(json!({ "id": CALL_ID, "messages": [] }));
    let url = spawn_mock(mock.clone()).await;
    let service = CoachService::from_config(&test_config(&url));

    let result = service
        .generate_exercise(&tenor_metrics(), "line", "orphan")
        .await;

    assert_eq!(result.tier, GenerationTier::Fallback);
    let started = mock.started_calls();
    assert_eq!(started[0]["customer"]["name"], "User unknown");
}

#[tokio::test]
async fn test_probe_reports_healthy_agent() {
    let url = spawn_mock(MockVapi::answering(json!({}))).await;
    let service = CoachService::from_config(&test_config(&url));

    assert!(service.test_connection().await);
}

#[tokio::test]
async fn test_probe_fails_for_unknown_assistant() {
    let url = spawn_mock(MockVapi::answering(json!({}))).await;
    let config = VapiConfig {
        assistant_id: Some("missing".to_string()),
        ..test_config(&url)
    };
    let service = CoachService::from_config(&config);

    assert!(!service.test_connection().await);
}

#[tokio::test]
async fn test_probe_is_bounded_by_timeout() {
    let mock = MockVapi {
        assistant_delay: Duration::from_secs(10),
        ..MockVapi::answering(json!({}))
    };
    let url = spawn_mock(mock).await;
    let service = CoachService::from_config(&test_config(&url));

    let started = Instant::now();
    assert!(!service.test_connection().await);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_failed_probe_skips_remote_tier() {
    let mock = MockVapi {
        assistant_delay: Duration::from_secs(10),
        ..MockVapi::answering(json!({
            "id": CALL_ID,
            "messages": [{ "role": "assistant", "content": "Sing: bright morning" }]
        }))
    };
    let url = spawn_mock(mock.clone()).await;
    let config = VapiConfig {
        probe_before_call: true,
        probe_timeout_ms: 100,
        ..test_config(&url)
    };
    let service = CoachService::from_config(&config);

    let result = service
        .generate_practice_line(&tenor_metrics(), "user42")
        .await;

    assert_eq!(result.tier, GenerationTier::Fallback);
    assert!(mock.started_calls().is_empty());
}

#[tokio::test]
async fn test_agent_details_and_active_calls() {
    let url = spawn_mock(MockVapi::answering(json!({}))).await;
    let service = CoachService::from_config(&test_config(&url));

    let details = service.voice_agent_details().await.unwrap();
    assert_eq!(details["id"], ASSISTANT_ID);
    assert_eq!(details["name"], "Vocal Coach");

    let active: Vec<String> = service
        .list_active_calls()
        .await
        .into_iter()
        .map(|call| call.id)
        .collect();
    assert_eq!(active, vec!["c1".to_string(), "c3".to_string()]);
}
