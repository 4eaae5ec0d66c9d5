//! Practice-content generation for the Vocalis coaching platform.
//!
//! Turns acoustic measurements of a recording into a practice line and a
//! follow-up exercise. Generation is tiered: the hosted Vapi voice agent is
//! asked first, its free-text answer is mined for usable content, and on any
//! missing credential, network failure, timeout or extraction miss the
//! deterministic rule-based generator answers instead.
//!
//! The caller-facing surface is [`CoachService`]; its operations never fail.
//! Which tier answered is visible in every result's `tier` field and
//! `session_id` prefix (`vapi_*` or `fallback_*`).

pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod service;
pub mod vapi;

pub use config::{VapiConfig, DEFAULT_VAPI_BASE_URL};
pub use error::CoachError;
pub use extract::{extract_exercise, extract_line, recommendations, ExtractedExercise};
pub use fallback::{assess, exercise_template, fallback_exercise, fallback_line, Assessment};
pub use service::{user_id_from_session, CoachService};
pub use vapi::{
    customer_name, AnalysisType, CallDetails, CallHandle, CallMessage, CallSummary, VapiClient,
};
