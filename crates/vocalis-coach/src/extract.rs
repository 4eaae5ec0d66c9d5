//! Heuristic extraction of practice content from agent call output.
//!
//! The agent answers in free text. These helpers look for assistant turns
//! mentioning known keywords and hand back the raw text; a miss is reported
//! as `None` so the caller can fall back to the rule-based generator.

use crate::vapi::{CallDetails, CallMessage};

const LINE_KEYWORDS: [&str; 3] = ["sing", "practice", "recite"];
const FEEDBACK_KEYWORDS: [&str; 3] = ["feedback", "performance", "analysis"];
const EXERCISE_KEYWORDS: [&str; 3] = ["exercise", "practice", "drill"];

const TRANSCRIPT_SPEAKER_PREFIX: &str = "Assistant:";

const MAX_RECOMMENDATIONS: usize = 3;

/// Content extracted from an exercise-practice call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedExercise {
    pub feedback: Option<String>,
    /// Free-text exercise description.
    pub exercise: Option<String>,
}

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

fn is_assistant(message: &CallMessage) -> bool {
    message.role.eq_ignore_ascii_case("assistant") || message.role.eq_ignore_ascii_case("bot")
}

/// Trimmed content of every assistant message that mentions a keyword.
fn assistant_matches<'a>(
    details: &'a CallDetails,
    keywords: &'a [&'a str],
) -> impl Iterator<Item = &'a str> + 'a {
    details
        .messages
        .iter()
        .filter(|message| is_assistant(message))
        .map(|message| message.content.trim())
        .filter(move |content| !content.is_empty() && mentions_any(content, keywords))
}

/// Finds a practice line in the call output.
///
/// Prefers the first matching assistant message; otherwise scans the raw
/// transcript for `Assistant:` lines.
pub fn extract_line(details: &CallDetails) -> Option<String> {
    if let Some(content) = assistant_matches(details, &LINE_KEYWORDS).next() {
        return Some(content.to_string());
    }

    let transcript = details.transcript.as_deref()?;
    transcript
        .lines()
        .filter_map(|line| line.trim().strip_prefix(TRANSCRIPT_SPEAKER_PREFIX))
        .map(str::trim)
        .find(|spoken| !spoken.is_empty() && mentions_any(spoken, &LINE_KEYWORDS))
        .map(str::to_string)
}

/// Finds feedback and an exercise description in the call output.
///
/// Later assistant turns win over earlier ones.
pub fn extract_exercise(details: &CallDetails) -> ExtractedExercise {
    ExtractedExercise {
        feedback: assistant_matches(details, &FEEDBACK_KEYWORDS)
            .last()
            .map(str::to_string),
        exercise: assistant_matches(details, &EXERCISE_KEYWORDS)
            .last()
            .map(str::to_string),
    }
}

/// Derives up to three follow-up suggestions from feedback text.
pub fn recommendations(feedback: &str) -> Vec<String> {
    let lowered = feedback.to_lowercase();
    let mut found: Vec<String> = [
        ("breath", "Focus on breath control exercises"),
        ("pitch", "Practice pitch accuracy with scales"),
        ("vibrato", "Work on vibrato control techniques"),
        ("range", "Gradually expand your vocal range"),
    ]
    .iter()
    .filter(|(keyword, _)| lowered.contains(keyword))
    .map(|(_, suggestion)| suggestion.to_string())
    .collect();

    if found.is_empty() {
        found = vec![
            "Continue regular practice sessions".to_string(),
            "Focus on proper breathing technique".to_string(),
            "Record yourself to track progress".to_string(),
        ];
    }

    found.truncate(MAX_RECOMMENDATIONS);
    found
}
