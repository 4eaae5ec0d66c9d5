//! Shared types for the Vocalis coaching platform.
//!
//! This crate provides the data model exchanged between the generation
//! pipeline and its callers: the acoustic input (`VoiceMetrics`), the
//! closed vocabularies used by exercise recommendations (`TargetFocus`,
//! `Difficulty`), and the result envelopes returned by every generation
//! operation.
//!
//! Every result records which tier produced it, both as a structured
//! [`GenerationTier`] and as the prefix of its session identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod voice;

pub use voice::{frequency_to_note, VoiceMetrics, VoiceType};

/// The tier of the generation pipeline that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTier {
    /// The remote voice-AI agent.
    Vapi,
    /// The deterministic rule-based generator.
    Fallback,
}

impl GenerationTier {
    /// Returns the identifier prefix for this tier.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Vapi => "vapi",
            Self::Fallback => "fallback",
        }
    }

    /// Builds a session identifier of the form `<tier>_<user>_<timestamp>`.
    pub fn session_id(self, user_id: &str, timestamp_millis: i64) -> String {
        format!("{}_{}_{}", self.prefix(), user_id, timestamp_millis)
    }

    /// Recovers the tier from a prefixed identifier.
    ///
    /// Returns `None` if the identifier carries no known prefix.
    pub fn from_id(id: &str) -> Option<Self> {
        let (prefix, _) = id.split_once('_')?;
        match prefix {
            "vapi" => Some(Self::Vapi),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

impl fmt::Display for GenerationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Pedagogical category an exercise is chosen to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFocus {
    BreathControl,
    PitchStability,
    PitchAccuracy,
    AdvancedTechnique,
    VolumeControl,
    VibratoControl,
    VibratoDevelopment,
}

impl TargetFocus {
    /// Returns the snake_case label for this focus.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BreathControl => "breath_control",
            Self::PitchStability => "pitch_stability",
            Self::PitchAccuracy => "pitch_accuracy",
            Self::AdvancedTechnique => "advanced_technique",
            Self::VolumeControl => "volume_control",
            Self::VibratoControl => "vibrato_control",
            Self::VibratoDevelopment => "vibrato_development",
        }
    }
}

impl fmt::Display for TargetFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exercise difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A practice exercise recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub title: String,
    pub description: String,
    /// Suggested practice time in seconds. Always greater than zero.
    pub duration_seconds: u32,
    pub target_focus: TargetFocus,
    pub difficulty: Difficulty,
}

/// Result of a practice-line generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeLineResult {
    /// Always `true`; the pipeline has no user-visible failure state.
    pub success: bool,
    pub custom_line: String,
    /// Locally generated correlation token, `<tier>_<userId>_<timestamp>`.
    pub session_id: String,
    /// Remote call identifier, present only when the remote tier answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub tier: GenerationTier,
}

/// Result of an exercise generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseResult {
    /// Always `true`; the pipeline has no user-visible failure state.
    pub success: bool,
    pub feedback: String,
    pub exercise: Exercise,
    /// Remote call identifier, present only when the remote tier answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub tier: GenerationTier,
    /// Final focus produced by the threshold ladders.
    ///
    /// May differ from `exercise.target_focus` when no exercise template
    /// exists for the assessed focus.
    pub assessed_focus: TargetFocus,
    /// Short follow-up suggestions derived from the feedback text.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_carries_tier_prefix() {
        let id = GenerationTier::Fallback.session_id("user42", 1_700_000_000_000);
        assert_eq!(id, "fallback_user42_1700000000000");
        assert_eq!(GenerationTier::from_id(&id), Some(GenerationTier::Fallback));

        let id = GenerationTier::Vapi.session_id("abc", 1);
        assert_eq!(id, "vapi_abc_1");
        assert_eq!(GenerationTier::from_id(&id), Some(GenerationTier::Vapi));
    }

    #[test]
    fn unknown_prefix_has_no_tier() {
        assert_eq!(GenerationTier::from_id("session_1_2"), None);
        assert_eq!(GenerationTier::from_id("vapi"), None);
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&TargetFocus::VibratoDevelopment).unwrap(),
            "\"vibrato_development\""
        );
        assert_eq!(
            serde_json::to_string(&Difficulty::Beginner).unwrap(),
            "\"beginner\""
        );
        assert_eq!(
            serde_json::to_string(&GenerationTier::Vapi).unwrap(),
            "\"vapi\""
        );
    }

    #[test]
    fn labels_match_serialization() {
        for focus in [
            TargetFocus::BreathControl,
            TargetFocus::PitchStability,
            TargetFocus::PitchAccuracy,
            TargetFocus::AdvancedTechnique,
            TargetFocus::VolumeControl,
            TargetFocus::VibratoControl,
            TargetFocus::VibratoDevelopment,
        ] {
            let json = serde_json::to_string(&focus).unwrap();
            assert_eq!(json, format!("\"{}\"", focus.as_str()));
        }
    }

    #[test]
    fn absent_call_id_is_omitted() {
        let result = PracticeLineResult {
            success: true,
            custom_line: "La la la".to_string(),
            session_id: "fallback_u_1".to_string(),
            call_id: None,
            tier: GenerationTier::Fallback,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("call_id").is_none());
        assert_eq!(value["tier"], "fallback");
    }
}
