//! Voice classification and acoustic measurement definitions.
//!
//! This module defines the input consumed by every generation tier. A
//! `VoiceMetrics` value is produced upstream by the audio analysis step and is
//! treated as read-only from then on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pitch below which a voice is classified as bass (Hz).
const BASS_CEILING_HZ: f64 = 250.0;
/// Pitch below which a voice is classified as baritone (Hz).
const BARITONE_CEILING_HZ: f64 = 300.0;
/// Pitch below which a voice is classified as tenor (Hz).
const TENOR_CEILING_HZ: f64 = 350.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Vocal classification of a singer.
///
/// Known classifications serialize as their lower-case name. Anything else is
/// preserved verbatim in `Other` so it can still be echoed back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VoiceType {
    Soprano,
    Alto,
    Tenor,
    Baritone,
    Bass,
    /// A classification outside the known set.
    Other(String),
}

impl VoiceType {
    /// Returns the canonical label for this voice type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Soprano => "soprano",
            Self::Alto => "alto",
            Self::Tenor => "tenor",
            Self::Baritone => "baritone",
            Self::Bass => "bass",
            Self::Other(label) => label,
        }
    }

    /// Returns `true` if this is one of the known classifications.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Classifies a voice from its mean fundamental frequency.
    pub fn from_mean_pitch(mean_pitch_hz: f64) -> Self {
        if mean_pitch_hz < BASS_CEILING_HZ {
            Self::Bass
        } else if mean_pitch_hz < BARITONE_CEILING_HZ {
            Self::Baritone
        } else if mean_pitch_hz < TENOR_CEILING_HZ {
            Self::Tenor
        } else {
            Self::Alto
        }
    }
}

impl From<String> for VoiceType {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "soprano" => Self::Soprano,
            "alto" => Self::Alto,
            "tenor" => Self::Tenor,
            "baritone" => Self::Baritone,
            "bass" => Self::Bass,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for VoiceType {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<VoiceType> for String {
    fn from(voice_type: VoiceType) -> Self {
        match voice_type {
            VoiceType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for VoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acoustic measurements of a single recording plus its voice classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceMetrics {
    /// Mean fundamental frequency in Hz.
    pub mean_pitch: f64,
    /// Vibrato rate as reported by the analyzer.
    pub vibrato_rate: f64,
    /// Pitch perturbation.
    pub jitter: f64,
    /// Amplitude perturbation.
    pub shimmer: f64,
    /// Dynamics category (e.g. "stable", "variable", "expressive").
    pub dynamics: String,
    pub voice_type: VoiceType,
    /// Lowest note sung, in scientific pitch notation.
    pub lowest_note: String,
    /// Highest note sung, in scientific pitch notation.
    pub highest_note: String,
}

/// Converts a frequency to the nearest equal-tempered note name (A4 = 440 Hz).
///
/// Non-positive or non-finite frequencies map to `"C3"`.
pub fn frequency_to_note(frequency_hz: f64) -> String {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return "C3".to_string();
    }

    let c0 = 440.0 * 2f64.powf(-4.75);
    let half_steps = (12.0 * (frequency_hz / c0).log2()).round() as i64;
    let octave = half_steps.div_euclid(12);
    let index = half_steps.rem_euclid(12) as usize;

    format!("{}{}", NOTE_NAMES[index], octave)
}
