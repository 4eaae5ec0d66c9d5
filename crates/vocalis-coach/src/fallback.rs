//! Deterministic, network-free generation of practice lines and exercises.
//!
//! Exercise selection runs three threshold ladders (jitter, shimmer, vibrato)
//! in a fixed order. Each ladder appends one feedback clause and may
//! overwrite the running target focus, so a later ladder wins over an earlier
//! one. Difficulty is only ever set by the jitter ladder. Recommendations come
//! from the rungs that fired, not from the feedback wording.

use rand::seq::SliceRandom;
use rand::Rng;
use vocalis_types::{
    Difficulty, Exercise, ExerciseResult, GenerationTier, TargetFocus, VoiceMetrics, VoiceType,
};

const SOPRANO_LINES: [&str; 3] = [
    "The morning light dances softly on the silver sea",
    "Stars are singing in the velvet sky tonight",
    "Let my voice rise like a bird upon the breeze",
];

const ALTO_LINES: [&str; 3] = [
    "Deep within the quiet woods the river hums its song",
    "Warm and steady is the fire that guides me home",
    "Every shadow holds a melody waiting to be heard",
];

const TENOR_LINES: [&str; 3] = [
    "Over the hills the golden sun is rising high",
    "I will carry this song across the open plains",
    "Bright and clear the bells ring out across the town",
];

const BARITONE_LINES: [&str; 3] = [
    "Steady as the mountain stands against the storm",
    "The old road winds beneath a sky of amber gold",
    "Strong and warm the voice that calls across the valley",
];

const BASS_LINES: [&str; 3] = [
    "Down in the deep the ocean rolls its ancient drum",
    "The thunder speaks in low and steady tones",
    "Beneath the earth the roots of mountains hum",
];

/// Which measurement a ladder reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    Jitter,
    Shimmer,
    VibratoRate,
}

impl Measure {
    fn read(self, metrics: &VoiceMetrics) -> f64 {
        match self {
            Self::Jitter => metrics.jitter,
            Self::Shimmer => metrics.shimmer,
            Self::VibratoRate => metrics.vibrato_rate,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Jitter => "jitter",
            Self::Shimmer => "shimmer",
            Self::VibratoRate => "vibrato rate",
        }
    }
}

/// One rung of a ladder: fires when the measure is strictly above
/// `above`, or unconditionally when `above` is `None`.
struct Rung {
    above: Option<f64>,
    clause: &'static str,
    focus: Option<TargetFocus>,
    difficulty: Option<Difficulty>,
    advice: Option<&'static str>,
}

/// Used when no rung asks for corrective work.
const MAINTENANCE_ADVICE: [&str; 2] = [
    "Gradually expand your vocal range",
    "Record yourself to track progress",
];

struct Ladder {
    measure: Measure,
    rungs: &'static [Rung],
}

impl Ladder {
    fn select(&self, metrics: &VoiceMetrics) -> Option<&Rung> {
        let value = self.measure.read(metrics);
        self.rungs
            .iter()
            .find(|rung| rung.above.map_or(true, |threshold| value > threshold))
    }
}

// Order is load-bearing: each ladder's focus overwrites the previous one.
// The vibrato ladder can replace a volume_control focus set by shimmer; kept
// for compatibility with existing clients.
const LADDERS: [Ladder; 3] = [
    Ladder {
        measure: Measure::Jitter,
        rungs: &[
            Rung {
                above: Some(2.0),
                clause: "Your pitch is unstable and wavers noticeably on sustained notes",
                focus: Some(TargetFocus::PitchStability),
                difficulty: Some(Difficulty::Beginner),
                advice: Some("Hold sustained tones against a drone to steady your pitch"),
            },
            Rung {
                above: Some(1.0),
                clause: "Your pitch stability is moderate, with some drift on longer notes",
                focus: Some(TargetFocus::PitchAccuracy),
                difficulty: None,
                advice: Some("Practice pitch accuracy with scales"),
            },
            Rung {
                above: None,
                clause: "Your pitch stability is good and your notes hold steady",
                focus: Some(TargetFocus::AdvancedTechnique),
                difficulty: Some(Difficulty::Advanced),
                advice: None,
            },
        ],
    },
    Ladder {
        measure: Measure::Shimmer,
        rungs: &[
            Rung {
                above: Some(3.0),
                clause: "Your volume control needs work, the loudness fluctuates between notes",
                focus: Some(TargetFocus::VolumeControl),
                difficulty: None,
                advice: Some("Focus on breath control exercises"),
            },
            Rung {
                above: Some(1.5),
                clause: "Your volume control is improving",
                focus: None,
                difficulty: None,
                advice: Some("Use slow crescendo and decrescendo swells to even out your volume"),
            },
            Rung {
                above: None,
                clause: "Your volume control is excellent",
                focus: None,
                difficulty: None,
                advice: None,
            },
        ],
    },
    Ladder {
        measure: Measure::VibratoRate,
        rungs: &[
            Rung {
                above: Some(0.8),
                clause: "Your vibrato is well-developed",
                focus: None,
                difficulty: None,
                advice: None,
            },
            Rung {
                above: Some(0.4),
                clause: "Your vibrato is progressing nicely",
                focus: Some(TargetFocus::VibratoControl),
                difficulty: None,
                advice: Some("Work on vibrato control techniques"),
            },
            Rung {
                above: None,
                clause: "Focus on developing a natural vibrato",
                focus: Some(TargetFocus::VibratoDevelopment),
                difficulty: None,
                advice: Some("Practice slow pitch pulses to develop a natural vibrato"),
            },
        ],
    },
];

/// Outcome of running the threshold ladders over a set of metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub feedback: String,
    pub target_focus: TargetFocus,
    pub difficulty: Difficulty,
    /// Advice from each rung that fired, in ladder order.
    pub recommendations: Vec<String>,
}

/// Runs the jitter, shimmer and vibrato ladders in order and appends the
/// voice-range summary.
pub fn assess(metrics: &VoiceMetrics) -> Assessment {
    let mut feedback = String::new();
    let mut target_focus = TargetFocus::PitchStability;
    let mut difficulty = Difficulty::default();
    let mut recommendations = Vec::new();

    for ladder in &LADDERS {
        let Some(rung) = ladder.select(metrics) else {
            continue;
        };
        feedback.push_str(&format!(
            "{} ({} {:.2}). ",
            rung.clause,
            ladder.measure.label(),
            ladder.measure.read(metrics)
        ));
        if let Some(focus) = rung.focus {
            target_focus = focus;
        }
        if let Some(level) = rung.difficulty {
            difficulty = level;
        }
        if let Some(advice) = rung.advice {
            recommendations.push(advice.to_string());
        }
    }

    if recommendations.is_empty() {
        recommendations = MAINTENANCE_ADVICE.iter().map(|a| a.to_string()).collect();
    }

    feedback.push_str(&format!(
        "As a {}, your current range spans {} to {}.",
        metrics.voice_type, metrics.lowest_note, metrics.highest_note
    ));

    Assessment {
        feedback,
        target_focus,
        difficulty,
        recommendations,
    }
}

struct Template {
    focus: TargetFocus,
    title: &'static str,
    description: &'static str,
    duration_seconds: u32,
}

impl Template {
    fn to_exercise(&self) -> Exercise {
        Exercise {
            title: self.title.to_string(),
            description: self.description.to_string(),
            duration_seconds: self.duration_seconds,
            target_focus: self.focus,
            difficulty: Difficulty::Intermediate,
        }
    }
}

const TEMPLATES: [Template; 5] = [
    Template {
        focus: TargetFocus::BreathControl,
        title: "Sustained Breath Control",
        description: "Inhale slowly for four counts, then release a steady 'sss' for as long as \
                      you can keep the airflow even. Rest and repeat five times, lengthening \
                      each exhale.",
        duration_seconds: 300,
    },
    Template {
        focus: TargetFocus::PitchStability,
        title: "Steady Tone Hold",
        description: "Sing a comfortable note on 'ah' and hold it for eight seconds while \
                      keeping the pitch perfectly level. Repeat on five notes moving up the \
                      scale.",
        duration_seconds: 240,
    },
    Template {
        focus: TargetFocus::VibratoControl,
        title: "Vibrato Pulse Training",
        description: "Sustain a note and add slow, even pulses of pitch movement, then speed \
                      them up until they flow into a natural vibrato. Alternate straight tone \
                      and vibrato every four seconds.",
        duration_seconds: 300,
    },
    Template {
        focus: TargetFocus::VolumeControl,
        title: "Messa di Voce",
        description: "Start a note softly, crescendo to a full sound over five seconds, then \
                      decrescendo back to soft over five seconds while keeping the tone even.",
        duration_seconds: 360,
    },
    Template {
        focus: TargetFocus::AdvancedTechnique,
        title: "Agility Runs",
        description: "Sing quick five-note scale runs on 'ah', keeping every note distinct and \
                      in tune. Raise the tempo gradually without losing clarity.",
        duration_seconds: 420,
    },
];

/// Index into `TEMPLATES` used when a focus has no template.
const DEFAULT_TEMPLATE: usize = 1;

/// Returns the exercise template for a focus, or `None` if no template
/// exists for it.
pub fn exercise_template(focus: TargetFocus) -> Option<Exercise> {
    TEMPLATES
        .iter()
        .find(|template| template.focus == focus)
        .map(Template::to_exercise)
}

fn lines_for(voice_type: &VoiceType) -> &'static [&'static str; 3] {
    match voice_type {
        VoiceType::Soprano => &SOPRANO_LINES,
        VoiceType::Alto => &ALTO_LINES,
        VoiceType::Baritone => &BARITONE_LINES,
        VoiceType::Bass => &BASS_LINES,
        VoiceType::Tenor | VoiceType::Other(_) => &TENOR_LINES,
    }
}

/// Picks a practice line suited to the voice type.
///
/// Unknown voice types use the tenor lines.
pub fn fallback_line(voice_type: &VoiceType, mean_pitch: f64) -> String {
    fallback_line_with(&mut rand::thread_rng(), voice_type, mean_pitch)
}

/// Like [`fallback_line`], with a caller-supplied random source.
pub fn fallback_line_with<R: Rng + ?Sized>(
    rng: &mut R,
    voice_type: &VoiceType,
    mean_pitch: f64,
) -> String {
    let lines = lines_for(voice_type);
    tracing::debug!(voice_type = %voice_type, mean_pitch, "selecting fallback practice line");
    lines.choose(rng).copied().unwrap_or(lines[0]).to_string()
}

/// Builds a complete exercise recommendation from the metrics alone.
pub fn fallback_exercise(metrics: &VoiceMetrics, custom_line: &str) -> ExerciseResult {
    let Assessment {
        mut feedback,
        target_focus,
        difficulty,
        recommendations,
    } = assess(metrics);

    let mut exercise = exercise_template(target_focus)
        .unwrap_or_else(|| TEMPLATES[DEFAULT_TEMPLATE].to_exercise());
    exercise.difficulty = difficulty;

    let line = custom_line.trim();
    if !line.is_empty() {
        feedback.push_str(&format!(
            " Bring this focus to your practice line: \"{}\".",
            line
        ));
    }

    ExerciseResult {
        success: true,
        recommendations,
        feedback,
        exercise,
        call_id: None,
        tier: GenerationTier::Fallback,
        assessed_focus: target_focus,
    }
}
