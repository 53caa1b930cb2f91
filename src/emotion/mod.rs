//! Shared emotion vocabulary and the normalized classifier output.
//!
//! Every classifier adapter, the fusion engine and the catalog tagging scheme
//! speak the same closed set of labels defined here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Fearful,
    Surprised,
    Disgusted,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Surprised,
        Emotion::Disgusted,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Surprised => "surprised",
            Emotion::Disgusted => "disgusted",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEmotion(pub String);

impl fmt::Display for UnknownEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown emotion label \"{}\"", self.0)
    }
}

impl std::error::Error for UnknownEmotion {}

/// Parses a label case-insensitively. Aliases commonly emitted by off-the-shelf
/// classifiers (e.g. "fear", "surprise", "joy") map onto the canonical labels.
impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let emotion = match normalized.as_str() {
            "happy" | "happiness" | "joy" | "joyful" => Emotion::Happy,
            "sad" | "sadness" => Emotion::Sad,
            "angry" | "anger" => Emotion::Angry,
            "fearful" | "fear" | "scared" => Emotion::Fearful,
            "surprised" | "surprise" => Emotion::Surprised,
            "disgusted" | "disgust" => Emotion::Disgusted,
            "neutral" | "calm" => Emotion::Neutral,
            _ => return Err(UnknownEmotion(s.to_string())),
        };
        Ok(emotion)
    }
}

/// Input channel a signal was derived from. Declaration order is also the
/// fixed priority used to break fusion ties: face > audio > text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Face,
    Audio,
    Text,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Face, Modality::Audio, Modality::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Face => "face",
            Modality::Audio => "audio",
            Modality::Text => "text",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// A normalized classifier output.
///
/// A signal always carries a label and a confidence. A modality whose input
/// was missing, or whose classifier failed, is represented by
/// [`EmotionSignal::unavailable`] with `observed == false`, never by absence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionSignal {
    pub modality: Modality,
    #[serde(rename = "emotion")]
    pub label: Emotion,
    pub confidence: f64,
    pub observed: bool,
}

impl EmotionSignal {
    /// A signal produced by an actual classifier run. Confidence is clamped
    /// into [0, 1]; NaN becomes 0.
    pub fn observed(modality: Modality, label: Emotion, confidence: f64) -> Self {
        EmotionSignal {
            modality,
            label,
            confidence: clamp_unit(confidence),
            observed: true,
        }
    }

    /// The neutral prior used when a modality has no usable input.
    pub fn unavailable(modality: Modality) -> Self {
        EmotionSignal {
            modality,
            label: Emotion::Neutral,
            confidence: DEFAULT_CONFIDENCE,
            observed: false,
        }
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
