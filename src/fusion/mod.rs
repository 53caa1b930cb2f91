//! Multimodal fusion.
//!
//! Reduces one [`EmotionSignal`] per modality to a single [`FusionResult`]
//! through weighted confidence voting. The reduction is pure and total: there
//! is no error path, missing inputs are already represented upstream as the
//! neutral prior.

use crate::emotion::{clamp_unit, Emotion, EmotionSignal, Modality};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const SCORE_EPSILON: f64 = 1e-9;
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-modality reliability weights. Must be non-negative and sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModalityWeights {
    pub face: f64,
    pub audio: f64,
    pub text: f64,
}

impl Default for ModalityWeights {
    fn default() -> Self {
        ModalityWeights {
            face: 0.40,
            audio: 0.35,
            text: 0.25,
        }
    }
}

impl ModalityWeights {
    pub fn new(face: f64, audio: f64, text: f64) -> Result<Self> {
        let weights = ModalityWeights { face, audio, text };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        for modality in Modality::ALL {
            let weight = self.weight(modality);
            if !weight.is_finite() || weight < 0.0 {
                bail!("Weight for {} must be a non-negative number, got {}", modality, weight);
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            bail!("Modality weights must sum to 1.0, got {}", sum);
        }
        Ok(())
    }

    pub fn weight(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Face => self.face,
            Modality::Audio => self.audio,
            Modality::Text => self.text,
        }
    }

    pub fn sum(&self) -> f64 {
        self.face + self.audio + self.text
    }
}

/// Outcome of one fusion run, immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusionResult {
    pub final_emotion: Emotion,
    #[serde(rename = "final_confidence")]
    pub confidence: f64,
    pub face: EmotionSignal,
    pub audio: EmotionSignal,
    pub text: EmotionSignal,
}

#[derive(Clone, Debug)]
pub struct FusionEngine {
    weights: ModalityWeights,
}

impl FusionEngine {
    pub fn new(weights: ModalityWeights) -> Self {
        FusionEngine { weights }
    }

    /// Fuses the three modality signals.
    ///
    /// When at least one signal is observed, unobserved signals neither vote
    /// nor count towards the normalization denominator. When none is observed
    /// all three neutral priors vote, which resolves to neutral at 0.5.
    ///
    /// Ties on score go to the label backed by the single most confident
    /// voter, then to the label of the earliest modality (face, audio, text).
    pub fn fuse(
        &self,
        face: EmotionSignal,
        audio: EmotionSignal,
        text: EmotionSignal,
    ) -> FusionResult {
        let (final_emotion, confidence) = {
            let signals = [&face, &audio, &text];
            let any_observed = signals.iter().any(|s| s.observed);
            let voters: Vec<(Modality, &EmotionSignal)> = Modality::ALL
                .into_iter()
                .zip(signals)
                .filter(|(_, signal)| signal.observed || !any_observed)
                .collect();
            self.vote(&voters)
        };

        FusionResult {
            final_emotion,
            confidence,
            face,
            audio,
            text,
        }
    }

    fn vote(&self, voters: &[(Modality, &EmotionSignal)]) -> (Emotion, f64) {
        let mut scores = [0.0f64; Emotion::ALL.len()];
        for (modality, signal) in voters {
            scores[emotion_index(signal.label)] += self.weights.weight(*modality) * signal.confidence;
        }

        let best_score = scores.iter().copied().fold(0.0f64, f64::max);
        if best_score <= SCORE_EPSILON {
            return (Emotion::Neutral, 0.0);
        }

        let tied: Vec<Emotion> = Emotion::ALL
            .into_iter()
            .filter(|e| (best_score - scores[emotion_index(*e)]).abs() <= SCORE_EPSILON)
            .collect();

        let winner = if tied.len() == 1 {
            tied[0]
        } else {
            let mut ranked: Vec<&(Modality, &EmotionSignal)> = voters
                .iter()
                .filter(|(_, signal)| tied.contains(&signal.label))
                .collect();
            ranked.sort_by(|(m1, s1), (m2, s2)| {
                s2.confidence.total_cmp(&s1.confidence).then(m1.cmp(m2))
            });
            ranked
                .first()
                .map(|(_, signal)| signal.label)
                .unwrap_or(tied[0])
        };

        let denominator: f64 = voters
            .iter()
            .map(|(modality, _)| self.weights.weight(*modality))
            .sum();
        let confidence = if denominator > 0.0 {
            clamp_unit(best_score / denominator)
        } else {
            0.0
        };

        (winner, confidence)
    }
}

fn emotion_index(emotion: Emotion) -> usize {
    Emotion::ALL
        .iter()
        .position(|e| *e == emotion)
        .unwrap_or(Emotion::ALL.len() - 1)
}
