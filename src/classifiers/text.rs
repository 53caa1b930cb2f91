use super::{ClassifierError, EmotionClassifier, ModalityInput};
use crate::emotion::{Emotion, EmotionSignal, Modality, DEFAULT_CONFIDENCE};
use async_trait::async_trait;
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

const HAPPY_WORDS: &[&str] = &[
    "happy", "happier", "happiest", "glad", "joy", "joyful", "thrilled", "excited", "exciting",
    "delighted", "great", "awesome", "amazing", "wonderful", "fantastic", "love", "loved",
    "loving", "cheerful", "fun", "good", "pleased", "ecstatic", "elated", "grateful", "yay",
];
const SAD_WORDS: &[&str] = &[
    "sad", "sadder", "unhappy", "depressed", "down", "miserable", "lonely", "heartbroken",
    "cry", "crying", "cried", "tears", "gloomy", "blue", "upset", "grief", "hopeless", "lost",
    "tired", "empty", "sorry",
];
const ANGRY_WORDS: &[&str] = &[
    "angry", "mad", "furious", "annoyed", "irritated", "hate", "hated", "rage", "pissed",
    "frustrated", "frustrating", "outraged", "livid", "resent",
];
const FEARFUL_WORDS: &[&str] = &[
    "scared", "afraid", "fear", "frightened", "terrified", "anxious", "nervous", "worried",
    "worry", "panic", "panicking", "dread", "uneasy", "creepy",
];
const SURPRISED_WORDS: &[&str] = &[
    "surprised", "surprise", "shocked", "astonished", "amazed", "stunned", "unexpected", "wow",
    "whoa",
];
const DISGUSTED_WORDS: &[&str] = &[
    "disgusted", "disgusting", "gross", "nasty", "revolting", "sick", "yuck", "awful",
    "repulsive",
];
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "don't", "dont", "isn't", "wasn't", "aren't", "can't", "cannot",
    "didn't", "doesn't", "hardly", "without", "neither", "nor",
];

/// How many preceding words a negation reaches.
const NEGATION_WINDOW: usize = 3;

/// Keyword-counting text classifier.
///
/// Each lexicon hit votes for its emotion. A negated happy word votes sad,
/// other negated hits are dropped. Confidence grows with how dominant the top
/// emotion is among all hits: `0.5 + 0.4 * top / total`.
pub struct LexiconTextClassifier {
    lexicon: HashMap<&'static str, Emotion>,
}

impl Default for LexiconTextClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconTextClassifier {
    pub fn new() -> Self {
        let groups: [(&[&'static str], Emotion); 6] = [
            (HAPPY_WORDS, Emotion::Happy),
            (SAD_WORDS, Emotion::Sad),
            (ANGRY_WORDS, Emotion::Angry),
            (FEARFUL_WORDS, Emotion::Fearful),
            (SURPRISED_WORDS, Emotion::Surprised),
            (DISGUSTED_WORDS, Emotion::Disgusted),
        ];
        let lexicon = groups
            .into_iter()
            .flat_map(|(words, emotion)| words.iter().map(move |w| (*w, emotion)))
            .collect();
        LexiconTextClassifier { lexicon }
    }

    pub fn classify(&self, text: &str) -> EmotionSignal {
        let words: Vec<String> = text
            .unicode_words()
            .map(|w| w.to_lowercase().replace('\u{2019}', "'"))
            .collect();

        let mut hits: HashMap<Emotion, usize> = HashMap::new();
        for (i, word) in words.iter().enumerate() {
            let Some(&emotion) = self.lexicon.get(word.as_str()) else {
                continue;
            };
            let negated = words[i.saturating_sub(NEGATION_WINDOW)..i]
                .iter()
                .any(|w| NEGATIONS.contains(&w.as_str()));
            let vote = match (negated, emotion) {
                (false, emotion) => emotion,
                (true, Emotion::Happy) => Emotion::Sad,
                (true, _) => continue,
            };
            *hits.entry(vote).or_default() += 1;
        }

        let total: usize = hits.values().sum();
        if total == 0 {
            return EmotionSignal::observed(Modality::Text, Emotion::Neutral, DEFAULT_CONFIDENCE);
        }

        // Ties resolve to the earliest label in vocabulary order.
        let (top_emotion, top_hits) = Emotion::ALL
            .into_iter()
            .map(|e| (e, hits.get(&e).copied().unwrap_or(0)))
            .fold((Emotion::Neutral, 0), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        let confidence = 0.5 + 0.4 * (top_hits as f64 / total as f64);
        EmotionSignal::observed(Modality::Text, top_emotion, confidence)
    }
}

#[async_trait]
impl EmotionClassifier for LexiconTextClassifier {
    fn modality(&self) -> Modality {
        Modality::Text
    }

    async fn analyze(&self, input: &ModalityInput) -> Result<EmotionSignal, ClassifierError> {
        match input {
            ModalityInput::Text(text) if !text.trim().is_empty() => Ok(self.classify(text)),
            ModalityInput::Text(_) => Err(ClassifierError::UnsupportedInput {
                modality: Modality::Text,
                detail: "empty text".to_string(),
            }),
            other => Err(ClassifierError::UnsupportedInput {
                modality: Modality::Text,
                detail: format!("expected text, got {} input", other.modality()),
            }),
        }
    }
}
