mod gate;
mod sampler;

#[cfg(test)]
mod test_mood;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use gate::{GateDecision, MoodGate, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MOOD_COOLDOWN};
pub use sampler::{
    EmotionSampler, EmotionWeights, SampleError, SimulatedEmotionSampler, NEUTRAL_CONFIDENCE,
    OTHER_CONFIDENCE,
};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MoodCategory {
    Happy,
    Sad,
    Angry,
    #[default]
    Neutral,
    Surprised,
}

impl MoodCategory {
    pub const ALL: [MoodCategory; 5] = [
        MoodCategory::Happy,
        MoodCategory::Sad,
        MoodCategory::Angry,
        MoodCategory::Neutral,
        MoodCategory::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodCategory::Happy => "happy",
            MoodCategory::Sad => "sad",
            MoodCategory::Angry => "angry",
            MoodCategory::Neutral => "neutral",
            MoodCategory::Surprised => "surprised",
        }
    }

    /// Icon identifier shown next to the mood label.
    pub fn icon(&self) -> &'static str {
        match self {
            MoodCategory::Happy => "fa-smile",
            MoodCategory::Sad => "fa-frown",
            MoodCategory::Angry => "fa-angry",
            MoodCategory::Surprised => "fa-surprise",
            MoodCategory::Neutral => "fa-meh",
        }
    }
}

impl fmt::Display for MoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mood: {0}")]
pub struct UnknownMood(pub String);

impl FromStr for MoodCategory {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        MoodCategory::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| UnknownMood(s.to_owned()))
    }
}

/// One guess from the detector. Produced per analysis tick and never stored.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionPrediction {
    pub emotion: MoodCategory,
    pub confidence: f32,
}

impl EmotionPrediction {
    pub fn new(emotion: MoodCategory, confidence: f32) -> Self {
        Self {
            emotion,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_parses_case_insensitively() {
        assert_eq!("HAPPY".parse::<MoodCategory>(), Ok(MoodCategory::Happy));
        assert_eq!(" surprised ".parse::<MoodCategory>(), Ok(MoodCategory::Surprised));
        assert!("bored".parse::<MoodCategory>().is_err());
    }

    #[test]
    fn mood_display_matches_as_str() {
        for mood in MoodCategory::ALL {
            assert_eq!(mood.to_string(), mood.as_str());
        }
        assert_eq!(MoodCategory::default(), MoodCategory::Neutral);
    }

    #[test]
    fn every_mood_has_distinct_icon() {
        let mut icons: Vec<_> = MoodCategory::ALL.iter().map(|m| m.icon()).collect();
        icons.sort_unstable();
        icons.dedup();
        assert_eq!(icons.len(), MoodCategory::ALL.len());
    }

    #[test]
    fn prediction_confidence_is_clamped() {
        let p = EmotionPrediction::new(MoodCategory::Sad, 1.4);
        assert_eq!(p.confidence, 1.0);
    }
}
