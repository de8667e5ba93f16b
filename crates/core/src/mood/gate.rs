use crate::mood::{EmotionPrediction, MoodCategory};
use std::time::{Duration, Instant};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;
pub const DEFAULT_MOOD_COOLDOWN: Duration = Duration::from_millis(3000);

/// Outcome of feeding one prediction through the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Confident, different and outside the cooldown: the displayed mood flips.
    Accepted(MoodCategory),
    /// Low confidence while showing a non-neutral mood.
    ForcedNeutral,
    Unchanged,
}

impl GateDecision {
    /// Mood to report upward, if the displayed mood moved.
    pub fn changed_mood(&self) -> Option<MoodCategory> {
        match self {
            GateDecision::Accepted(mood) => Some(*mood),
            GateDecision::ForcedNeutral => Some(MoodCategory::Neutral),
            GateDecision::Unchanged => None,
        }
    }
}

/// Hysteresis between raw predictions and the displayed mood.
///
/// A flip needs confidence at or above the threshold, a mood different from
/// the one on display and at least `cooldown` since the last accepted flip.
/// A low-confidence reading drops the display back to neutral without
/// touching the cooldown timestamp.
#[derive(Clone, Debug)]
pub struct MoodGate {
    threshold: f32,
    cooldown: Duration,
    displayed: MoodCategory,
    last_accepted: MoodCategory,
    last_change: Option<Instant>,
}

impl Default for MoodGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MOOD_COOLDOWN)
    }
}

impl MoodGate {
    pub fn new(threshold: f32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            displayed: MoodCategory::Neutral,
            last_accepted: MoodCategory::Neutral,
            last_change: None,
        }
    }

    pub fn displayed(&self) -> MoodCategory {
        self.displayed
    }

    pub fn last_accepted(&self) -> MoodCategory {
        self.last_accepted
    }

    pub fn last_change(&self) -> Option<Instant> {
        self.last_change
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_confident(&self, confidence: f32) -> bool {
        confidence >= self.threshold
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.last_change {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.cooldown,
        }
    }

    pub fn observe(&mut self, prediction: EmotionPrediction, now: Instant) -> GateDecision {
        if self.is_confident(prediction.confidence) {
            if prediction.emotion != self.displayed && self.cooldown_elapsed(now) {
                self.displayed = prediction.emotion;
                self.last_accepted = prediction.emotion;
                self.last_change = Some(now);
                return GateDecision::Accepted(prediction.emotion);
            }
            return GateDecision::Unchanged;
        }

        if self.displayed != MoodCategory::Neutral {
            self.displayed = MoodCategory::Neutral;
            return GateDecision::ForcedNeutral;
        }
        GateDecision::Unchanged
    }
}
