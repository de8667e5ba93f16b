use crate::mood::{EmotionPrediction, MoodCategory};
use futures::future::BoxFuture;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::Mutex;
use std::time::Duration;

/// Confidence range for neutral guesses. Neutral reads as the more certain call.
pub const NEUTRAL_CONFIDENCE: Range<f32> = 0.7..1.0;
/// Confidence range for every other guess.
pub const OTHER_CONFIDENCE: Range<f32> = 0.3..0.9;

#[derive(thiserror::Error, Debug)]
pub enum SampleError {
    #[error("emotion analysis failed: {0}")]
    AnalysisFailed(String),
}

pub trait EmotionSampler: Send + Sync {
    fn predict(&self) -> BoxFuture<'_, Result<EmotionPrediction, SampleError>>;
}

/// Ordered weight table used for cumulative sampling.
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionWeights {
    entries: Vec<(MoodCategory, f64)>,
}

impl Default for EmotionWeights {
    fn default() -> Self {
        Self {
            entries: vec![
                (MoodCategory::Happy, 0.30),
                (MoodCategory::Sad, 0.20),
                (MoodCategory::Neutral, 0.40),
                (MoodCategory::Surprised, 0.05),
                (MoodCategory::Angry, 0.05),
            ],
        }
    }
}

impl EmotionWeights {
    pub fn weight_of(&self, mood: MoodCategory) -> f64 {
        self.entries
            .iter()
            .filter(|(m, _)| *m == mood)
            .map(|(_, w)| *w)
            .sum()
    }

    /// Walks the table accumulating weights and returns the first entry whose
    /// running total reaches `draw`. Falls back to neutral when rounding
    /// leaves the total short of the draw.
    pub fn pick(&self, draw: f64) -> MoodCategory {
        let mut cumulative = 0.0;
        for (mood, weight) in &self.entries {
            cumulative += weight;
            if draw <= cumulative {
                return *mood;
            }
        }
        MoodCategory::Neutral
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> EmotionPrediction {
        let emotion = self.pick(rng.random::<f64>());
        let confidence = if emotion == MoodCategory::Neutral {
            rng.random_range(NEUTRAL_CONFIDENCE)
        } else {
            rng.random_range(OTHER_CONFIDENCE)
        };
        EmotionPrediction::new(emotion, confidence)
    }
}

/// Stand-in for a vision model: draws a weighted random guess after a short
/// simulated processing delay.
pub struct SimulatedEmotionSampler {
    weights: EmotionWeights,
    rng: Mutex<StdRng>,
    processing_delay: Duration,
}

impl SimulatedEmotionSampler {
    pub fn new(processing_delay: Duration) -> Self {
        Self::with_rng(StdRng::from_os_rng(), processing_delay)
    }

    pub fn seeded(seed: u64, processing_delay: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), processing_delay)
    }

    fn with_rng(rng: StdRng, processing_delay: Duration) -> Self {
        Self {
            weights: EmotionWeights::default(),
            rng: Mutex::new(rng),
            processing_delay,
        }
    }

    fn draw(&self) -> Result<EmotionPrediction, SampleError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SampleError::AnalysisFailed("sampler rng lock poisoned".into()))?;
        Ok(self.weights.sample(&mut *rng))
    }
}

impl EmotionSampler for SimulatedEmotionSampler {
    fn predict(&self) -> BoxFuture<'_, Result<EmotionPrediction, SampleError>> {
        async move {
            let prediction = self.draw()?;
            if !self.processing_delay.is_zero() {
                tokio::time::sleep(self.processing_delay).await;
            }
            Ok(prediction)
        }
        .boxed()
    }
}
