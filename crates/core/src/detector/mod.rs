use crate::camera::{CameraError, CameraSource, CameraStream, VideoConstraints};
use crate::mood::{EmotionPrediction, GateDecision, MoodCategory, MoodGate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

const LOG_TARGET: &str = "detector";

pub const CAMERA_UNAVAILABLE: &str = "Camera access denied or unavailable";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectorState {
    Inactive,
    Active,
    Analyzing,
}

/// Snapshot of the detector for rendering.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DetectorStatus {
    pub state: DetectorState,
    pub displayed: MoodCategory,
    pub confidence: Option<f32>,
    pub high_confidence: bool,
    /// Set while the camera could not be acquired; a retry clears it.
    pub unavailable: Option<String>,
}

/// Camera-backed mood detector.
///
/// Owns the camera stream for as long as it is active. Predictions are
/// produced elsewhere (see [`crate::mood::EmotionSampler`]) and fed back via
/// [`MoodDetector::complete_analysis`], so the detector itself never waits.
pub struct MoodDetector {
    camera: Arc<dyn CameraSource>,
    constraints: VideoConstraints,
    stream: Option<CameraStream>,
    state: DetectorState,
    gate: MoodGate,
    confidence: Option<f32>,
    unavailable: Option<String>,
}

impl MoodDetector {
    pub fn new(camera: Arc<dyn CameraSource>, gate: MoodGate) -> Self {
        Self {
            camera,
            constraints: VideoConstraints::default(),
            stream: None,
            state: DetectorState::Inactive,
            gate,
            confidence: None,
            unavailable: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != DetectorState::Inactive
    }

    pub fn displayed(&self) -> MoodCategory {
        self.gate.displayed()
    }

    pub async fn start(&mut self) -> Result<(), CameraError> {
        if self.is_active() {
            return Ok(());
        }

        let acquired = self.camera.acquire(self.constraints).await;
        match acquired {
            Ok(stream) => {
                tracing::info!(target: LOG_TARGET, label = %stream.label(), "camera acquired");
                self.stream = Some(stream);
                self.state = DetectorState::Active;
                self.unavailable = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "camera unavailable");
                self.state = DetectorState::Inactive;
                self.unavailable = Some(CAMERA_UNAVAILABLE.to_owned());
                Err(e)
            }
        }
    }

    /// Manual retry offered by the unavailable panel.
    pub async fn retry(&mut self) -> Result<(), CameraError> {
        self.unavailable = None;
        self.start().await
    }

    /// Stops every track and drops back to inactive.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        self.state = DetectorState::Inactive;
    }

    /// Marks an analysis as in flight. Returns false when the tick should be
    /// skipped: the camera is off or a previous analysis has not finished.
    pub fn begin_analysis(&mut self) -> bool {
        if self.state != DetectorState::Active {
            return false;
        }
        self.state = DetectorState::Analyzing;
        true
    }

    pub fn complete_analysis(
        &mut self,
        prediction: EmotionPrediction,
        now: Instant,
    ) -> GateDecision {
        if self.state != DetectorState::Analyzing {
            tracing::debug!(target: LOG_TARGET, "dropping prediction for stopped detector");
            return GateDecision::Unchanged;
        }
        self.state = DetectorState::Active;
        self.confidence = Some(prediction.confidence);

        let decision = self.gate.observe(prediction, now);
        tracing::debug!(
            target: LOG_TARGET,
            emotion = %prediction.emotion,
            confidence = prediction.confidence,
            ?decision,
            "analysis complete"
        );
        decision
    }

    pub fn abandon_analysis(&mut self) {
        if self.state == DetectorState::Analyzing {
            self.state = DetectorState::Active;
        }
    }

    pub fn status(&self) -> DetectorStatus {
        DetectorStatus {
            state: self.state,
            displayed: self.gate.displayed(),
            confidence: self.confidence,
            high_confidence: self
                .confidence
                .map(|c| self.gate.is_confident(c))
                .unwrap_or(false),
            unavailable: self.unavailable.clone(),
        }
    }
}

impl Drop for MoodDetector {
    fn drop(&mut self) {
        self.stop();
    }
}
