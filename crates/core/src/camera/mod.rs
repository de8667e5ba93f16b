mod simulated;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use simulated::SimulatedCamera;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            facing: FacingMode::User,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera available")]
    Unsupported,
    #[error("camera failed: {0}")]
    Device(String),
}

/// A live video stream. Dropping it stops every track.
pub struct CameraStream {
    label: String,
    live: bool,
    on_stop: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CameraStream {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            live: true,
            on_stop: None,
        }
    }

    /// Runs `f` once, the first time the stream is stopped.
    pub fn on_stop(mut self, f: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn stop(&mut self) {
        if self.live {
            self.live = false;
            tracing::debug!(label = %self.label, "camera stream stopped");
            if let Some(f) = self.on_stop.take() {
                f();
            }
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for CameraStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraStream")
            .field("label", &self.label)
            .field("live", &self.is_live())
            .finish()
    }
}

pub trait CameraSource: Send + Sync {
    fn acquire(
        &self,
        constraints: VideoConstraints,
    ) -> BoxFuture<'_, Result<CameraStream, CameraError>>;
}
