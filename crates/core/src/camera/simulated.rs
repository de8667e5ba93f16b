use crate::camera::{CameraError, CameraSource, CameraStream, VideoConstraints};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Camera that hands out synthetic streams. Frames are never produced; the
/// mood sampler does not look at them.
#[derive(Clone)]
pub struct SimulatedCamera {
    failure: Arc<Mutex<Option<CameraError>>>,
    open_streams: Arc<AtomicUsize>,
    acquisitions: Arc<AtomicUsize>,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self {
            failure: Arc::new(Mutex::new(None)),
            open_streams: Arc::new(AtomicUsize::new(0)),
            acquisitions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A camera that refuses every acquisition with `error`.
    pub fn failing(error: CameraError) -> Self {
        let camera = Self::new();
        camera.set_failure(Some(error));
        camera
    }

    pub fn set_failure(&self, error: Option<CameraError>) {
        let mut guard = match self.failure.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = error;
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    fn current_failure(&self) -> Option<CameraError> {
        match self.failure.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSource for SimulatedCamera {
    fn acquire(
        &self,
        constraints: VideoConstraints,
    ) -> BoxFuture<'_, Result<CameraStream, CameraError>> {
        async move {
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.current_failure() {
                return Err(err);
            }

            self.open_streams.fetch_add(1, Ordering::SeqCst);
            let open = self.open_streams.clone();
            let label = format!(
                "simulated {}x{} {:?}",
                constraints.width, constraints.height, constraints.facing
            );
            Ok(CameraStream::new(label).on_stop(move || {
                open.fetch_sub(1, Ordering::SeqCst);
            }))
        }
        .boxed()
    }
}
