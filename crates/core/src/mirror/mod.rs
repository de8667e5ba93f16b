#[cfg(test)]
mod test_mirror;

use crate::camera::CameraSource;
use crate::clock::{ClockFace, WallClock};
use crate::config::{ConfigError, MirrorConfig, Timing};
use crate::coordinator::Coordinator;
use crate::detector::{DetectorStatus, MoodDetector};
use crate::mood::{EmotionPrediction, EmotionSampler, MoodCategory, MoodGate, SampleError};
use crate::reveal::{QuoteFrame, Typewriter};
use crate::voice::{
    RecognitionEvent, SpeechError, SpeechRecognizer, SpeechSynthesizer, Utterance,
    VoiceAssistant, VoiceStatus, VOICE_UNSUPPORTED,
};
use crate::weather::{ResolvedWeather, WeatherPanel, WeatherResolver, FETCH_FAILED};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

const LOG_TARGET: &str = "mirror";
const RECOGNITION_BUFFER: usize = 32;
const TYPED_BACKLOG: usize = 8;

/// Requests from outside the loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    ToggleListening,
    /// Text standing in for speech; fed to the recognizer.
    Utterance(String),
    RefreshWeather,
    RetryCamera,
    Shutdown,
}

/// Everything a display needs to redraw one widget.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MirrorEvent {
    Clock(ClockFace),
    Weather(WeatherPanel),
    Detector(DetectorStatus),
    MoodChanged(MoodCategory),
    Quote(QuoteFrame),
    Voice(VoiceStatus),
    Spoken(String),
}

#[derive(thiserror::Error, Debug)]
pub enum MirrorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("event receiver closed")]
    EventsClosed,
}

/// Capabilities the mirror is assembled from.
pub struct MirrorParts {
    pub camera: Arc<dyn CameraSource>,
    pub sampler: Arc<dyn EmotionSampler>,
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
    /// Where typed utterances go; pairs with a recognizer reading lines.
    pub typed_speech: Option<mpsc::Sender<String>>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub weather: WeatherResolver,
    pub clock: Arc<dyn WallClock>,
}

/// Composition root. One task owns every widget; slow work (predictions,
/// weather lookups, playback) runs in spawned tasks joined back into the loop.
pub struct Mirror {
    timing: Timing,
    clock: Arc<dyn WallClock>,
    detector: MoodDetector,
    sampler: Arc<dyn EmotionSampler>,
    coordinator: Coordinator,
    voice: VoiceAssistant,
    recognition: mpsc::Receiver<RecognitionEvent>,
    typed_speech: Option<mpsc::Sender<String>>,
    /// Typed lines not yet handed to the recognizer, oldest first.
    typed_backlog: VecDeque<String>,
    /// A line is with the recognizer and its session has not ended.
    line_in_flight: bool,
    weather: WeatherResolver,
    panel: WeatherPanel,
    typewriter: Typewriter,
    prediction_task: Option<JoinHandle<Result<EmotionPrediction, SampleError>>>,
    weather_task: Option<JoinHandle<ResolvedWeather>>,
    speech_task: Option<JoinHandle<Result<(), SpeechError>>>,
}

async fn emit(events: &mpsc::Sender<MirrorEvent>, event: MirrorEvent) -> Result<(), MirrorError> {
    events.send(event).await.map_err(|_| MirrorError::EventsClosed)
}

/// Resolves when the task in `slot` finishes, emptying the slot. Pending
/// forever while the slot is empty.
async fn join_slot<T>(slot: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    let Some(handle) = slot.as_mut() else {
        return std::future::pending().await;
    };
    let joined = handle.await;
    *slot = None;
    joined
}

fn ticker(period: std::time::Duration, first: Instant) -> Interval {
    let mut interval = time::interval_at(first, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl Mirror {
    pub fn new(config: &MirrorConfig, parts: MirrorParts) -> Result<Self, MirrorError> {
        config.timing.validate()?;

        let gate = MoodGate::new(
            config.confidence_threshold.get(),
            config.timing.mood_cooldown,
        );
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let coordinator = if config.select_initial_quote {
            Coordinator::with_initial_quote(rng, parts.clock.clone())
        } else {
            Coordinator::new(rng, parts.clock.clone())
        };
        let mut typewriter = Typewriter::new();
        if let Some(quote) = coordinator.quote() {
            typewriter.set_target(quote);
        }

        let (recognition_tx, recognition) = mpsc::channel(RECOGNITION_BUFFER);
        let voice = VoiceAssistant::new(parts.recognizer, parts.synthesizer, recognition_tx);

        Ok(Self {
            timing: config.timing,
            clock: parts.clock,
            detector: MoodDetector::new(parts.camera, gate),
            sampler: parts.sampler,
            coordinator,
            voice,
            recognition,
            typed_speech: parts.typed_speech,
            typed_backlog: VecDeque::new(),
            line_in_flight: false,
            weather: parts.weather,
            panel: WeatherPanel::loading(),
            typewriter,
            prediction_task: None,
            weather_task: None,
            speech_task: None,
        })
    }

    /// Runs until `Shutdown`, the control sender is dropped, or nobody is
    /// listening for events any more. The camera and recognizer are released
    /// on every exit path.
    pub async fn run(
        mut self,
        mut controls: mpsc::Receiver<Control>,
        events: mpsc::Sender<MirrorEvent>,
    ) -> Result<(), MirrorError> {
        let result = self.event_loop(&mut controls, &events).await;
        self.teardown();
        result
    }

    async fn event_loop(
        &mut self,
        controls: &mut mpsc::Receiver<Control>,
        events: &mpsc::Sender<MirrorEvent>,
    ) -> Result<(), MirrorError> {
        self.start(events).await?;

        let now = Instant::now();
        let mut clock = ticker(self.timing.clock_tick, now);
        let mut analysis = ticker(
            self.timing.analysis_interval,
            now + self.timing.analysis_interval,
        );
        let mut reveal = ticker(self.timing.reveal_interval, now);

        loop {
            let typing = self.typewriter.is_typing();
            tokio::select! {
                _ = clock.tick() => {
                    let face = ClockFace::at(&self.clock.now());
                    emit(events, MirrorEvent::Clock(face)).await?;
                }
                _ = analysis.tick() => self.begin_analysis(events).await?,
                joined = join_slot(&mut self.prediction_task) => {
                    self.finish_analysis(joined, &mut reveal, events).await?;
                }
                _ = reveal.tick(), if typing => {
                    self.typewriter.step();
                    emit(events, MirrorEvent::Quote(self.typewriter.frame())).await?;
                }
                Some(event) = self.recognition.recv() => self.on_recognition(event, events).await?,
                joined = join_slot(&mut self.speech_task) => {
                    match joined {
                        Ok(Err(e)) => {
                            tracing::warn!(target: LOG_TARGET, error = %e, "speech failed");
                        }
                        Err(e) => {
                            tracing::error!(target: LOG_TARGET, error = %e, "speech task failed");
                        }
                        Ok(Ok(())) => {}
                    }
                    self.voice.finish_speaking();
                    self.deliver_typed();
                    emit(events, MirrorEvent::Voice(self.voice.status())).await?;
                }
                joined = join_slot(&mut self.weather_task) => {
                    self.finish_weather(joined, events).await?;
                }
                control = controls.recv() => match control {
                    None | Some(Control::Shutdown) => {
                        tracing::info!(target: LOG_TARGET, "shutting down");
                        return Ok(());
                    }
                    Some(control) => self.on_control(control, events).await?,
                },
            }
        }
    }

    async fn start(&mut self, events: &mpsc::Sender<MirrorEvent>) -> Result<(), MirrorError> {
        if self.detector.start().await.is_err() {
            tracing::info!(target: LOG_TARGET, "mood detection paused until camera retry");
        }
        emit(events, MirrorEvent::Detector(self.detector.status())).await?;

        self.refresh_weather();
        emit(events, MirrorEvent::Weather(self.panel.clone())).await?;
        emit(events, MirrorEvent::Voice(self.voice.status())).await?;
        emit(events, MirrorEvent::Quote(self.typewriter.frame())).await
    }

    async fn begin_analysis(
        &mut self,
        events: &mpsc::Sender<MirrorEvent>,
    ) -> Result<(), MirrorError> {
        if !self.detector.begin_analysis() {
            return Ok(());
        }
        let sampler = self.sampler.clone();
        self.prediction_task = Some(tokio::spawn(async move { sampler.predict().await }));
        emit(events, MirrorEvent::Detector(self.detector.status())).await
    }

    async fn finish_analysis(
        &mut self,
        joined: Result<Result<EmotionPrediction, SampleError>, JoinError>,
        reveal: &mut Interval,
        events: &mpsc::Sender<MirrorEvent>,
    ) -> Result<(), MirrorError> {
        let prediction = match joined {
            Ok(Ok(prediction)) => Some(prediction),
            Ok(Err(e)) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "emotion analysis failed");
                None
            }
            Err(e) => {
                tracing::error!(target: LOG_TARGET, error = %e, "emotion analysis task failed");
                None
            }
        };

        match prediction {
            Some(prediction) => {
                let now = Instant::now().into_std();
                let decision = self.detector.complete_analysis(prediction, now);
                if let Some(mood) = decision.changed_mood() {
                    emit(events, MirrorEvent::MoodChanged(mood)).await?;
                    if let Some(quote) = self.coordinator.set_mood(mood) {
                        if self.typewriter.set_target(quote) {
                            reveal.reset();
                            emit(events, MirrorEvent::Quote(self.typewriter.frame())).await?;
                        }
                    }
                }
            }
            None => self.detector.abandon_analysis(),
        }
        emit(events, MirrorEvent::Detector(self.detector.status())).await
    }

    async fn on_recognition(
        &mut self,
        event: RecognitionEvent,
        events: &mpsc::Sender<MirrorEvent>,
    ) -> Result<(), MirrorError> {
        let session_over = matches!(event, RecognitionEvent::Ended | RecognitionEvent::Error(_));
        if let Some(utterance) = self.voice.handle_event(event, &mut self.coordinator) {
            emit(events, MirrorEvent::Spoken(utterance.text.clone())).await?;
            self.speak(utterance);
        }
        if session_over {
            self.line_in_flight = false;
            self.deliver_typed();
        }
        emit(events, MirrorEvent::Voice(self.voice.status())).await
    }

    fn speak(&mut self, utterance: Utterance) {
        let Some(synthesizer) = self.voice.synthesizer() else {
            return;
        };
        self.voice.begin_speaking();
        self.speech_task = Some(tokio::spawn(async move {
            synthesizer.speak(utterance).await
        }));
    }

    async fn on_control(
        &mut self,
        control: Control,
        events: &mpsc::Sender<MirrorEvent>,
    ) -> Result<(), MirrorError> {
        tracing::debug!(target: LOG_TARGET, ?control, "control");
        match control {
            Control::ToggleListening => {
                self.toggle_listening();
                emit(events, MirrorEvent::Voice(self.voice.status())).await
            }
            Control::Utterance(text) => {
                self.hear(text);
                emit(events, MirrorEvent::Voice(self.voice.status())).await
            }
            Control::RefreshWeather => {
                self.refresh_weather();
                emit(events, MirrorEvent::Weather(self.panel.clone())).await
            }
            Control::RetryCamera => {
                if self.detector.retry().await.is_ok() {
                    tracing::info!(target: LOG_TARGET, "mood detection resumed");
                }
                emit(events, MirrorEvent::Detector(self.detector.status())).await
            }
            Control::Shutdown => Ok(()),
        }
    }

    fn toggle_listening(&mut self) {
        match self.voice.toggle() {
            Ok(()) => {}
            Err(SpeechError::Unsupported) => {
                tracing::warn!(target: LOG_TARGET, "{VOICE_UNSUPPORTED}");
            }
            Err(e) => tracing::warn!(target: LOG_TARGET, error = %e, "could not toggle listening"),
        }
    }

    /// Queues typed text for the recognizer. Lines wait their turn: each one
    /// gets its own session, opened only after the previous line was
    /// answered and its reply has finished playing.
    fn hear(&mut self, text: String) {
        if self.typed_speech.is_none() {
            tracing::warn!(target: LOG_TARGET, "{VOICE_UNSUPPORTED}");
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.typed_backlog.len() >= TYPED_BACKLOG {
            tracing::warn!(target: LOG_TARGET, text, "utterance dropped, too many waiting");
            return;
        }
        self.typed_backlog.push_back(text.to_owned());
        self.deliver_typed();
    }

    fn deliver_typed(&mut self) {
        if self.line_in_flight || self.voice.is_speaking() {
            return;
        }
        let Some(lines) = self.typed_speech.as_ref() else {
            return;
        };
        let Some(text) = self.typed_backlog.pop_front() else {
            return;
        };
        if !self.voice.is_listening() {
            if let Err(e) = self.voice.toggle() {
                tracing::warn!(target: LOG_TARGET, error = %e, "could not start listening");
                self.typed_backlog.push_front(text);
                return;
            }
        }
        match lines.try_send(text) {
            Ok(()) => self.line_in_flight = true,
            Err(e) => tracing::warn!(target: LOG_TARGET, error = %e, "utterance dropped"),
        }
    }

    /// Starts a fresh lookup. A lookup still in flight is abandoned so its
    /// result can never overwrite the newer one.
    fn refresh_weather(&mut self) {
        if let Some(stale) = self.weather_task.take() {
            stale.abort();
        }
        self.panel.begin_refresh();
        let resolver = self.weather.clone();
        self.weather_task = Some(tokio::spawn(async move { resolver.resolve().await }));
    }

    async fn finish_weather(
        &mut self,
        joined: Result<ResolvedWeather, JoinError>,
        events: &mpsc::Sender<MirrorEvent>,
    ) -> Result<(), MirrorError> {
        match joined {
            Ok(resolved) => {
                tracing::info!(
                    target: LOG_TARGET,
                    source = ?resolved.source,
                    location = %resolved.snapshot.location,
                    temperature = resolved.snapshot.temperature,
                    "weather updated"
                );
                self.panel.apply(resolved);
            }
            Err(e) => {
                tracing::error!(target: LOG_TARGET, error = %e, "weather lookup failed");
                self.panel.fail(FETCH_FAILED);
            }
        }
        emit(events, MirrorEvent::Weather(self.panel.clone())).await
    }

    fn teardown(&mut self) {
        if let Some(task) = self.prediction_task.take() {
            task.abort();
        }
        if let Some(task) = self.weather_task.take() {
            task.abort();
        }
        if let Some(task) = self.speech_task.take() {
            task.abort();
        }
        self.detector.stop();
        self.voice.teardown();
        tracing::debug!(target: LOG_TARGET, "mirror torn down");
    }
}
