use super::*;
use crate::camera::{CameraError, SimulatedCamera};
use crate::clock::FixedClock;
use crate::coordinator::{quotes_for, HELP_TEXT, WEATHER_POINTER};
use crate::detector::{DetectorState, CAMERA_UNAVAILABLE};
use crate::voice::{ConsoleRecognizer, SimulatedSynthesizer};
use crate::weather::{
    Coordinates, FixedLocation, NoDeviceLocation, WeatherError, WeatherProvider, WeatherSnapshot,
    WeatherSource,
};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

struct ScriptedSampler {
    script: Mutex<VecDeque<EmotionPrediction>>,
}

impl ScriptedSampler {
    fn new(script: Vec<EmotionPrediction>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

impl EmotionSampler for ScriptedSampler {
    fn predict(&self) -> BoxFuture<'_, Result<EmotionPrediction, SampleError>> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(EmotionPrediction::new(MoodCategory::Neutral, 0.9));
        async move { Ok(next) }.boxed()
    }
}

struct TownProvider;

impl WeatherProvider for TownProvider {
    fn current(&self, _at: Coordinates) -> BoxFuture<'_, Result<WeatherSnapshot, WeatherError>> {
        async {
            Ok(WeatherSnapshot {
                location: "Testville".into(),
                ..WeatherSnapshot::mock()
            })
        }
        .boxed()
    }
}

struct ExplodingProvider;

impl WeatherProvider for ExplodingProvider {
    fn current(&self, at: Coordinates) -> BoxFuture<'_, Result<WeatherSnapshot, WeatherError>> {
        async move {
            if at.latitude.is_finite() {
                panic!("provider exploded");
            }
            Ok(WeatherSnapshot::mock())
        }
        .boxed()
    }
}

/// First lookup is slow and reports "Stale"; later ones are quicker and
/// report "Fresh".
#[derive(Default)]
struct SlowThenFastProvider {
    calls: AtomicUsize,
}

impl WeatherProvider for SlowThenFastProvider {
    fn current(&self, _at: Coordinates) -> BoxFuture<'_, Result<WeatherSnapshot, WeatherError>> {
        let first = self.calls.fetch_add(1, Ordering::SeqCst) == 0;
        async move {
            let (delay, location) = if first {
                (Duration::from_secs(5), "Stale")
            } else {
                (Duration::from_secs(1), "Fresh")
            };
            tokio::time::sleep(delay).await;
            Ok(WeatherSnapshot {
                location: location.into(),
                ..WeatherSnapshot::mock()
            })
        }
        .boxed()
    }
}

fn resolver(provider: Arc<dyn WeatherProvider>) -> WeatherResolver {
    WeatherResolver::new(
        Arc::new(FixedLocation(Coordinates::new(52.5, 13.4).unwrap())),
        Arc::new(NoDeviceLocation),
        provider,
    )
}

fn parts(camera: &SimulatedCamera, script: Vec<EmotionPrediction>) -> MirrorParts {
    let at = NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(15, 4, 0)
        .unwrap();
    MirrorParts {
        camera: Arc::new(camera.clone()),
        sampler: Arc::new(ScriptedSampler::new(script)),
        recognizer: None,
        typed_speech: None,
        synthesizer: None,
        weather: resolver(Arc::new(TownProvider)),
        clock: Arc::new(FixedClock::from_naive(at).unwrap()),
    }
}

fn with_voice(mut parts: MirrorParts, per_char: Duration) -> MirrorParts {
    let (line_tx, line_rx) = mpsc::channel(4);
    parts.recognizer = Some(Arc::new(ConsoleRecognizer::new(line_rx)));
    parts.typed_speech = Some(line_tx);
    parts.synthesizer = Some(Arc::new(SimulatedSynthesizer::new(per_char)));
    parts
}

struct Rig {
    controls: mpsc::Sender<Control>,
    events: mpsc::Receiver<MirrorEvent>,
    task: JoinHandle<Result<(), MirrorError>>,
}

impl Rig {
    fn launch(parts: MirrorParts) -> Self {
        let config = MirrorConfig {
            seed: Some(7),
            ..MirrorConfig::default()
        };
        let mirror = Mirror::new(&config, parts).unwrap();
        let (controls, control_rx) = mpsc::channel(8);
        let (event_tx, events) = mpsc::channel(256);
        let task = tokio::spawn(mirror.run(control_rx, event_tx));
        Self {
            controls,
            events,
            task,
        }
    }

    async fn next(&mut self) -> MirrorEvent {
        self.events.recv().await.expect("mirror stopped")
    }

    async fn wait_for<T>(&mut self, mut pick: impl FnMut(MirrorEvent) -> Option<T>) -> T {
        loop {
            if let Some(found) = pick(self.next().await) {
                return found;
            }
        }
    }

    async fn say(&self, text: &str) {
        self.controls
            .send(Control::Utterance(text.to_owned()))
            .await
            .unwrap();
    }

    async fn shutdown(self) -> Result<(), MirrorError> {
        self.controls.send(Control::Shutdown).await.unwrap();
        self.task.await.unwrap()
    }
}

fn detector(event: MirrorEvent) -> Option<DetectorStatus> {
    match event {
        MirrorEvent::Detector(status) => Some(status),
        _ => None,
    }
}

fn weather(event: MirrorEvent) -> Option<WeatherPanel> {
    match event {
        MirrorEvent::Weather(panel) => Some(panel),
        _ => None,
    }
}

fn spoken(event: MirrorEvent) -> Option<String> {
    match event {
        MirrorEvent::Spoken(text) => Some(text),
        _ => None,
    }
}

fn mood(event: MirrorEvent) -> Option<MoodCategory> {
    match event {
        MirrorEvent::MoodChanged(mood) => Some(mood),
        _ => None,
    }
}

#[tokio::test(start_paused = true)]
async fn startup_renders_every_widget() {
    let camera = SimulatedCamera::new();
    let mut rig = Rig::launch(parts(&camera, vec![]));

    let status = detector(rig.next().await).unwrap();
    assert_eq!(status.state, DetectorState::Active);
    assert_eq!(status.unavailable, None);
    assert!(weather(rig.next().await).unwrap().loading);
    match rig.next().await {
        MirrorEvent::Voice(voice) => assert!(!voice.supported),
        other => panic!("expected voice status, got {other:?}"),
    }
    match rig.next().await {
        MirrorEvent::Quote(frame) => {
            assert!(frame.text.is_empty());
            assert!(frame.typing);
        }
        other => panic!("expected quote frame, got {other:?}"),
    }

    let face = rig
        .wait_for(|e| match e {
            MirrorEvent::Clock(face) => Some(face),
            _ => None,
        })
        .await;
    assert_eq!(face.time, "03:04 PM");
    assert_eq!(face.date, "Tuesday, March 5, 2024");

    assert_eq!(camera.open_streams(), 1);
    rig.shutdown().await.unwrap();
    assert_eq!(camera.open_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn confident_mood_change_reveals_a_matching_quote() {
    let camera = SimulatedCamera::new();
    let script = vec![EmotionPrediction::new(MoodCategory::Happy, 0.95)];
    let mut rig = Rig::launch(parts(&camera, script));

    assert_eq!(rig.wait_for(mood).await, MoodCategory::Happy);
    let quote = rig
        .wait_for(|e| match e {
            MirrorEvent::Quote(frame) if !frame.typing => Some(frame.text),
            _ => None,
        })
        .await;
    assert!(quotes_for(MoodCategory::Happy).contains(&quote.as_str()));

    let status = rig.wait_for(detector).await;
    assert_eq!(status.displayed, MoodCategory::Happy);
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn low_confidence_drops_back_to_neutral() {
    let camera = SimulatedCamera::new();
    let script = vec![
        EmotionPrediction::new(MoodCategory::Happy, 0.95),
        EmotionPrediction::new(MoodCategory::Sad, 0.5),
    ];
    let mut rig = Rig::launch(parts(&camera, script));

    assert_eq!(rig.wait_for(mood).await, MoodCategory::Happy);
    assert_eq!(rig.wait_for(mood).await, MoodCategory::Neutral);
    let status = rig.wait_for(detector).await;
    assert!(!status.high_confidence);
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn camera_failure_offers_retry() {
    let camera = SimulatedCamera::failing(CameraError::PermissionDenied);
    let mut rig = Rig::launch(parts(&camera, vec![]));

    let status = rig.wait_for(detector).await;
    assert_eq!(status.state, DetectorState::Inactive);
    assert_eq!(status.unavailable.as_deref(), Some(CAMERA_UNAVAILABLE));

    camera.set_failure(None);
    rig.controls.send(Control::RetryCamera).await.unwrap();
    let status = rig.wait_for(detector).await;
    assert_eq!(status.state, DetectorState::Active);
    assert_eq!(status.unavailable, None);

    rig.shutdown().await.unwrap();
    assert_eq!(camera.open_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn weather_loads_and_refreshes() {
    let camera = SimulatedCamera::new();
    let mut rig = Rig::launch(parts(&camera, vec![]));

    let panel = rig.wait_for(|e| weather(e).filter(|p| !p.loading)).await;
    assert_eq!(panel.source, Some(WeatherSource::Device));
    assert_eq!(panel.snapshot.unwrap().location, "Testville");

    rig.controls.send(Control::RefreshWeather).await.unwrap();
    let panel = rig.wait_for(weather).await;
    assert!(panel.loading);
    assert!(panel.snapshot.is_some());
    let panel = rig.wait_for(|e| weather(e).filter(|p| !p.loading)).await;
    assert_eq!(panel.error, None);
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn crashed_weather_lookup_shows_mock_with_error() {
    let camera = SimulatedCamera::new();
    let mut mirror_parts = parts(&camera, vec![]);
    mirror_parts.weather = resolver(Arc::new(ExplodingProvider));
    let mut rig = Rig::launch(mirror_parts);

    let panel = rig.wait_for(|e| weather(e).filter(|p| !p.loading)).await;
    assert_eq!(panel.error.as_deref(), Some(FETCH_FAILED));
    assert_eq!(panel.snapshot, Some(WeatherSnapshot::mock()));
    assert!(panel.offers_retry());
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn typed_question_is_answered_aloud() {
    let camera = SimulatedCamera::new();
    let mut rig = Rig::launch(with_voice(parts(&camera, vec![]), Duration::from_millis(1)));

    rig.say("What's the weather like?").await;
    assert_eq!(rig.wait_for(spoken).await, WEATHER_POINTER);

    let voice = rig
        .wait_for(|e| match e {
            MirrorEvent::Voice(v) if v.speaking => Some(v),
            _ => None,
        })
        .await;
    assert!(!voice.toggle_enabled());
    let voice = rig
        .wait_for(|e| match e {
            MirrorEvent::Voice(v) if !v.speaking && !v.listening => Some(v),
            _ => None,
        })
        .await;
    assert!(voice.transcript.is_empty());
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn line_typed_during_a_reply_is_answered_next_and_only_once() {
    let camera = SimulatedCamera::new();
    let mut rig = Rig::launch(with_voice(parts(&camera, vec![]), Duration::from_millis(60)));

    rig.say("what's the weather").await;
    assert_eq!(rig.wait_for(spoken).await, WEATHER_POINTER);

    // The weather reply takes seconds to play; both lines arrive during it.
    rig.say("asdf").await;
    rig.say("how do I look").await;
    assert_eq!(rig.wait_for(spoken).await, HELP_TEXT);
    let compliment = rig.wait_for(spoken).await;
    assert_ne!(compliment, HELP_TEXT);
    assert!(compliment.to_lowercase().contains("look"), "{compliment}");

    let extra = tokio::time::timeout(Duration::from_secs(30), rig.wait_for(spoken)).await;
    assert!(extra.is_err(), "unexpected reply {extra:?}");
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn back_to_back_lines_each_get_their_own_reply() {
    let camera = SimulatedCamera::new();
    let mut rig = Rig::launch(with_voice(parts(&camera, vec![]), Duration::from_millis(1)));

    rig.say("what time is it").await;
    rig.say("motivate me").await;
    assert_eq!(rig.wait_for(spoken).await, "The time is 15:04");
    let quote = rig.wait_for(spoken).await;
    assert!(quotes_for(MoodCategory::Neutral).contains(&quote.as_str()), "{quote}");
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn analysis_runs_every_two_seconds() {
    let camera = SimulatedCamera::new();
    let started = Instant::now();
    let mut rig = Rig::launch(parts(&camera, vec![]));

    let mut offsets = Vec::new();
    while offsets.len() < 3 {
        let status = rig.wait_for(detector).await;
        if status.state == DetectorState::Analyzing {
            offsets.push(started.elapsed());
        }
    }
    assert_eq!(offsets, [2, 4, 6].map(Duration::from_secs).to_vec());
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn new_quote_is_revealed_one_character_per_30ms() {
    let camera = SimulatedCamera::new();
    let script = vec![EmotionPrediction::new(MoodCategory::Happy, 0.95)];
    let mut rig = Rig::launch(parts(&camera, script));

    rig.wait_for(mood).await;
    let changed_at = Instant::now();
    let restarted = rig
        .wait_for(|e| match e {
            MirrorEvent::Quote(frame) => Some(frame),
            _ => None,
        })
        .await;
    assert!(restarted.text.is_empty() && restarted.typing);

    let quote = rig
        .wait_for(|e| match e {
            MirrorEvent::Quote(frame) if !frame.typing => Some(frame.text),
            _ => None,
        })
        .await;
    let chars = quote.chars().count() as u32;
    assert_eq!(changed_at.elapsed(), Duration::from_millis(30) * chars);
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn refresh_supersedes_a_lookup_still_in_flight() {
    let camera = SimulatedCamera::new();
    let mut mirror_parts = parts(&camera, vec![]);
    mirror_parts.weather = resolver(Arc::new(SlowThenFastProvider::default()));
    let mut rig = Rig::launch(mirror_parts);

    assert!(rig.wait_for(weather).await.loading);
    rig.controls.send(Control::RefreshWeather).await.unwrap();

    let panel = rig.wait_for(|e| weather(e).filter(|p| !p.loading)).await;
    assert_eq!(panel.snapshot.unwrap().location, "Fresh");

    let stale = tokio::time::timeout(
        Duration::from_secs(10),
        rig.wait_for(|e| weather(e).filter(|p| !p.loading)),
    )
    .await;
    assert!(stale.is_err(), "superseded lookup was applied: {stale:?}");
    rig.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dropped_display_stops_the_mirror() {
    let camera = SimulatedCamera::new();
    let rig = Rig::launch(parts(&camera, vec![]));
    let Rig {
        controls,
        events,
        task,
    } = rig;
    drop(events);

    assert!(matches!(task.await.unwrap(), Err(MirrorError::EventsClosed)));
    assert_eq!(camera.open_streams(), 0);
    drop(controls);
}

#[test]
fn zero_interval_is_rejected_up_front() {
    let camera = SimulatedCamera::new();
    let mut config = MirrorConfig::default();
    config.timing.clock_tick = Duration::ZERO;
    assert!(matches!(
        Mirror::new(&config, parts(&camera, vec![])),
        Err(MirrorError::Config(ConfigError::ZeroInterval("clock tick")))
    ));
}
