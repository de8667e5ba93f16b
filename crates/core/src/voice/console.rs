use crate::voice::{
    RecognitionEvent, RecognitionOptions, SpeechError, SpeechRecognizer, SpeechSynthesizer,
    Utterance, VoiceInfo,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "voice::console";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct Session {
    task: JoinHandle<()>,
    events: mpsc::Sender<RecognitionEvent>,
    /// Set before the last event goes out, so a listener reacting to
    /// `Ended` can open the next session straight away.
    done: Arc<AtomicBool>,
}

/// Recognizer fed by typed lines. Each session consumes one line, replays it
/// word by word as interim results, then reports it as final.
pub struct ConsoleRecognizer {
    lines: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
    session: Mutex<Option<Session>>,
}

impl ConsoleRecognizer {
    pub fn new(lines: mpsc::Receiver<String>) -> Self {
        Self {
            lines: Arc::new(tokio::sync::Mutex::new(lines)),
            session: Mutex::new(None),
        }
    }

    /// Runs one session up to its last event, which is returned instead of
    /// sent so the session can be marked done first. `None` when the
    /// listener went away.
    async fn transcribe(
        lines: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
        interim_results: bool,
        events: &mpsc::Sender<RecognitionEvent>,
    ) -> Option<RecognitionEvent> {
        events.send(RecognitionEvent::Started).await.ok()?;

        let line = lines.lock().await.recv().await;
        let Some(line) = line else {
            return Some(RecognitionEvent::Error("input closed".to_owned()));
        };

        let text = line.trim().to_owned();
        if text.is_empty() {
            return Some(RecognitionEvent::Error("no-speech".to_owned()));
        }

        if interim_results {
            let words: Vec<&str> = text.split_whitespace().collect();
            for n in 1..words.len() {
                let partial = RecognitionEvent::Result {
                    transcript: words[..n].join(" "),
                    is_final: false,
                };
                events.send(partial).await.ok()?;
            }
        }

        let finished = RecognitionEvent::Result {
            transcript: text,
            is_final: true,
        };
        events.send(finished).await.ok()?;
        Some(RecognitionEvent::Ended)
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(
        &self,
        options: &RecognitionOptions,
        events: mpsc::Sender<RecognitionEvent>,
    ) -> Result<(), SpeechError> {
        let mut session = lock(&self.session);
        if session.as_ref().is_some_and(|s| !s.done.load(Ordering::Acquire)) {
            return Err(SpeechError::AlreadyStarted);
        }

        tracing::debug!(target: LOG_TARGET, lang = %options.lang, "listening for typed command");
        let done = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn({
            let lines = self.lines.clone();
            let interim_results = options.interim_results;
            let events = events.clone();
            let done = done.clone();
            async move {
                let last = Self::transcribe(lines, interim_results, &events).await;
                done.store(true, Ordering::Release);
                if let Some(last) = last {
                    let _ = events.send(last).await;
                }
            }
        });
        *session = Some(Session { task, events, done });
        Ok(())
    }

    fn stop(&self) {
        if let Some(session) = lock(&self.session).take() {
            session.task.abort();
            let _ = session.events.try_send(RecognitionEvent::Ended);
        }
    }

    fn abort(&self) {
        if let Some(session) = lock(&self.session).take() {
            session.task.abort();
        }
    }
}

/// Synthesizer with no audio device: "plays" an utterance by waiting roughly
/// as long as it would take to say it.
pub struct SimulatedSynthesizer {
    voices: Vec<VoiceInfo>,
    per_char: Duration,
    cancelled: Notify,
}

impl SimulatedSynthesizer {
    pub fn new(per_char: Duration) -> Self {
        Self {
            voices: Vec::new(),
            per_char,
            cancelled: Notify::new(),
        }
    }

    pub fn with_voices(mut self, voices: Vec<VoiceInfo>) -> Self {
        self.voices = voices;
        self
    }

    fn playback_time(&self, utterance: &Utterance) -> Duration {
        let chars = utterance.text.chars().count() as f64;
        let rate = if utterance.rate > 0.0 {
            f64::from(utterance.rate)
        } else {
            1.0
        };
        let millis = self.per_char.as_millis() as f64 * chars / rate;
        Duration::from_millis(millis.round() as u64)
    }
}

impl SpeechSynthesizer for SimulatedSynthesizer {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn cancel(&self) {
        self.cancelled.notify_waiters();
    }

    fn speak(&self, utterance: Utterance) -> BoxFuture<'_, Result<(), SpeechError>> {
        async move {
            let duration = self.playback_time(&utterance);
            tracing::debug!(
                target: LOG_TARGET,
                voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
                ?duration,
                "speaking"
            );
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = self.cancelled.notified() => {
                    tracing::debug!(target: LOG_TARGET, "speech cancelled");
                }
            }
            Ok(())
        }
        .boxed()
    }
}
