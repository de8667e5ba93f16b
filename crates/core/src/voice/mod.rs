mod assistant;
mod console;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use assistant::{VoiceAssistant, VoiceStatus};
pub use console::{ConsoleRecognizer, SimulatedSynthesizer};

pub const VOICE_UNSUPPORTED: &str = "Voice features not supported";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Result { transcript: String, is_final: bool },
    Ended,
    Error(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub continuous: bool,
    pub interim_results: bool,
    pub lang: String,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            continuous: false,
            interim_results: true,
            lang: "en-US".to_owned(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("speech capability not supported")]
    Unsupported,
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("recognition session already running")]
    AlreadyStarted,
    #[error("synthesis failed: {0}")]
    Synthesis(String),
}

/// Speech-to-text session. Events for a session are pushed into the sender
/// given to [`SpeechRecognizer::start`].
pub trait SpeechRecognizer: Send + Sync {
    fn start(
        &self,
        options: &RecognitionOptions,
        events: mpsc::Sender<RecognitionEvent>,
    ) -> Result<(), SpeechError>;

    /// Ends the session gracefully; an `Ended` event follows.
    fn stop(&self);

    /// Tears the session down without further events.
    fn abort(&self);
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    pub lang: String,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<VoiceInfo>,
}

impl Utterance {
    /// A reply with the mirror's speaking style: slightly slow and soft.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
            voice: None,
        }
    }
}

pub trait SpeechSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Cuts off whatever is currently being spoken.
    fn cancel(&self);

    /// Resolves once playback has finished or been cancelled.
    fn speak(&self, utterance: Utterance) -> BoxFuture<'_, Result<(), SpeechError>>;
}

const PREFERRED_VOICE_NAMES: &[&str] = &["Samantha", "Karen", "Female"];

/// First voice matching a preferred name, or an English Google voice.
pub fn select_voice(voices: &[VoiceInfo]) -> Option<VoiceInfo> {
    voices
        .iter()
        .find(|v| {
            PREFERRED_VOICE_NAMES.iter().any(|n| v.name.contains(n))
                || (v.lang.contains("en") && v.name.contains("Google"))
        })
        .cloned()
}
