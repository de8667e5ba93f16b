use crate::coordinator::CommandInterpreter;
use crate::voice::{
    select_voice, RecognitionEvent, RecognitionOptions, SpeechError, SpeechRecognizer,
    SpeechSynthesizer, Utterance, VOICE_UNSUPPORTED,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

const LOG_TARGET: &str = "voice";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceStatus {
    pub supported: bool,
    pub listening: bool,
    pub speaking: bool,
    pub transcript: String,
}

impl VoiceStatus {
    /// The listen toggle is disabled while a reply is playing.
    pub fn toggle_enabled(&self) -> bool {
        self.supported && !self.speaking
    }
}

/// Push-to-talk shell around a recognizer and a synthesizer.
///
/// The assistant does not understand anything itself: a final transcript is
/// handed to a [`CommandInterpreter`] and the returned text becomes the
/// utterance to play.
pub struct VoiceAssistant {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    options: RecognitionOptions,
    events: mpsc::Sender<RecognitionEvent>,
    listening: bool,
    speaking: bool,
    transcript: String,
}

impl VoiceAssistant {
    pub fn new(
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        events: mpsc::Sender<RecognitionEvent>,
    ) -> Self {
        if recognizer.is_none() {
            tracing::warn!(target: LOG_TARGET, "{VOICE_UNSUPPORTED}");
        }
        Self {
            recognizer,
            synthesizer,
            options: RecognitionOptions::default(),
            events,
            listening: false,
            speaking: false,
            transcript: String::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn status(&self) -> VoiceStatus {
        VoiceStatus {
            supported: self.is_supported(),
            listening: self.listening,
            speaking: self.speaking,
            transcript: self.transcript.clone(),
        }
    }

    /// Starts listening when idle, stops when listening. Does nothing while a
    /// reply is being spoken or when recognition is unsupported.
    pub fn toggle(&mut self) -> Result<(), SpeechError> {
        let Some(recognizer) = self.recognizer.as_ref() else {
            return Err(SpeechError::Unsupported);
        };
        if self.speaking {
            tracing::debug!(target: LOG_TARGET, "toggle ignored while speaking");
            return Ok(());
        }

        if self.listening {
            recognizer.stop();
        } else {
            recognizer.start(&self.options, self.events.clone())?;
            self.listening = true;
        }
        Ok(())
    }

    /// Applies one recognition event. A final transcript is interpreted and
    /// the reply returned, ready to be spoken.
    pub fn handle_event(
        &mut self,
        event: RecognitionEvent,
        interpreter: &mut dyn CommandInterpreter,
    ) -> Option<Utterance> {
        match event {
            RecognitionEvent::Started => {
                self.listening = true;
                None
            }
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                self.transcript = transcript;
                if !is_final {
                    return None;
                }
                tracing::info!(target: LOG_TARGET, command = %self.transcript, "heard command");
                let reply = interpreter.interpret(&self.transcript);
                self.prepare_reply(reply)
            }
            RecognitionEvent::Ended => {
                self.reset();
                None
            }
            RecognitionEvent::Error(reason) => {
                tracing::warn!(target: LOG_TARGET, %reason, "speech recognition error");
                self.reset();
                None
            }
        }
    }

    fn reset(&mut self) {
        self.listening = false;
        self.transcript.clear();
    }

    /// Builds the utterance for `text`, cutting off any speech in progress.
    /// `None` when there is no synthesizer to play it.
    fn prepare_reply(&self, text: String) -> Option<Utterance> {
        let synthesizer = self.synthesizer.as_ref()?;
        synthesizer.cancel();
        let mut utterance = Utterance::reply(text);
        utterance.voice = select_voice(&synthesizer.voices());
        Some(utterance)
    }

    pub fn synthesizer(&self) -> Option<Arc<dyn SpeechSynthesizer>> {
        self.synthesizer.clone()
    }

    pub fn begin_speaking(&mut self) {
        self.speaking = true;
    }

    pub fn finish_speaking(&mut self) {
        self.speaking = false;
    }

    /// Aborts any live recognition session.
    pub fn teardown(&mut self) {
        if let Some(recognizer) = self.recognizer.as_ref() {
            recognizer.abort();
        }
        if let Some(synthesizer) = self.synthesizer.as_ref() {
            synthesizer.cancel();
        }
        self.reset();
        self.speaking = false;
    }
}
