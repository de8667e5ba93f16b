mod quotes;

use crate::clock::{format_hours_minutes, WallClock};
use crate::mood::MoodCategory;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

pub use quotes::{pick_quote, quotes_for};

pub const FALLBACK_QUOTE: &str = "You are capable of amazing things!";
pub const WEATHER_POINTER: &str =
    "Check the weather widget in the top right corner for current conditions!";
pub const HELP_TEXT: &str = "I'm here to help! You can ask me how you look, request a motivational quote, or ask about the time.";

/// Turns a recognized utterance into the reply to speak back.
pub trait CommandInterpreter: Send {
    fn interpret(&mut self, text: &str) -> String;
}

/// What a voice command is asking for. Rules are checked in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Compliment,
    Quote,
    Weather,
    Time,
    Help,
}

const INTENT_PHRASES: &[(Intent, &[&str])] = &[
    (Intent::Compliment, &["how do i look", "how am i looking"]),
    (Intent::Quote, &["give me a quote", "motivate me"]),
    (Intent::Weather, &["weather", "temperature"]),
    (Intent::Time, &["time", "clock"]),
];

impl Intent {
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();
        INTENT_PHRASES
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Help)
    }
}

fn compliments(mood: MoodCategory) -> [String; 3] {
    let look = match mood {
        MoodCategory::Happy => "absolutely radiant",
        MoodCategory::Sad => "thoughtful and beautiful",
        _ => "wonderful",
    };
    [
        format!("You look {look} today!"),
        format!("Looking {mood}! And that's perfectly fine - you're beautiful just as you are."),
        format!("I can see you're feeling {mood} right now, and you still look amazing!"),
    ]
}

/// Top-level mirror state: the mood on display and the quote chosen for it.
pub struct Coordinator<R = StdRng> {
    mood: MoodCategory,
    quote: Option<&'static str>,
    rng: R,
    clock: Arc<dyn WallClock>,
}

impl<R: Rng + Send> Coordinator<R> {
    pub fn new(rng: R, clock: Arc<dyn WallClock>) -> Self {
        Self {
            mood: MoodCategory::Neutral,
            quote: None,
            rng,
            clock,
        }
    }

    /// Starts with a quote already picked for the default mood.
    pub fn with_initial_quote(rng: R, clock: Arc<dyn WallClock>) -> Self {
        let mut coordinator = Self::new(rng, clock);
        coordinator.quote = Some(pick_quote(coordinator.mood, &mut coordinator.rng));
        coordinator
    }

    pub fn mood(&self) -> MoodCategory {
        self.mood
    }

    pub fn quote(&self) -> Option<&'static str> {
        self.quote
    }

    /// Applies a mood reported by the detector. Returns the freshly picked
    /// quote when the mood actually changed.
    pub fn set_mood(&mut self, mood: MoodCategory) -> Option<&'static str> {
        if mood == self.mood {
            return None;
        }
        self.mood = mood;
        let quote = pick_quote(mood, &mut self.rng);
        self.quote = Some(quote);
        tracing::info!(%mood, quote, "mood changed");
        Some(quote)
    }

    pub fn respond(&mut self, intent: Intent) -> String {
        match intent {
            Intent::Compliment => {
                let mut options = compliments(self.mood);
                let idx = self.rng.random_range(0..options.len());
                std::mem::take(&mut options[idx])
            }
            Intent::Quote => self.quote.unwrap_or(FALLBACK_QUOTE).to_owned(),
            Intent::Weather => WEATHER_POINTER.to_owned(),
            Intent::Time => format!("The time is {}", format_hours_minutes(&self.clock.now())),
            Intent::Help => HELP_TEXT.to_owned(),
        }
    }
}

impl<R: Rng + Send> CommandInterpreter for Coordinator<R> {
    fn interpret(&mut self, text: &str) -> String {
        let intent = Intent::parse(text);
        tracing::debug!(?intent, text, "interpreting command");
        self.respond(intent)
    }
}
