use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(30);

/// What the quote widget shows at one instant.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuoteFrame {
    pub text: String,
    pub typing: bool,
}

/// Reveals a target string one character per step.
#[derive(Clone, Debug, Default)]
pub struct Typewriter {
    target: Vec<char>,
    shown: usize,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts the reveal for a new target. Returns false when `target` is
    /// already the current one, in which case nothing restarts.
    pub fn set_target(&mut self, target: &str) -> bool {
        if self.target.iter().copied().eq(target.chars()) {
            return false;
        }
        self.target = target.chars().collect();
        self.shown = 0;
        true
    }

    /// Reveals one more character. Returns false once the target is fully
    /// shown.
    pub fn step(&mut self) -> bool {
        if self.shown >= self.target.len() {
            return false;
        }
        self.shown += 1;
        true
    }

    pub fn is_typing(&self) -> bool {
        self.shown < self.target.len()
    }

    pub fn displayed(&self) -> String {
        self.target[..self.shown].iter().collect()
    }

    pub fn frame(&self) -> QuoteFrame {
        QuoteFrame {
            text: self.displayed(),
            typing: self.is_typing(),
        }
    }
}
