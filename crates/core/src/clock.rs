use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always reports the same instant.
#[derive(Clone, Debug)]
pub struct FixedClock(DateTime<Local>);

impl FixedClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self(at)
    }

    /// Interprets `naive` as local time. Ambiguous or skipped local times
    /// (DST transitions) resolve to the earliest valid instant.
    pub fn from_naive(naive: NaiveDateTime) -> Option<Self> {
        Local.from_local_datetime(&naive).earliest().map(Self)
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// "HH:MM" on a 24-hour clock, as spoken by the assistant.
pub fn format_hours_minutes(at: &DateTime<Local>) -> String {
    at.format("%H:%M").to_string()
}

/// Text shown by the clock widget.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClockFace {
    pub time: String,
    pub date: String,
}

impl ClockFace {
    pub fn at(at: &DateTime<Local>) -> Self {
        Self {
            time: at.format("%I:%M %p").to_string(),
            date: at.format("%A, %B %-d, %Y").to_string(),
        }
    }
}
