use crate::mood::{EmotionPrediction, GateDecision, MoodCategory, MoodGate};
use std::time::{Duration, Instant};

fn at(t0: Instant, ms: u64) -> Instant {
    t0 + Duration::from_millis(ms)
}

fn feed(
    gate: &mut MoodGate,
    t0: Instant,
    ms: u64,
    emotion: MoodCategory,
    confidence: f32,
) -> GateDecision {
    gate.observe(EmotionPrediction::new(emotion, confidence), at(t0, ms))
}

#[test]
fn confident_noise_inside_cooldown_keeps_happy() {
    let mut gate = MoodGate::default();
    let t0 = Instant::now();

    assert_eq!(
        feed(&mut gate, t0, 0, MoodCategory::Happy, 0.9),
        GateDecision::Accepted(MoodCategory::Happy)
    );

    // Flicker between confident guesses every analysis tick within the cooldown.
    for (ms, mood) in [
        (500, MoodCategory::Sad),
        (1000, MoodCategory::Surprised),
        (2000, MoodCategory::Angry),
        (2500, MoodCategory::Happy),
    ] {
        assert_eq!(feed(&mut gate, t0, ms, mood, 0.85), GateDecision::Unchanged);
        assert_eq!(gate.displayed(), MoodCategory::Happy);
    }
}

#[test]
fn sustained_happy_survives_repeated_confident_readings() {
    let mut gate = MoodGate::default();
    let t0 = Instant::now();
    feed(&mut gate, t0, 0, MoodCategory::Happy, 0.9);

    for tick in 1..10 {
        let decision = feed(&mut gate, t0, tick * 2000, MoodCategory::Happy, 0.82);
        assert_eq!(decision, GateDecision::Unchanged);
        assert_eq!(gate.displayed(), MoodCategory::Happy);
    }
    assert_eq!(gate.last_change(), Some(t0));
}

#[test]
fn low_confidence_drops_to_neutral_then_happy_returns() {
    let mut gate = MoodGate::default();
    let t0 = Instant::now();

    feed(&mut gate, t0, 0, MoodCategory::Happy, 0.9);
    assert_eq!(
        feed(&mut gate, t0, 2000, MoodCategory::Sad, 0.4),
        GateDecision::ForcedNeutral
    );
    // Still low: already neutral, nothing to report.
    assert_eq!(
        feed(&mut gate, t0, 2200, MoodCategory::Happy, 0.6),
        GateDecision::Unchanged
    );
    assert_eq!(gate.displayed(), MoodCategory::Neutral);

    // Cooldown is measured from the last accepted change at t0, not from the
    // forced neutral, so happy may return as soon as 3 s have passed.
    assert_eq!(
        feed(&mut gate, t0, 2900, MoodCategory::Happy, 0.9),
        GateDecision::Unchanged
    );
    assert_eq!(
        feed(&mut gate, t0, 3000, MoodCategory::Happy, 0.9),
        GateDecision::Accepted(MoodCategory::Happy)
    );
    assert_eq!(gate.last_change(), Some(at(t0, 3000)));
}
