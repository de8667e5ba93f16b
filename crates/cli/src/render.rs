use mood_mirror_core::clock::ClockFace;
use mood_mirror_core::detector::DetectorStatus;
use mood_mirror_core::mirror::MirrorEvent;
use mood_mirror_core::voice::{VoiceStatus, VOICE_UNSUPPORTED};
use mood_mirror_core::weather::{WeatherPanel, WeatherSource};
use std::collections::HashMap;

/// Turns mirror events into terminal lines. Text mode only prints a widget
/// when its rendering changed; JSON mode prints every event.
pub struct Renderer {
    json: bool,
    last: HashMap<&'static str, String>,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            last: HashMap::new(),
        }
    }

    pub fn render(&mut self, event: &MirrorEvent) -> anyhow::Result<Option<String>> {
        if self.json {
            return Ok(Some(serde_json::to_string(event)?));
        }

        let (widget, line) = match event {
            MirrorEvent::Clock(face) => ("clock", clock_line(face)),
            MirrorEvent::Weather(panel) => ("weather", weather_line(panel)),
            MirrorEvent::Detector(status) => ("detector", detector_line(status)),
            MirrorEvent::MoodChanged(mood) => {
                return Ok(Some(format!("[mood] now showing {mood} ({})", mood.icon())));
            }
            MirrorEvent::Quote(frame) => {
                if frame.typing || frame.text.is_empty() {
                    return Ok(None);
                }
                ("quote", format!("[quote] {}", frame.text))
            }
            MirrorEvent::Voice(status) => ("voice", voice_line(status)),
            MirrorEvent::Spoken(text) => return Ok(Some(format!("[mirror says] {text}"))),
        };

        if self.last.get(widget) == Some(&line) {
            return Ok(None);
        }
        self.last.insert(widget, line.clone());
        Ok(Some(line))
    }
}

fn clock_line(face: &ClockFace) -> String {
    format!("[clock] {} | {}", face.time, face.date)
}

fn weather_line(panel: &WeatherPanel) -> String {
    let Some(w) = panel.snapshot.as_ref() else {
        return "[weather] loading...".to_owned();
    };
    let source = match panel.source {
        Some(WeatherSource::Device) => "device location",
        Some(WeatherSource::IpLookup) => "ip location",
        Some(WeatherSource::Mock) | None => "sample data",
    };
    let mut line = format!(
        "[weather] {}°C {} in {} ({}), feels like {}°C, humidity {}%, wind {} km/h, {} hPa [{}]",
        w.temperature,
        w.condition,
        w.location,
        source,
        w.feels_like,
        w.humidity,
        w.wind_speed,
        w.pressure,
        w.icon
    );
    if panel.loading {
        line.push_str(" refreshing...");
    }
    if let Some(error) = panel.error.as_deref() {
        line.push_str(&format!(" | {error}, /refresh to retry"));
    }
    line
}

fn detector_line(status: &DetectorStatus) -> String {
    if let Some(reason) = status.unavailable.as_deref() {
        return format!("[camera] {reason}, /retry to try again");
    }
    let mut line = format!(
        "[camera] {:?}, showing {} ({})",
        status.state,
        status.displayed,
        status.displayed.icon()
    );
    if let Some(confidence) = status.confidence {
        let label = if status.high_confidence { "high" } else { "low" };
        line.push_str(&format!(
            ", confidence {:.0}% ({label})",
            confidence * 100.0
        ));
    }
    line
}

fn voice_line(status: &VoiceStatus) -> String {
    if !status.supported {
        return format!("[voice] {VOICE_UNSUPPORTED}");
    }
    if status.speaking {
        return "[voice] speaking...".to_owned();
    }
    if status.listening {
        if status.transcript.is_empty() {
            return "[voice] listening...".to_owned();
        }
        return format!("[voice] heard \"{}\"", status.transcript);
    }
    "[voice] idle, type to talk or /listen".to_owned()
}
