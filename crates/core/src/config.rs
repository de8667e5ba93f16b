use crate::mood::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MOOD_COOLDOWN};
use crate::reveal::DEFAULT_REVEAL_INTERVAL;
use crate::weather::{Coordinates, DEFAULT_GEOLOCATION_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_GEOCODING_URL: &str = "https://api.open-meteo.com/v1/geocoding";
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_CLOCK_TICK_MS: u64 = 1000;
pub const DEFAULT_ANALYSIS_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_PROCESSING_DELAY_MS: u64 = 100;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SPEECH_MS_PER_CHAR: u64 = 60;
pub const ENV_FORECAST_URL: &str = "MOOD_MIRROR_FORECAST_URL";
pub const ENV_GEOCODING_URL: &str = "MOOD_MIRROR_GEOCODING_URL";
pub const ENV_IP_LOOKUP_URL: &str = "MOOD_MIRROR_IP_LOOKUP_URL";
pub const ENV_LOCATION: &str = "MOOD_MIRROR_LOCATION";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
    pub fn new(value: f32) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ThresholdOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> f32 {
        self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

/// Every timer the mirror runs on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timing {
    pub clock_tick: Duration,
    pub analysis_interval: Duration,
    pub processing_delay: Duration,
    pub reveal_interval: Duration,
    pub mood_cooldown: Duration,
    pub geolocation_timeout: Duration,
    pub http_timeout: Duration,
    pub speech_per_char: Duration,
}

impl Timing {
    /// Periodic timers must be non-zero; one-shot delays may be zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periodic = [
            ("clock tick", self.clock_tick),
            ("analysis interval", self.analysis_interval),
            ("reveal interval", self.reveal_interval),
        ];
        match periodic.iter().find(|(_, d)| d.is_zero()) {
            Some((name, _)) => Err(ConfigError::ZeroInterval(*name)),
            None => Ok(()),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            clock_tick: Duration::from_millis(DEFAULT_CLOCK_TICK_MS),
            analysis_interval: Duration::from_millis(DEFAULT_ANALYSIS_INTERVAL_MS),
            processing_delay: Duration::from_millis(DEFAULT_PROCESSING_DELAY_MS),
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            mood_cooldown: DEFAULT_MOOD_COOLDOWN,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            speech_per_char: Duration::from_millis(DEFAULT_SPEECH_MS_PER_CHAR),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeatherEndpoints {
    pub forecast: String,
    pub geocoding: String,
    pub ip_lookup: String,
}

impl WeatherEndpoints {
    pub fn resolve(
        forecast: Option<String>,
        geocoding: Option<String>,
        ip_lookup: Option<String>,
        env: &impl Env,
    ) -> Result<Self, ConfigError> {
        let endpoints = Self {
            forecast: resolve_string_with_default(
                forecast,
                ENV_FORECAST_URL,
                env,
                DEFAULT_FORECAST_URL,
            ),
            geocoding: resolve_string_with_default(
                geocoding,
                ENV_GEOCODING_URL,
                env,
                DEFAULT_GEOCODING_URL,
            ),
            ip_lookup: resolve_string_with_default(
                ip_lookup,
                ENV_IP_LOOKUP_URL,
                env,
                DEFAULT_IP_LOOKUP_URL,
            ),
        };
        for url in [&endpoints.forecast, &endpoints.geocoding, &endpoints.ip_lookup] {
            url::Url::parse(url).map_err(|e| ConfigError::InvalidUrl(url.clone(), e.to_string()))?;
        }
        Ok(endpoints)
    }
}

impl Default for WeatherEndpoints {
    fn default() -> Self {
        Self {
            forecast: DEFAULT_FORECAST_URL.to_owned(),
            geocoding: DEFAULT_GEOCODING_URL.to_owned(),
            ip_lookup: DEFAULT_IP_LOOKUP_URL.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MirrorConfig {
    pub endpoints: WeatherEndpoints,
    /// Stands in for device geolocation; without it the device tier is
    /// unsupported and resolution starts at the IP lookup.
    pub device_location: Option<Coordinates>,
    pub confidence_threshold: ConfidenceThreshold,
    pub timing: Timing,
    pub camera_enabled: bool,
    pub voice_enabled: bool,
    /// Seeds every random source for reproducible runs.
    pub seed: Option<u64>,
    pub select_initial_quote: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            endpoints: WeatherEndpoints::default(),
            device_location: None,
            confidence_threshold: ConfidenceThreshold::default(),
            timing: Timing::default(),
            camera_enabled: true,
            voice_enabled: true,
            seed: None,
            select_initial_quote: true,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("confidence threshold must be within 0..=1, got {0}")]
    ThresholdOutOfRange(f32),
    #[error("{0} must be > 0 ms")]
    ZeroInterval(&'static str),
    #[error("location must be \"LAT,LON\", got {0:?}")]
    InvalidLocation(String),
    #[error("invalid url {0:?}: {1}")]
    InvalidUrl(String, String),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Parses "LAT,LON" in decimal degrees.
pub fn parse_location(value: &str) -> Result<Coordinates, ConfigError> {
    let invalid = || ConfigError::InvalidLocation(value.to_owned());
    let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
    Coordinates::new(lat, lon).map_err(|_| invalid())
}

pub fn resolve_location(
    cli_value: Option<String>,
    env: &impl Env,
) -> Result<Option<Coordinates>, ConfigError> {
    resolve_optional_string(cli_value, ENV_LOCATION, env)
        .map(|v| parse_location(&v))
        .transpose()
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}
