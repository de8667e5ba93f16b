mod ip;
mod location;
mod open_meteo;
mod resolver;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use ip::IpGeoLocator;
pub use location::{FixedLocation, NoDeviceLocation};
pub use open_meteo::OpenMeteoClient;
pub use resolver::{ResolvedWeather, WeatherResolver, DEFAULT_GEOLOCATION_TIMEOUT};

pub const UNKNOWN_CONDITION: &str = "unknown";
pub const DEFAULT_ICON: &str = "fa-cloud-sun";
pub const FALLBACK_PLACE: &str = "Your Location";
pub const FETCH_FAILED: &str = "Unable to fetch weather";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WeatherError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(WeatherError::InvalidCoordinates(latitude, longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeatherSnapshot {
    /// Degrees Celsius.
    pub temperature: i32,
    pub feels_like: i32,
    /// Hectopascal.
    pub pressure: i32,
    /// Percent.
    pub humidity: f64,
    /// Kilometres per hour.
    pub wind_speed: i32,
    pub condition: String,
    pub location: String,
    pub icon: String,
}

impl WeatherSnapshot {
    /// Shown whenever no tier could produce real data.
    pub fn mock() -> Self {
        Self {
            temperature: 22,
            feels_like: 24,
            pressure: 1013,
            humidity: 65.0,
            wind_speed: 12,
            condition: "partly cloudy".to_owned(),
            location: "Your City".to_owned(),
            icon: DEFAULT_ICON.to_owned(),
        }
    }
}

/// Which tier of location resolution produced the snapshot.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherSource {
    Device,
    IpLookup,
    Mock,
}

#[derive(thiserror::Error, Debug)]
pub enum WeatherError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("geolocation not supported")]
    Unsupported,

    #[error("location lookup timed out")]
    Timeout,

    #[error("location not available")]
    LocationUnavailable,

    #[error("invalid coordinates: {0}, {1}")]
    InvalidCoordinates(f64, f64),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Something that can tell where the mirror is.
pub trait GeoLocator: Send + Sync {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates, WeatherError>>;
}

pub trait WeatherProvider: Send + Sync {
    fn current(&self, at: Coordinates) -> BoxFuture<'_, Result<WeatherSnapshot, WeatherError>>;
}

/// WMO weather interpretation code to a readable condition.
pub fn condition_for_code(code: i64) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 => "foggy",
        48 => "depositing rime fog",
        51 => "light drizzle",
        53 => "moderate drizzle",
        55 => "dense drizzle",
        61 => "slight rain",
        63 => "moderate rain",
        65 => "heavy rain",
        71 => "slight snow",
        73 => "moderate snow",
        75 => "heavy snow",
        77 => "snow grains",
        80 => "slight rain showers",
        81 => "moderate rain showers",
        82 => "violent rain showers",
        85 => "slight snow showers",
        86 => "heavy snow showers",
        95 => "thunderstorm",
        96 => "thunderstorm with slight hail",
        99 => "thunderstorm with heavy hail",
        _ => UNKNOWN_CONDITION,
    }
}

pub fn icon_for_condition(condition: &str) -> &'static str {
    match condition.to_lowercase().as_str() {
        "clear sky" | "mainly clear" => "fa-sun",
        "partly cloudy" => "fa-cloud-sun",
        "overcast" => "fa-cloud",
        "foggy" | "depositing rime fog" => "fa-smog",
        "light drizzle" | "moderate drizzle" | "dense drizzle" | "slight rain"
        | "slight rain showers" => "fa-cloud-rain",
        "moderate rain" | "heavy rain" | "moderate rain showers" | "violent rain showers" => {
            "fa-cloud-showers-heavy"
        }
        "slight snow" | "moderate snow" | "heavy snow" | "snow grains" | "slight snow showers"
        | "heavy snow showers" => "fa-snowflake",
        "thunderstorm" | "thunderstorm with slight hail" | "thunderstorm with heavy hail" => {
            "fa-bolt"
        }
        _ => DEFAULT_ICON,
    }
}

/// Rounds halves towards positive infinity, so -2.5 becomes -2.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

pub fn ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms * 3.6
}

/// What the weather widget shows.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WeatherPanel {
    pub loading: bool,
    pub snapshot: Option<WeatherSnapshot>,
    pub source: Option<WeatherSource>,
    pub error: Option<String>,
}

impl WeatherPanel {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Starts a refresh while keeping the previous snapshot on screen.
    pub fn begin_refresh(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn apply(&mut self, resolved: ResolvedWeather) {
        self.loading = false;
        self.error = None;
        self.snapshot = Some(resolved.snapshot);
        self.source = Some(resolved.source);
    }

    /// The resolution itself blew up: show the mock with an error and a retry.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
        self.snapshot = Some(WeatherSnapshot::mock());
        self.source = Some(WeatherSource::Mock);
    }

    pub fn offers_retry(&self) -> bool {
        self.error.is_some()
    }
}
