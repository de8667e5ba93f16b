use crate::weather::{
    condition_for_code, icon_for_condition, ms_to_kmh, round_half_up, Coordinates, WeatherError,
    WeatherProvider, WeatherSnapshot, FALLBACK_PLACE,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const LOG_TARGET: &str = "weather::open_meteo";
const CURRENT_FIELDS: &str = concat!(
    "temperature_2m,relative_humidity_2m,apparent_temperature,",
    "pressure_msl,wind_speed_10m,weather_code"
);

/// Current conditions plus reverse geocoding against the Open-Meteo API.
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    forecast_url: Url,
    geocoding_url: Url,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    pressure_msl: f64,
    /// Requested in m/s.
    wind_speed_10m: f64,
    weather_code: i64,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    name: String,
}

impl CurrentConditions {
    fn into_snapshot(self, location: String) -> WeatherSnapshot {
        let condition = condition_for_code(self.weather_code);
        WeatherSnapshot {
            temperature: round_half_up(self.temperature_2m),
            feels_like: round_half_up(self.apparent_temperature),
            pressure: round_half_up(self.pressure_msl),
            humidity: self.relative_humidity_2m,
            wind_speed: round_half_up(ms_to_kmh(self.wind_speed_10m)),
            condition: condition.to_owned(),
            location,
            icon: icon_for_condition(condition).to_owned(),
        }
    }
}

impl OpenMeteoClient {
    pub fn new(
        client: Client,
        forecast_url: &str,
        geocoding_url: &str,
    ) -> Result<Self, WeatherError> {
        Ok(Self {
            client,
            forecast_url: Url::parse(forecast_url)?,
            geocoding_url: Url::parse(geocoding_url)?,
        })
    }

    fn forecast_url_for(&self, at: Coordinates) -> Url {
        let mut url = self.forecast_url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &at.latitude.to_string())
            .append_pair("longitude", &at.longitude.to_string())
            .append_pair("current", CURRENT_FIELDS)
            .append_pair("wind_speed_unit", "ms")
            .append_pair("timezone", "auto");
        url
    }

    fn geocoding_url_for(&self, at: Coordinates) -> Url {
        let mut url = self.geocoding_url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &at.latitude.to_string())
            .append_pair("longitude", &at.longitude.to_string());
        url
    }

    async fn fetch_current(&self, at: Coordinates) -> Result<CurrentConditions, WeatherError> {
        let url = self.forecast_url_for(at);
        tracing::debug!(target: LOG_TARGET, %url, "fetching current conditions");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WeatherError::HttpStatus(status.as_u16(), error_text));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::InvalidResponse(format!("forecast: {e}")))?;
        Ok(body.current)
    }

    async fn lookup_place(&self, at: Coordinates) -> Result<Option<String>, WeatherError> {
        let response = self.client.get(self.geocoding_url_for(at)).send().await?;
        if !response.status().is_success() {
            return Err(WeatherError::HttpStatus(
                response.status().as_u16(),
                "reverse geocoding failed".to_owned(),
            ));
        }
        let body: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::InvalidResponse(format!("geocoding: {e}")))?;
        Ok(body.results.into_iter().next().map(|p| p.name))
    }

    /// Place name for the coordinates; any failure falls back to a generic label.
    async fn place_name(&self, at: Coordinates) -> String {
        match self.lookup_place(at).await {
            Ok(Some(name)) => name,
            Ok(None) => FALLBACK_PLACE.to_owned(),
            Err(e) => {
                tracing::debug!(target: LOG_TARGET, error = %e, "reverse geocoding unavailable");
                FALLBACK_PLACE.to_owned()
            }
        }
    }
}

impl WeatherProvider for OpenMeteoClient {
    fn current(&self, at: Coordinates) -> BoxFuture<'_, Result<WeatherSnapshot, WeatherError>> {
        async move {
            let current = self.fetch_current(at).await?;
            let location = self.place_name(at).await;
            Ok(current.into_snapshot(location))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST: &str = r#"{
        "latitude": 52.52,
        "longitude": 13.419998,
        "current_units": {"temperature_2m": "°C"},
        "current": {
            "time": "2024-06-01T14:00",
            "interval": 900,
            "temperature_2m": 18.5,
            "relative_humidity_2m": 71,
            "apparent_temperature": 17.4,
            "pressure_msl": 1012.6,
            "wind_speed_10m": 4.2,
            "weather_code": 63
        }
    }"#;

    fn client() -> OpenMeteoClient {
        OpenMeteoClient::new(
            Client::new(),
            "https://api.open-meteo.com/v1/forecast",
            "https://api.open-meteo.com/v1/geocoding",
        )
        .unwrap()
    }

    #[test]
    fn forecast_payload_maps_to_snapshot() {
        let body: ForecastResponse = serde_json::from_str(FORECAST).unwrap();
        let snapshot = body.current.into_snapshot("Berlin".to_owned());

        assert_eq!(snapshot.temperature, 19);
        assert_eq!(snapshot.feels_like, 17);
        assert_eq!(snapshot.pressure, 1013);
        assert_eq!(snapshot.humidity, 71.0);
        // 4.2 m/s = 15.12 km/h
        assert_eq!(snapshot.wind_speed, 15);
        assert_eq!(snapshot.condition, "moderate rain");
        assert_eq!(snapshot.icon, "fa-cloud-showers-heavy");
        assert_eq!(snapshot.location, "Berlin");
    }

    #[test]
    fn unmapped_code_yields_unknown_and_default_icon() {
        let json = FORECAST.replace("\"weather_code\": 63", "\"weather_code\": 42");
        let body: ForecastResponse = serde_json::from_str(&json).unwrap();
        let snapshot = body.current.into_snapshot(FALLBACK_PLACE.to_owned());
        assert_eq!(snapshot.condition, "unknown");
        assert_eq!(snapshot.icon, "fa-cloud-sun");
    }

    #[test]
    fn geocoding_without_results_parses_empty() {
        let body: GeocodingResponse =
            serde_json::from_str(r#"{"generationtime_ms": 0.1}"#).unwrap();
        assert!(body.results.is_empty());

        let body: GeocodingResponse =
            serde_json::from_str(r#"{"results": [{"name": "Lisbon", "id": 1}]}"#).unwrap();
        assert_eq!(body.results[0].name, "Lisbon");
    }

    #[test]
    fn forecast_url_carries_coordinates_and_fields() {
        let at = Coordinates::new(38.72, -9.14).unwrap();
        let url = client().forecast_url_for(at);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("latitude".into(), "38.72".into())));
        assert!(pairs.contains(&("longitude".into(), "-9.14".into())));
        assert!(pairs.contains(&("current".into(), CURRENT_FIELDS.into())));
        assert!(pairs.contains(&("wind_speed_unit".into(), "ms".into())));
        assert!(pairs.contains(&("timezone".into(), "auto".into())));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            OpenMeteoClient::new(Client::new(), "not a url", "https://example.com"),
            Err(WeatherError::InvalidUrl(_))
        ));
    }
}
