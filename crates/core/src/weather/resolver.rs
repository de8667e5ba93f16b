use crate::weather::{
    Coordinates, GeoLocator, WeatherError, WeatherProvider, WeatherSnapshot, WeatherSource,
};
use std::sync::Arc;
use std::time::Duration;

const LOG_TARGET: &str = "weather::resolver";

pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedWeather {
    pub snapshot: WeatherSnapshot,
    pub source: WeatherSource,
}

/// Three-tier weather lookup: device position, then IP position, then a
/// static mock. Never fails; every error just moves on to the next tier.
#[derive(Clone)]
pub struct WeatherResolver {
    device: Arc<dyn GeoLocator>,
    ip: Arc<dyn GeoLocator>,
    provider: Arc<dyn WeatherProvider>,
    geolocation_timeout: Duration,
}

impl WeatherResolver {
    pub fn new(
        device: Arc<dyn GeoLocator>,
        ip: Arc<dyn GeoLocator>,
        provider: Arc<dyn WeatherProvider>,
    ) -> Self {
        Self {
            device,
            ip,
            provider,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
        }
    }

    pub fn with_geolocation_timeout(mut self, timeout: Duration) -> Self {
        self.geolocation_timeout = timeout;
        self
    }

    async fn device_position(&self) -> Result<Coordinates, WeatherError> {
        tokio::time::timeout(self.geolocation_timeout, self.device.locate())
            .await
            .map_err(|_| WeatherError::Timeout)?
    }

    async fn weather_at(
        &self,
        position: Result<Coordinates, WeatherError>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        self.provider.current(position?).await
    }

    pub async fn resolve(&self) -> ResolvedWeather {
        match self.weather_at(self.device_position().await).await {
            Ok(snapshot) => {
                return ResolvedWeather {
                    snapshot,
                    source: WeatherSource::Device,
                }
            }
            Err(e) => {
                tracing::info!(
                    target: LOG_TARGET,
                    error = %e,
                    "device location tier failed, trying ip lookup"
                );
            }
        }

        match self.weather_at(self.ip.locate().await).await {
            Ok(snapshot) => {
                return ResolvedWeather {
                    snapshot,
                    source: WeatherSource::IpLookup,
                }
            }
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    error = %e,
                    "ip lookup tier failed, using mock weather"
                );
            }
        }

        ResolvedWeather {
            snapshot: WeatherSnapshot::mock(),
            source: WeatherSource::Mock,
        }
    }
}
