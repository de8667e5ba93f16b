use crate::weather::{Coordinates, GeoLocator, WeatherError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const LOG_TARGET: &str = "weather::ip";

/// Coarse position from the public IP address.
#[derive(Clone)]
pub struct IpGeoLocator {
    client: Client,
    url: Url,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
}

impl IpLookupResponse {
    fn coordinates(&self) -> Result<Coordinates, WeatherError> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => Err(WeatherError::LocationUnavailable),
        }
    }
}

impl IpGeoLocator {
    pub fn new(client: Client, url: &str) -> Result<Self, WeatherError> {
        Ok(Self {
            client,
            url: Url::parse(url)?,
        })
    }
}

impl GeoLocator for IpGeoLocator {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates, WeatherError>> {
        async move {
            let response = self.client.get(self.url.clone()).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(WeatherError::HttpStatus(status.as_u16(), error_text));
            }

            let body: IpLookupResponse = response
                .json()
                .await
                .map_err(|e| WeatherError::InvalidResponse(format!("ip lookup: {e}")))?;
            let at = body.coordinates()?;
            tracing::debug!(
                target: LOG_TARGET,
                city = body.city.as_deref().unwrap_or("?"),
                "located by ip"
            );
            Ok(at)
        }
        .boxed()
    }
}
