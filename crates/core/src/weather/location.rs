use crate::weather::{Coordinates, GeoLocator, WeatherError};
use futures::future::BoxFuture;
use futures::FutureExt;

/// Device position supplied up front, e.g. from the command line.
#[derive(Clone, Copy, Debug)]
pub struct FixedLocation(pub Coordinates);

impl GeoLocator for FixedLocation {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates, WeatherError>> {
        let at = self.0;
        async move { Ok(at) }.boxed()
    }
}

/// Platform without device geolocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDeviceLocation;

impl GeoLocator for NoDeviceLocation {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates, WeatherError>> {
        async { Err(WeatherError::Unsupported) }.boxed()
    }
}
