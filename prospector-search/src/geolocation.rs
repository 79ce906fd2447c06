use async_trait::async_trait;
use prospector_common::{Coordinates, ProspectorError, Result};
use prospector_config::{GeolocationSettings, LocationProvider};
use prospector_http::{HttpClient, HttpError, RequestOpts};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Why a position could not be obtained. Never shown to the user.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("location access denied")]
    Denied,

    #[error("location is not supported on this machine")]
    Unsupported,

    #[error("location lookup failed: {0}")]
    Lookup(String),

    #[error("location lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// A one-shot source of the current position.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self) -> std::result::Result<Coordinates, GeoError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Resolve coordinates if the user consented, within `timeout`.
///
/// Every failure is logged and folded into `None`; the source is not
/// contacted at all without consent.
pub async fn acquire_location(
    source: &dyn LocationSource,
    consent: bool,
    timeout: Duration,
) -> Option<Coordinates> {
    if !consent {
        return None;
    }

    let outcome = match tokio::time::timeout(timeout, source.current_position()).await {
        Ok(outcome) => outcome,
        Err(_) => Err(GeoError::Timeout(timeout)),
    };

    match outcome {
        Ok(coordinates) => {
            tracing::debug!(source = source.name(), %coordinates, "geolocation.resolved");
            Some(coordinates)
        }
        Err(error) => {
            tracing::warn!(source = source.name(), %error, "geolocation.unavailable");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
}

fn parse_ip_lookup(body: IpLookupResponse) -> std::result::Result<Coordinates, GeoError> {
    if body.status.as_deref() == Some("fail") {
        let reason = body.message.unwrap_or_else(|| "unknown reason".to_string());
        return Err(GeoError::Lookup(reason));
    }
    let (Some(lat), Some(lon)) = (body.lat, body.lon) else {
        return Err(GeoError::Lookup("response carried no coordinates".to_string()));
    };
    let coordinates = Coordinates::new(lat, lon);
    if !coordinates.is_valid() {
        return Err(GeoError::Lookup(format!("coordinates out of range: {lat}, {lon}")));
    }
    Ok(coordinates)
}

/// Approximate position from an IP geolocation service.
pub struct IpLocation {
    http: HttpClient,
}

impl IpLocation {
    /// `endpoint` is the full lookup URL, e.g. `http://ip-api.com/json`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(endpoint)
            .map_err(|e| ProspectorError::Setup(format!("location client init failed: {e}")))?
            .with_timeout(timeout)
            .with_retries(0);
        Ok(Self { http })
    }
}

#[async_trait]
impl LocationSource for IpLocation {
    async fn current_position(&self) -> std::result::Result<Coordinates, GeoError> {
        let body: IpLookupResponse = self
            .http
            .get_json("", RequestOpts::default())
            .await
            .map_err(|err| match err {
                HttpError::Timeout(after) => GeoError::Timeout(after),
                HttpError::Api { status, .. } if status.as_u16() == 403 => GeoError::Denied,
                other => GeoError::Lookup(other.to_string()),
            })?;
        parse_ip_lookup(body)
    }

    fn name(&self) -> &'static str {
        "ip"
    }
}

/// Coordinates supplied up front (config or command line).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    coordinates: Coordinates,
}

impl FixedLocation {
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(&self) -> std::result::Result<Coordinates, GeoError> {
        if self.coordinates.is_valid() {
            Ok(self.coordinates)
        } else {
            Err(GeoError::Lookup(format!(
                "configured coordinates out of range: {}",
                self.coordinates
            )))
        }
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// No location support on this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl LocationSource for Unavailable {
    async fn current_position(&self) -> std::result::Result<Coordinates, GeoError> {
        Err(GeoError::Unsupported)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Build the configured source. `fixed` without both coordinates is a
/// configuration error.
pub fn location_source_from_settings(
    settings: &GeolocationSettings,
) -> Result<Arc<dyn LocationSource>> {
    let source: Arc<dyn LocationSource> = match settings.provider {
        LocationProvider::Ip => Arc::new(IpLocation::new(&settings.endpoint, settings.timeout())?),
        LocationProvider::Fixed => {
            let coordinates = settings.fixed_coordinates().ok_or_else(|| {
                ProspectorError::Config(
                    "geolocation.provider is 'fixed' but latitude/longitude are not both set"
                        .to_string(),
                )
            })?;
            Arc::new(FixedLocation::new(coordinates))
        }
        LocationProvider::None => Arc::new(Unavailable),
    };
    tracing::debug!(source = source.name(), "geolocation.source.ready");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> std::result::Result<Coordinates, GeoError> {
        parse_ip_lookup(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn accepts_short_and_long_field_names() {
        assert_eq!(
            parse(json!({ "status": "success", "lat": 52.52, "lon": 13.405 })),
            Ok(Coordinates::new(52.52, 13.405))
        );
        assert_eq!(
            parse(json!({ "latitude": -33.86, "longitude": 151.21 })),
            Ok(Coordinates::new(-33.86, 151.21))
        );
    }

    #[test]
    fn fail_envelope_and_bad_values_are_lookup_errors() {
        assert_eq!(
            parse(json!({ "status": "fail", "message": "reserved range" })),
            Err(GeoError::Lookup("reserved range".into()))
        );
        assert!(matches!(parse(json!({ "lat": 10.0 })), Err(GeoError::Lookup(_))));
        assert!(matches!(
            parse(json!({ "lat": 91.0, "lon": 0.0 })),
            Err(GeoError::Lookup(_))
        ));
    }

    struct Never;

    #[async_trait]
    impl LocationSource for Never {
        async fn current_position(&self) -> std::result::Result<Coordinates, GeoError> {
            std::future::pending().await
        }

        fn name(&self) -> &'static str {
            "never"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_none() {
        let got = acquire_location(&Never, true, Duration::from_secs(10)).await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn no_consent_skips_the_source() {
        let fixed = FixedLocation::new(Coordinates::new(1.0, 2.0));
        assert_eq!(acquire_location(&fixed, false, Duration::from_secs(1)).await, None);
        assert_eq!(
            acquire_location(&fixed, true, Duration::from_secs(1)).await,
            Some(Coordinates::new(1.0, 2.0))
        );
        assert_eq!(acquire_location(&Unavailable, true, Duration::from_secs(1)).await, None);
    }

    #[test]
    fn fixed_provider_needs_both_coordinates() {
        let settings = GeolocationSettings {
            provider: LocationProvider::Fixed,
            latitude: Some(1.0),
            ..GeolocationSettings::default()
        };
        assert!(matches!(
            location_source_from_settings(&settings),
            Err(ProspectorError::Config(_))
        ));

        let settings = GeolocationSettings {
            provider: LocationProvider::None,
            ..GeolocationSettings::default()
        };
        assert_eq!(location_source_from_settings(&settings).unwrap().name(), "none");
    }
}
