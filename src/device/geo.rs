//! Best-effort IP and geolocation lookups.
//!
//! Two third-party calls: an IP-echo service for the public address, then a
//! geolocation API keyed by that address. Any failure yields `None` for the
//! affected fields; device tracking continues without them.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info_span, warn, Instrument};

const DEFAULT_IP_ECHO_URL: &str = "https://api.ipify.org?format=json";
const DEFAULT_GEO_BASE_URL: &str = "https://ipapi.co";

#[derive(Debug, Deserialize)]
struct IpEcho {
    ip: String,
}

#[derive(Debug, Default, Deserialize)]
struct GeoInfo {
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

/// Coarse location attached to a device row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Client for the IP-echo and geolocation services.
#[derive(Debug)]
pub struct GeoClient {
    client: reqwest::Client,
    ip_echo_url: String,
    geo_base_url: String,
}

impl GeoClient {
    /// Build a client against the default third-party endpoints.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        Self::with_endpoints(
            DEFAULT_IP_ECHO_URL.to_string(),
            DEFAULT_GEO_BASE_URL.to_string(),
        )
    }

    /// Build a client against explicit endpoints.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_endpoints(ip_echo_url: String, geo_base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build geolocation HTTP client")?;

        Ok(Self {
            client,
            ip_echo_url,
            geo_base_url: geo_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve the public IP, or `None` when the echo service fails.
    pub async fn public_ip(&self) -> Option<String> {
        let span = info_span!("geo.public_ip", http.method = "GET");
        let result: Result<IpEcho> = async {
            let response = self
                .client
                .get(&self.ip_echo_url)
                .send()
                .await
                .context("IP echo request failed")?;
            response.json().await.context("Invalid IP echo response")
        }
        .instrument(span)
        .await;

        match result {
            Ok(echo) => Some(echo.ip),
            Err(err) => {
                warn!("failed to resolve public IP: {err}");
                None
            }
        }
    }

    /// Resolve coarse location for an IP; missing fields stay `None`.
    pub async fn location(&self, ip: &str) -> Location {
        let span = info_span!("geo.location", http.method = "GET");
        let result: Result<GeoInfo> = async {
            let response = self
                .client
                .get(format!("{}/{ip}/json/", self.geo_base_url))
                .send()
                .await
                .context("geolocation request failed")?;
            response
                .json()
                .await
                .context("Invalid geolocation response")
        }
        .instrument(span)
        .await;

        match result {
            Ok(info) => Location {
                country: info.country_name,
                city: info.city,
            },
            Err(err) => {
                warn!("failed to resolve location: {err}");
                Location::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn ip_echo_parses() -> Result<()> {
        let echo: IpEcho = serde_json::from_str(r#"{"ip":"203.0.113.7"}"#)?;
        assert_eq!(echo.ip, "203.0.113.7");
        Ok(())
    }

    #[test]
    fn geo_info_tolerates_missing_fields() -> Result<()> {
        let info: GeoInfo = serde_json::from_str(r#"{"city":"Berlin"}"#)?;
        assert_eq!(info.city.as_deref(), Some("Berlin"));
        assert!(info.country_name.is_none());

        let info: GeoInfo = serde_json::from_str("{}")?;
        assert!(info.city.is_none());
        Ok(())
    }

    #[test]
    fn client_trims_geo_base_slash() -> Result<()> {
        let client = GeoClient::with_endpoints(
            "https://echo.test".to_string(),
            "https://geo.test/".to_string(),
        )?;
        assert_eq!(client.geo_base_url, "https://geo.test");
        Ok(())
    }
}
