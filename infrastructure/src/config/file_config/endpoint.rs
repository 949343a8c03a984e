//! Endpoint configuration from TOML (`[endpoint]` section)

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::ConfigValidationError;

/// Raw endpoint configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEndpointConfig {
    /// Base URL; requests go to `{base_url}/query` and `{base_url}/health`
    pub base_url: String,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for FileEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: crate::http::DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl FileEndpointConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Parse `base_url`, accepting only `http` and `https`.
    pub fn parse_base_url(&self) -> Result<Url, ConfigValidationError> {
        let invalid = |reason: String| ConfigValidationError::InvalidBaseUrl {
            value: self.base_url.clone(),
            reason,
        };

        let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_port_8000() {
        let config = FileEndpointConfig::default();
        let url = config.parse_base_url().unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(8000));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let config = FileEndpointConfig {
            base_url: "ftp://example.test".to_string(),
            ..Default::default()
        };
        let err = config.parse_base_url().unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn test_rejects_relative_url() {
        let config = FileEndpointConfig {
            base_url: "/query".to_string(),
            ..Default::default()
        };
        assert!(config.parse_base_url().is_err());
    }
}
