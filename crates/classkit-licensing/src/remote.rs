//! HTTP client for a remote license service.

use async_trait::async_trait;
use classkit_core::ids::{DeviceId, LicenseCode};
use classkit_core::license::{ActivationOutcome, LicenseInfo, Rejection};
use classkit_core::ports::LicenseAuthority;
use classkit_core::{Error, Result};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Remote license service configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Service base URL, e.g. `https://licenses.example.com/api/v1`.
    pub api_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api/v1".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    pub device_id: DeviceId,
    pub device_name: String,
}

/// Error body returned by the service.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_devices: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidityResponse {
    pub valid: bool,
}

/// [`LicenseAuthority`] answered by the license HTTP service.
pub struct HttpLicenseAuthority {
    base: Url,
    client: reqwest::Client,
}

impl HttpLicenseAuthority {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| Error::InvalidArgument(format!("invalid api_url {:?}: {}", config.api_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidArgument(format!(
                "api_url {:?} cannot be used as a base URL",
                config.api_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { base, client })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Internal("base URL cannot take path segments".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl LicenseAuthority for HttpLicenseAuthority {
    async fn activate(
        &self,
        code: &LicenseCode,
        device_id: &DeviceId,
        device_name: &str,
    ) -> Result<ActivationOutcome> {
        let url = self.url(&["licenses", code.as_str(), "activate"])?;
        info!(code = %code, device_id = %device_id, "Activating license remotely");

        let response = self
            .client
            .post(url)
            .json(&ActivateRequest {
                device_id: device_id.clone(),
                device_name: device_name.to_string(),
            })
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let info: LicenseInfo = response
                    .json()
                    .await
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                debug!(code = %info.code, "Remote activation accepted");
                Ok(ActivationOutcome::Activated(info))
            }
            StatusCode::NOT_FOUND => {
                warn!(code = %code, "Remote service does not know the code");
                Ok(ActivationOutcome::Rejected(Rejection::InvalidCode {
                    code: code.clone(),
                }))
            }
            StatusCode::CONFLICT => {
                let body: ErrorBody = response
                    .json()
                    .await
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                let Some(max_devices) = body.max_devices else {
                    error!(code = %code, error = %body.error, "Conflict without a device limit");
                    return Err(Error::Network(format!(
                        "license service refused activation: {}",
                        body.error
                    )));
                };
                warn!(code = %code, error = %body.error, "Remote device limit reached");
                Ok(ActivationOutcome::Rejected(Rejection::DeviceLimitReached {
                    code: code.clone(),
                    max_devices,
                }))
            }
            status => {
                error!(status = %status, "License activation request failed");
                Err(Error::Network(format!("license service returned {}", status)))
            }
        }
    }

    async fn deactivate(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<()> {
        let url = self.url(&["licenses", code.as_str(), "activations", device_id.as_str()])?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            error!(status = %status, "License deactivation request failed");
            Err(Error::Network(format!("license service returned {}", status)))
        }
    }

    async fn check_still_valid(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<bool> {
        let url = self.url(&["licenses", code.as_str(), "activations", device_id.as_str()])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let body: ValidityResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(body.valid)
            }
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Error::Network(format!("license service returned {}", status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let authority = HttpLicenseAuthority::new(RemoteConfig {
            api_url: "https://licenses.example.com/api/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();

        let url = authority
            .url(&["licenses", "COFFEE2024", "activations", "A1B2"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://licenses.example.com/api/v1/licenses/COFFEE2024/activations/A1B2"
        );

        // Segments are escaped, never interpreted as path separators
        let url = authority.url(&["licenses", "A/B C", "activate"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://licenses.example.com/api/v1/licenses/A%2FB%20C/activate"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let result = HttpLicenseAuthority::new(RemoteConfig {
            api_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
