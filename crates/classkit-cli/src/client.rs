//! Client for the license service's admin routes.

use classkit_api::handlers::admin::{CreateLicenseRequest, CreateLicenseResponse};
use classkit_core::ids::LicenseCode;
use classkit_core::license::LicenseStats;
use reqwest::{Client, Method, StatusCode, Url};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    Request(reqwest::Error),
    InvalidUrl(String),
    Server(String),
    NotFound(String),
    Unauthorized,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Request(e) => write!(f, "Request failed: {}", e),
            ApiError::InvalidUrl(url) => write!(f, "Invalid api_url: {}", url),
            ApiError::Server(msg) => write!(f, "Server error: {}", msg),
            ApiError::NotFound(msg) => write!(f, "{}", msg),
            ApiError::Unauthorized => {
                write!(f, "Unauthorized: set admin_token with `classkit config set`")
            }
        }
    }
}

impl std::error::Error for ApiError {}

pub struct AdminClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl AdminClient {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base = Url::parse(api_url).map_err(|_| ApiError::InvalidUrl(api_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(api_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base,
            token,
        })
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<reqwest::RequestBuilder, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("admin")
            .extend(segments);

        let mut req = self.client.request(method, url);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        Ok(req)
    }

    pub async fn generate_code(
        &self,
        prefix: &str,
        max_devices: u32,
    ) -> Result<CreateLicenseResponse, ApiError> {
        let res = self
            .request(Method::POST, &["licenses"])?
            .json(&CreateLicenseRequest {
                prefix: Some(prefix.to_string()),
                code: None,
                max_devices,
            })
            .send()
            .await
            .map_err(ApiError::Request)?;

        match res.status() {
            StatusCode::CREATED | StatusCode::OK => res.json().await.map_err(ApiError::Request),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            _ => Err(ApiError::Server(error_text(res).await)),
        }
    }

    pub async fn stats(&self) -> Result<BTreeMap<LicenseCode, LicenseStats>, ApiError> {
        let res = self
            .request(Method::GET, &["licenses"])?
            .send()
            .await
            .map_err(ApiError::Request)?;

        match res.status() {
            StatusCode::OK => res.json().await.map_err(ApiError::Request),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            _ => Err(ApiError::Server(error_text(res).await)),
        }
    }

    /// Returns false when the code does not exist.
    pub async fn revoke(&self, code: &LicenseCode) -> Result<bool, ApiError> {
        let res = self
            .request(Method::DELETE, &["licenses", code.as_str()])?
            .send()
            .await
            .map_err(ApiError::Request)?;

        match res.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            _ => Err(ApiError::Server(error_text(res).await)),
        }
    }

    /// Returns false when the code does not exist.
    pub async fn reset_device(&self, code: &LicenseCode, device_id: &str) -> Result<bool, ApiError> {
        let res = self
            .request(Method::DELETE, &["licenses", code.as_str(), "devices", device_id])?
            .send()
            .await
            .map_err(ApiError::Request)?;

        match res.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            _ => Err(ApiError::Server(error_text(res).await)),
        }
    }
}

async fn error_text(res: reqwest::Response) -> String {
    let status = res.status();
    match res.json::<classkit_licensing::remote::ErrorBody>().await {
        Ok(body) => format!("{} ({})", body.error, status),
        Err(_) => status.to_string(),
    }
}
