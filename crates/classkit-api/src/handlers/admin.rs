//! Admin handlers: issuing, listing and revoking codes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use classkit_core::ids::{DeviceId, LicenseCode};
use classkit_core::license::LicenseStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicenseRequest {
    #[serde(default)]
    pub prefix: Option<String>,
    /// Exact code to register instead of generating one.
    #[serde(default)]
    pub code: Option<LicenseCode>,
    #[serde(default = "default_max_devices")]
    pub max_devices: u32,
}

fn default_max_devices() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicenseResponse {
    pub code: LicenseCode,
    pub max_devices: u32,
}

pub async fn create_license(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateLicenseRequest>,
) -> Result<(StatusCode, Json<CreateLicenseResponse>), ApiError> {
    let code = match request.code {
        Some(code) => {
            if !state.registry.register_code(&code, request.max_devices).await? {
                return Err(ApiError::new(
                    StatusCode::CONFLICT,
                    format!("Code {} already exists", code),
                ));
            }
            code
        }
        None => {
            let prefix = request
                .prefix
                .as_deref()
                .unwrap_or(classkit_licensing::codes::DEFAULT_PREFIX);
            state
                .registry
                .generate_code(prefix, request.max_devices)
                .await?
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateLicenseResponse {
            code,
            max_devices: request.max_devices,
        }),
    ))
}

/// Usage of every code.
pub async fn list_licenses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<LicenseCode, LicenseStats>>, ApiError> {
    Ok(Json(state.registry.stats().await?))
}

pub async fn revoke_license(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError> {
    let code = LicenseCode::new(code);
    if state.registry.revoke(&code).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Unknown code {}", code)))
    }
}

pub async fn reset_device(
    State(state): State<Arc<AppState>>,
    Path((code, device_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let code = LicenseCode::new(code);
    if state
        .registry
        .reset_device_for_code(&code, &DeviceId::new(device_id))
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Unknown code {}", code)))
    }
}
