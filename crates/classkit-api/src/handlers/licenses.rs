//! Device-facing license handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use classkit_core::ids::{DeviceId, LicenseCode};
use classkit_core::license::LicenseInfo;
use classkit_licensing::remote::{ActivateRequest, ValidityResponse};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Claim a slot of a code for the requesting device.
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(request): Json<ActivateRequest>,
) -> Result<Json<LicenseInfo>, ApiError> {
    let code = LicenseCode::new(code);
    if request.device_id.as_str().trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "deviceId is required"));
    }

    let info = state
        .registry
        .validate_and_activate(&code, &request.device_id, &request.device_name)
        .await?
        .into_result()?;

    info!(code = %info.code, device_id = %info.device_id, "Activation granted");
    Ok(Json(info))
}

/// Release the slot a device holds on a code.
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Path((code, device_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .registry
        .deactivate(&LicenseCode::new(code), &DeviceId::new(device_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Whether a device still holds a slot on a code.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Path((code, device_id)): Path<(String, String)>,
) -> Result<Json<ValidityResponse>, ApiError> {
    let valid = state
        .registry
        .check_still_valid(&LicenseCode::new(code), &DeviceId::new(device_id))
        .await?;
    Ok(Json(ValidityResponse { valid }))
}
