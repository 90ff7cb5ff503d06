//! Mapping of domain errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use classkit_core::Error;
use classkit_core::license::Rejection;
use classkit_licensing::remote::ErrorBody;
use tracing::error;

/// Error returned by handlers.
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                max_devices: None,
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            e if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "Request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        let message = rejection.to_string();
        match rejection {
            Rejection::InvalidCode { .. } => Self::not_found(message),
            Rejection::DeviceLimitReached { max_devices, .. } => Self {
                status: StatusCode::CONFLICT,
                body: ErrorBody {
                    error: message,
                    max_devices: Some(max_devices),
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contention_is_retryable_not_a_limit() {
        let err = ApiError::from(Error::StoreContention {
            code: "COFFEE2024".to_string(),
            attempts: 16,
        });
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.body.max_devices.is_none());
    }

    #[test]
    fn test_device_limit_carries_max_devices() {
        let err = ApiError::from(Rejection::DeviceLimitReached {
            code: classkit_core::ids::LicenseCode::new("COFFEE2024"),
            max_devices: 3,
        });
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.body.max_devices, Some(3));
        assert!(err.body.error.contains('3'));
    }
}
