use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use strum_macros::IntoStaticStr;
use thiserror::Error;

use crate::store::StoreError;
use crate::store::object::ObjectStoreError;

/// Every way a punch can fail. Each one stops the flow; none is retried here.
#[derive(Debug, Error, IntoStaticStr)]
pub enum PunchError {
    #[error("Student profile not found.")]
    ProfileNotFound,

    #[error("You have already punched in today.")]
    AlreadyPunchedIn,

    #[error("You have already punched out today.")]
    AlreadyPunchedOut,

    #[error("You must punch in before you can punch out.")]
    NotPunchedInYet,

    #[error("Location permission denied. Please enable it in your browser.")]
    LocationDenied,

    #[error("Could not determine your location ({0}). Please try again.")]
    LocationUnavailable(String),

    #[error("You are {distance_m}m away. You must be within {radius_m}m of {campus} to punch.")]
    OutOfGeofence {
        distance_m: f64,
        radius_m: f64,
        campus: String,
    },

    #[error("Photo capture was cancelled.")]
    CaptureCancelled,

    #[error("Could not capture your photo: {0}")]
    CaptureFailed(String),

    #[error("Could not upload your photo: {0}")]
    UploadFailed(#[from] ObjectStoreError),

    #[error("Your attendance changed while saving. Please check today's status and try again.")]
    WriteConflict,

    #[error("Attendance store error: {0}")]
    Store(#[from] StoreError),
}

impl PunchError {
    /// Stable machine-readable name, e.g. `"OutOfGeofence"`
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

impl ResponseError for PunchError {
    fn status_code(&self) -> StatusCode {
        match self {
            PunchError::ProfileNotFound => StatusCode::NOT_FOUND,
            PunchError::AlreadyPunchedIn
            | PunchError::AlreadyPunchedOut
            | PunchError::NotPunchedInYet
            | PunchError::WriteConflict => StatusCode::CONFLICT,
            PunchError::LocationDenied | PunchError::OutOfGeofence { .. } => StatusCode::FORBIDDEN,
            PunchError::LocationUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PunchError::CaptureCancelled | PunchError::CaptureFailed(_) => StatusCode::BAD_REQUEST,
            PunchError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            PunchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let PunchError::OutOfGeofence {
            distance_m,
            radius_m,
            campus,
        } = self
        {
            body["distanceM"] = json!(distance_m);
            body["radiusM"] = json!(radius_m);
            body["campus"] = json!(campus);
        }
        if let PunchError::Store(e) = self {
            tracing::error!(error = %e, "store failure during punch");
            // don't leak backend details
            body["message"] = json!("Something went wrong, please try again later");
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Errors from the read-side endpoints
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Store(e) => {
                tracing::error!(error = %e, "store failure");
                "Something went wrong, please try again later".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
