//! Device capabilities the punch flow depends on. The HTTP layer implements
//! them from what the front end reported in the request.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, ToSchema)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    /// Meters
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Single high-accuracy fix. The caller bounds how long it may take.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Position, LocationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("capture cancelled")]
    Cancelled,
    #[error("capture failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn capture(&self) -> Result<CapturedPhoto, CaptureError>;
}

/// Error codes a browser geolocation API reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportedLocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

/// Location as reported by the front end in the punch request
#[derive(Debug, Clone)]
pub struct ReportedLocation {
    pub position: Option<Position>,
    pub error: Option<ReportedLocationError>,
}

#[async_trait]
impl LocationProvider for ReportedLocation {
    async fn current_position(&self) -> Result<Position, LocationError> {
        match (self.error, self.position) {
            (Some(ReportedLocationError::PermissionDenied), _) => Err(LocationError::Denied),
            (Some(ReportedLocationError::PositionUnavailable), _) => {
                Err(LocationError::Unavailable("position unavailable".into()))
            }
            (Some(ReportedLocationError::Timeout), _) => {
                Err(LocationError::Unavailable("device timed out".into()))
            }
            (None, Some(p)) => Ok(p),
            (None, None) => Err(LocationError::Unavailable("no position reported".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportedCaptureError {
    Cancelled,
    CameraDenied,
    Failed,
}

/// Selfie submitted with the punch, as a `data:image/...;base64,` URL
#[derive(Debug, Clone)]
pub struct ReportedPhoto {
    pub data_url: Option<String>,
    pub error: Option<ReportedCaptureError>,
}

#[async_trait]
impl Camera for ReportedPhoto {
    async fn capture(&self) -> Result<CapturedPhoto, CaptureError> {
        match (self.error, self.data_url.as_deref()) {
            (Some(ReportedCaptureError::Cancelled), _) => Err(CaptureError::Cancelled),
            (Some(ReportedCaptureError::CameraDenied), _) => {
                Err(CaptureError::Failed("camera access denied".into()))
            }
            (Some(ReportedCaptureError::Failed), _) => {
                Err(CaptureError::Failed("device could not capture a frame".into()))
            }
            (None, Some(url)) => decode_data_url(url),
            (None, None) => Err(CaptureError::Failed("no photo submitted".into())),
        }
    }
}

/// Splits `data:<mime>;base64,<payload>`; a bare base64 payload is taken as JPEG
pub fn decode_data_url(data_url: &str) -> Result<CapturedPhoto, CaptureError> {
    let (content_type, payload) = match data_url.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| CaptureError::Failed("malformed data URL".into()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| CaptureError::Failed("photo must be base64 encoded".into()))?;
            (mime.to_string(), payload)
        }
        None => ("image/jpeg".to_string(), data_url),
    };

    if !content_type.starts_with("image/") {
        return Err(CaptureError::Failed(format!("unsupported photo type {}", content_type)));
    }

    let bytes = B64
        .decode(payload.trim())
        .map_err(|e| CaptureError::Failed(format!("photo is not valid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(CaptureError::Failed("empty photo".into()));
    }

    Ok(CapturedPhoto {
        bytes,
        content_type,
    })
}
