use crate::attendance::device::{
    Position, ReportedCaptureError, ReportedLocation, ReportedLocationError, ReportedPhoto,
};
use crate::attendance::normalizer::AttendanceRecord;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, PunchError};
use crate::model::attendance::{ATTENDANCE_COLLECTION, AttendanceSummary, PunchType};
use crate::services::history::{MonthSection, build_history};
use crate::state::AppState;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the device reported for a punch attempt
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchRequest {
    #[serde(rename = "type")]
    pub punch_type: PunchType,
    /// Fix from the browser geolocation API
    pub location: Option<Position>,
    /// Set instead of `location` when the device could not produce a fix
    pub location_error: Option<ReportedLocationError>,
    /// Selfie as a `data:image/jpeg;base64,...` URL
    pub photo: Option<String>,
    pub capture_error: Option<ReportedCaptureError>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckRequest {
    #[serde(rename = "type")]
    pub punch_type: PunchType,
    pub location: Option<Position>,
    pub location_error: Option<ReportedLocationError>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub summary: AttendanceSummary,
    pub months: Vec<MonthSection>,
}

/// Today's IN/OUT status
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Status for today's date key", body = DayStatus),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let status = state.punches.today_status(&auth.number).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Past days grouped by month, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    responses(
        (status = 200, description = "Attendance history", body = HistoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let record = state
        .store
        .get(ATTENDANCE_COLLECTION, &auth.number)
        .await?
        .map(|doc| AttendanceRecord::from_body(&doc.body))
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(HistoryResponse {
        months: build_history(&record.days, &state.calendar),
        summary: record.summary,
    }))
}

/// Runs every check short of the photo, so the front end only opens the
/// camera when the punch can succeed
#[utoipa::path(
    post,
    path = "/api/attendance/precheck",
    request_body = PrecheckRequest,
    responses(
        (status = 200, description = "Punch may proceed", body = PunchPlan),
        (status = 403, description = "Location denied or outside the geofence", body = Object, example = json!({
            "code": "OutOfGeofence",
            "message": "You are 60m away. You must be within 50m of ABS Main to punch.",
            "distanceM": 60, "radiusM": 50, "campus": "ABS Main"
        })),
        (status = 404, description = "No student profile for this login"),
        (status = 409, description = "Out of order for today"),
        (status = 422, description = "Location unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn precheck(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<PrecheckRequest>,
) -> Result<HttpResponse, PunchError> {
    let body = body.into_inner();
    let location = ReportedLocation {
        position: body.location,
        error: body.location_error,
    };

    let plan = state
        .punches
        .precheck(&auth.email, body.punch_type, &location)
        .await?;
    Ok(HttpResponse::Ok().json(plan))
}

/// Records an IN or OUT punch with location and selfie
#[utoipa::path(
    post,
    path = "/api/attendance/punch",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Punch recorded", body = PunchOutcome),
        (status = 400, description = "Photo missing or capture cancelled"),
        (status = 403, description = "Location denied or outside the geofence"),
        (status = 404, description = "No student profile for this login"),
        (status = 409, description = "Out of order for today, or the record changed while saving", body = Object, example = json!({
            "code": "AlreadyPunchedIn",
            "message": "You have already punched in today."
        })),
        (status = 422, description = "Location unavailable"),
        (status = 502, description = "Photo upload failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn punch(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<PunchRequest>,
) -> Result<HttpResponse, PunchError> {
    let body = body.into_inner();
    let location = ReportedLocation {
        position: body.location,
        error: body.location_error,
    };
    let camera = ReportedPhoto {
        data_url: body.photo,
        error: body.capture_error,
    };

    let outcome = state
        .punches
        .punch(&auth.email, body.punch_type, &location, &camera)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}
