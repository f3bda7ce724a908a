use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::banner::Banner;
use crate::model::student::StudentProfile;
use crate::services::banners::active_banners;
use crate::state::AppState;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[schema(example = "Asha Patil")]
    pub display_name: String,
    pub profile: Option<StudentProfile>,
    pub banners: Vec<Banner>,
}

/// Display name when the profile has none: the login email's local part
fn fallback_name(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

/// The signed-in student's profile
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Student profile", body = StudentProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No student profile for this login")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn me(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    match state.profiles.load_by_email(&auth.email).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile)),
        None => Err(ApiError::NotFound("Student profile not found.".into())),
    }
}

/// Profile and banners in one round trip
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn dashboard(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let (profile, banners) = futures::join!(
        state.profiles.load_by_email(&auth.email),
        active_banners(state.store.as_ref())
    );

    let profile = profile?;
    // banners are decoration; the dashboard still renders without them
    let banners = banners.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "banners unavailable");
        Vec::new()
    });

    let display_name = profile
        .as_ref()
        .and_then(|p| p.name.clone())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| fallback_name(&auth.email));

    Ok(HttpResponse::Ok().json(DashboardResponse {
        display_name,
        profile,
        banners,
    }))
}
