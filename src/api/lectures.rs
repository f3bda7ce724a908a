use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::student::StudentProfile;
use crate::services::lectures::{BRANCH_WINDOW_DAYS, TodayTomorrow, branch_window, today_tomorrow};
use crate::state::AppState;
use actix_web::{HttpResponse, web};

async fn profile_of(auth: &AuthUser, state: &AppState) -> Result<StudentProfile, ApiError> {
    state
        .profiles
        .load_by_email(&auth.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student profile not found.".into()))
}

async fn schedule(auth: &AuthUser, state: &AppState) -> Result<TodayTomorrow, ApiError> {
    let profile = profile_of(auth, state).await?;
    let now = state.clock.now();
    let today = state.calendar.date_key(now);
    let tomorrow = state.calendar.date_key_plus_days(now, 1);
    Ok(today_tomorrow(state.store.as_ref(), &profile, &today, &tomorrow).await?)
}

/// Today's sessions for the student's cohort, by start time
#[utoipa::path(
    get,
    path = "/api/lectures/today",
    responses(
        (status = 200, description = "Sessions", body = [LectureSession]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No student profile for this login")
    ),
    security(("bearer_auth" = [])),
    tag = "Lectures"
)]
pub async fn today(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let sessions = schedule(&auth, &state).await?.today;
    Ok(HttpResponse::Ok().json(sessions))
}

#[utoipa::path(
    get,
    path = "/api/lectures/tomorrow",
    responses(
        (status = 200, description = "Sessions", body = [LectureSession]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No student profile for this login")
    ),
    security(("bearer_auth" = [])),
    tag = "Lectures"
)]
pub async fn tomorrow(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let sessions = schedule(&auth, &state).await?.tomorrow;
    Ok(HttpResponse::Ok().json(sessions))
}

/// Every session at the student's branch from today through the next 30 days
#[utoipa::path(
    get,
    path = "/api/lectures/branch-month",
    responses(
        (status = 200, description = "Sessions ordered by date then start", body = [LectureSession]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No student profile for this login")
    ),
    security(("bearer_auth" = [])),
    tag = "Lectures"
)]
pub async fn branch_month(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = profile_of(&auth, &state).await?;
    let now = state.clock.now();
    let from = state.calendar.date_key(now);
    let to = state.calendar.date_key_plus_days(now, BRANCH_WINDOW_DAYS);

    let sessions = branch_window(
        state.store.as_ref(),
        profile.branch.as_deref().unwrap_or_default(),
        &from,
        &to,
    )
    .await?;
    Ok(HttpResponse::Ok().json(sessions))
}
