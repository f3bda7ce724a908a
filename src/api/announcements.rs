use crate::error::ApiError;
use crate::services::announcements::latest;
use crate::state::AppState;
use actix_web::{HttpResponse, web};

#[utoipa::path(
    get,
    path = "/api/announcements",
    responses(
        (status = 200, description = "Newest 25 announcements", body = [Announcement]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn list(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(latest(state.store.as_ref()).await?))
}
