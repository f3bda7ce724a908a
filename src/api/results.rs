use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::services::results::result_for;
use crate::state::AppState;
use actix_web::{HttpResponse, web};

pub const RESULT_NOT_PUBLISHED: &str = "Result is not updated. Contact your branch.";

/// Latest published result sheet
#[utoipa::path(
    get,
    path = "/api/results",
    responses(
        (status = 200, description = "Result sheet", body = ResultResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not published yet", body = Object, example = json!({
            "message": "Result is not updated. Contact your branch."
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Results"
)]
pub async fn my_result(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    match result_for(state.store.as_ref(), &auth.number).await? {
        Some(sheet) => Ok(HttpResponse::Ok().json(sheet)),
        None => Err(ApiError::NotFound(RESULT_NOT_PUBLISHED.into())),
    }
}
