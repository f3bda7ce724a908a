use crate::config::Config;
use actix_web::{HttpResponse, Responder, web};

#[utoipa::path(
    get,
    path = "/api/helpdesk",
    responses(
        (status = 200, description = "Help desk contact links", body = HelpContact),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Help"
)]
pub async fn contact(config: web::Data<Config>) -> impl Responder {
    HttpResponse::Ok().json(config.help.contact())
}
