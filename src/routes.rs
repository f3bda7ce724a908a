use crate::{
    api::{announcements, attendance, helpdesk, lectures, results, student},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Selfies arrive inline as base64 data URLs
const PUNCH_BODY_LIMIT: usize = 8 * 1024 * 1024;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(student::me)))
            .service(web::resource("/dashboard").route(web::get().to(student::dashboard)))
            .service(
                web::scope("/attendance")
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    .service(
                        web::resource("/precheck").route(web::post().to(attendance::precheck)),
                    )
                    .service(
                        web::resource("/punch")
                            .app_data(web::JsonConfig::default().limit(PUNCH_BODY_LIMIT))
                            .route(web::post().to(attendance::punch)),
                    ),
            )
            .service(
                web::scope("/lectures")
                    .service(web::resource("/today").route(web::get().to(lectures::today)))
                    .service(web::resource("/tomorrow").route(web::get().to(lectures::tomorrow)))
                    .service(
                        web::resource("/branch-month").route(web::get().to(lectures::branch_month)),
                    ),
            )
            .service(web::resource("/results").route(web::get().to(results::my_result)))
            .service(web::resource("/announcements").route(web::get().to(announcements::list)))
            .service(web::resource("/helpdesk").route(web::get().to(helpdesk::contact))),
    );
}

// LOGIN { number, password }
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, old refresh token revoked
