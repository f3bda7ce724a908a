use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    model::user::{REFRESH_TOKENS_COLLECTION, RefreshTokenRecord, USERS_COLLECTION, UserAccount},
    models::{Claims, LoginReqDto, TokenPair, TokenType},
    state::AppState,
    store::{Expect, MergePatch, StoreError},
    utils::identity::{email_to_number, number_to_email},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::{debug, error, info, instrument, warn};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Signs both tokens and records the refresh token so it can be rotated or
/// revoked later
async fn issue_pair(
    state: &AppState,
    config: &Config,
    email: &str,
    number: &str,
) -> Result<TokenPair, HttpResponse> {
    let access_token = generate_access_token(email, number, &config.jwt_secret, config.access_token_ttl);
    let refresh = generate_refresh_token(email, number, &config.jwt_secret, config.refresh_token_ttl);
    let (access_token, (refresh_token, refresh_claims)) = match (access_token, refresh) {
        (Ok(a), Ok(r)) => (a, r),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to sign token");
            return Err(HttpResponse::InternalServerError().finish());
        }
    };

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    let record = MergePatch::new()
        .set("email", email)
        .set("expiresAt", refresh_claims.exp as i64)
        .set("revoked", false);
    if let Err(e) = state
        .store
        .merge(REFRESH_TOKENS_COLLECTION, &refresh_claims.jti, &record, Expect::Absent)
        .await
    {
        error!(error = %e, "Failed to store refresh token");
        return Err(HttpResponse::InternalServerError().finish());
    }

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 400, description = "Number or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(state, config, user),
    fields(number = %email_to_number(&user.number))
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    // 1️⃣ Basic validation
    let email = number_to_email(&user.number, &config.login_domain);
    if email.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty number or password");
        return HttpResponse::BadRequest().body("Number and password required");
    }

    // 2️⃣ Fetch account
    let doc = match state.store.get(USERS_COLLECTION, &email).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            info!("Invalid credentials: account not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Store error while fetching account");
            return HttpResponse::InternalServerError().finish();
        }
    };
    let account: UserAccount = match serde_json::from_value(doc.body.into()) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "Unreadable account record");
            return HttpResponse::InternalServerError().finish();
        }
    };
    if !account.is_active {
        info!("Login refused: account disabled");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    // 3️⃣ Verify password
    if let Err(e) = verify_password(&user.password, &account.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    // 4️⃣ Tokens
    let number = email_to_number(&email);
    let pair = match issue_pair(&state, &config, &email, &number).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    // 5️⃣ Update lastLoginAt (non-fatal)
    let touch = MergePatch::new().server_timestamp("lastLoginAt");
    if let Err(e) = state.store.merge(USERS_COLLECTION, &email, &touch, Expect::Any).await {
        warn!(error = %e, "Failed to update lastLoginAt");
    }

    info!("Login successful");
    HttpResponse::Ok().json(pair)
}

/// Loads the stored record behind a refresh token and checks it is still live
async fn live_refresh(state: &AppState, claims: &Claims) -> Result<Option<u64>, StoreError> {
    let Some(doc) = state.store.get(REFRESH_TOKENS_COLLECTION, &claims.jti).await? else {
        return Ok(None);
    };
    let record: RefreshTokenRecord = match serde_json::from_value(doc.body.into()) {
        Ok(r) => r,
        Err(_) => return Ok(None),
    };
    if record.revoked || record.email != claims.sub {
        return Ok(None);
    }
    Ok(Some(doc.version))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, expired or already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::Unauthorized().body("No token");
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    let version = match live_refresh(&state, &claims).await {
        Ok(Some(v)) => v,
        Ok(None) => return HttpResponse::Unauthorized().finish(),
        Err(e) => {
            error!(error = %e, "Store error while reading refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    // 🔥 revoke old refresh token; a concurrent rotation loses the race
    let revoke = MergePatch::new().set("revoked", true);
    match state
        .store
        .merge(REFRESH_TOKENS_COLLECTION, &claims.jti, &revoke, Expect::Version(version))
        .await
    {
        Ok(_) => {}
        Err(StoreError::Conflict { .. }) => return HttpResponse::Unauthorized().finish(),
        Err(e) => {
            error!(error = %e, "Failed to revoke refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    }

    match issue_pair(&state, &config, &claims.sub, &claims.number).await {
        Ok(pair) => HttpResponse::Ok().json(pair),
        Err(resp) => resp,
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out (always)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // the next sign-in on this device must not see a stale profile
    state.profiles.forget(&claims.number).await;

    // only refresh tokens are revocable
    if claims.token_type == TokenType::Refresh {
        let revoke = MergePatch::new().set("revoked", true);
        if let Ok(Some(version)) = live_refresh(&state, &claims).await {
            let _ = state
                .store
                .merge(REFRESH_TOKENS_COLLECTION, &claims.jti, &revoke, Expect::Version(version))
                .await;
        }
    }

    info!(number = %claims.number, "Logged out");
    HttpResponse::NoContent().finish()
}
