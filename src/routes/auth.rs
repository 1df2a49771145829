use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{encode_token, Claims, TOKEN_TTL_SECS};
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::state::SharedState;

pub const ACCESS_COOKIE: &str = "access-token";

const LOGIN_FAILED: &str = "Login failed";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub inputpass: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct LoginUser {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn access_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(TOKEN_TTL_SECS))
        .build()
}

pub fn clear_access_cookie() -> Cookie<'static> {
    Cookie::build((ACCESS_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build()
}

pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let email = req.email.as_deref().map(str::trim).unwrap_or_default();
    let inputpass = req.inputpass.unwrap_or_default();
    if email.is_empty() || inputpass.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    if let Err(retry_after) = state.login_limiter.check(email) {
        return Err(AppError::RateLimited(format!(
            "Too many login attempts. Try again in {retry_after} seconds."
        )));
    }

    let Some(user) = db::users::find_by_email(&state.pool, email).await? else {
        password::verify_dummy_blocking(inputpass)
            .await
            .map_err(AppError::Internal)?;
        state.login_limiter.record_failure(email);
        return Err(AppError::BadRequest(LOGIN_FAILED.to_string()));
    };

    let valid = password::verify_blocking(inputpass, user.hashpass.clone())
        .await
        .map_err(AppError::Internal)?;

    if !valid {
        state.login_limiter.record_failure(email);
        tracing::info!(user_id = user.id, "Rejected login");
        return Err(AppError::BadRequest(LOGIN_FAILED.to_string()));
    }

    state.login_limiter.reset(email);

    let claims = Claims::new(user.id, user.role);
    let token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    let jar = jar.add(access_cookie(&token, state.config.cookie_secure));
    Ok((
        jar,
        Json(LoginResponse {
            token,
            user: LoginUser {
                id: user.id,
                name: user.name,
                role: user.role,
            },
        }),
    ))
}

/// Clears the cookie only; issued tokens stay valid until they expire.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(clear_access_cookie()),
        Json(MessageResponse {
            message: "Logged out.".to_string(),
        }),
    )
}

pub async fn me(auth: AuthUser, State(state): State<SharedState>) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;
    Ok(Json(user))
}
