//! Staff authentication routes

use axum::{extract::State, http::StatusCode, Extension, Json};
use livechat_shared::User;
use serde::Deserialize;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::{
    auth::{verify_password, AdminUser, SessionManager},
    config::Config,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Build the session cookie carrying a raw token
pub fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.session_cookie_secure)
        .max_age(time::Duration::hours(config.session_ttl_hours))
        .build()
}

fn removal_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), "")).path("/").build()
}

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<User>> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, role, is_banned, created_at, updated_at
        FROM users
        WHERE LOWER(email) = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?
    .filter(|user| user.role.is_staff())
    .ok_or_else(|| {
        tracing::warn!(email = %email, "Login failed: unknown staff account");
        ApiError::InvalidCredentials
    })?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or(ApiError::InvalidCredentials)?;

    let valid = verify_password(&req.password, hash).map_err(|e| {
        tracing::error!(user_id = %user.id, error = ?e, "Stored password hash is unreadable");
        ApiError::Internal
    })?;
    if !valid {
        tracing::warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.sessions.create(user.id).await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "Staff user logged in");

    cookies.add(session_cookie(&state.config, token));

    Ok(Json(user))
}

/// Log out and clear the session cookie
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> ApiResult<StatusCode> {
    if let Some(cookie) = cookies.get(&state.config.session_cookie_name) {
        if state.sessions.revoke(cookie.value()).await? {
            tracing::info!("Admin session revoked");
        }
    }

    cookies.remove(removal_cookie(&state.config));

    Ok(StatusCode::NO_CONTENT)
}

/// The currently logged in staff user
pub async fn me(Extension(AdminUser(user)): Extension<AdminUser>) -> Json<User> {
    Json(user)
}
