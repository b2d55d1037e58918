//! Admin session middleware
//!
//! Guards the `/admin/*` and `/auth/me` routes. A valid session cookie puts an
//! [`AdminUser`] into the request extensions; anything else is a 401.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use livechat_shared::User;
use tower_cookies::Cookies;

use crate::error::ApiError;
use crate::state::AppState;

/// The staff member behind the current request
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

pub async fn require_admin(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = cookies
        .get(&state.config.session_cookie_name)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| {
            tracing::debug!("Missing admin session cookie");
            ApiError::Unauthorized
        })?;

    let user = state
        .sessions
        .resolve(&token)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Rejected unknown or expired admin session");
            ApiError::Unauthorized
        })?;

    tracing::debug!(user_id = %user.id, role = user.role.as_str(), "Authenticated staff user");

    req.extensions_mut().insert(AdminUser(user));
    Ok(next.run(req).await)
}
