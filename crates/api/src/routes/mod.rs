//! API routes

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::require_admin,
    security::security_headers_middleware,
    state::AppState,
    websocket::ws_handler,
};

/// CORS for the configured front-end origins; credentials are needed for the session cookie
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Visitor routes (anonymous)
    let chat_routes = Router::new()
        .route("/chat/start", post(chat::start_chat))
        .route("/chat/:chat_id", get(chat::get_chat))
        .route("/chat/:chat_id/name", post(chat::update_name))
        .route("/chat/:chat_id/close", post(chat::close_chat))
        .route("/chat/:chat_id/rating", post(chat::rate_chat));

    let public_auth_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    // Staff routes (admin session cookie required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/admin/chats", get(admin::chats::list_chats))
        .route("/admin/chats/export", get(admin::chats::export_chats))
        .route(
            "/admin/chats/:chat_id",
            get(admin::chats::get_chat)
                .patch(admin::chats::update_chat)
                .delete(admin::chats::delete_chat),
        )
        .route("/admin/chats/:chat_id/close", post(admin::chats::close_chat))
        .route("/admin/chats/:chat_id/reopen", post(admin::chats::reopen_chat))
        .route("/admin/chats/:chat_id/assign", post(admin::chats::assign_chat))
        .route("/admin/users", get(admin::users::list_users))
        .route(
            "/admin/users/:user_id",
            patch(admin::users::update_user).delete(admin::users::delete_user),
        )
        .route(
            "/admin/settings",
            get(admin::settings::get_settings).put(admin::settings::update_settings),
        )
        .route("/admin/analytics", get(admin::analytics::get_analytics))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // WebSocket route (admin session, if any, is read from the cookie in the handler)
    let websocket_routes = Router::new().route("/ws", get(ws_handler));

    Router::new()
        .merge(health_routes)
        .merge(chat_routes)
        .merge(public_auth_routes)
        .merge(protected_routes)
        .merge(websocket_routes)
        .layer(CookieManagerLayer::new())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}
