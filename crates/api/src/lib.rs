//! LiveChat API Library
//!
//! This crate contains the server components for LiveChat: the realtime
//! message relay, visitor and admin REST routes, and staff authentication.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;
pub mod state;
pub mod store;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
