//! Authentication module for LiveChat
//!
//! Staff log in with email and password and receive an opaque session cookie.
//! Visitors are never authenticated.

pub mod middleware;
pub mod password;
pub mod session;

pub use middleware::{require_admin, AdminUser};
pub use password::{hash_password, verify_password, PasswordError};
pub use session::SessionManager;
