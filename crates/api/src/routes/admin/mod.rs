//! Admin routes
//!
//! Every handler here sits behind [`require_admin`](crate::auth::require_admin):
//! - `chats`: Chat listing, detail, notes, close/reopen, assignment, CSV export
//! - `users`: User listing, role and ban updates, deletion
//! - `settings`: Auto-response settings
//! - `analytics`: Totals and per-day chat counts
//! - `shared`: Pagination, CSV and logging helpers

pub mod analytics;
pub mod chats;
pub mod settings;
pub mod shared;
pub mod users;
