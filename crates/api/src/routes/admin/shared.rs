//! Shared types and utilities for admin routes

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Log comprehensive database error details for debugging
pub fn log_db_err(step: &'static str, e: &sqlx::Error) {
    if let Some(db) = e.as_database_error() {
        tracing::error!(
            step,
            code = ?db.code(),
            message = db.message(),
            table = ?db.table(),
            constraint = ?db.constraint(),
            full_error = ?e,
            "Database query failed"
        );
    } else {
        tracing::error!(step, error = ?e, "Non-database SQLx error");
    }
}

/// Resolved page window for a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageWindow {
    /// Clamp user-supplied paging to sane bounds (pages are 1-based)
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Self {
            page,
            limit,
            offset: (page - 1) * limit,
        }
    }
}

/// One page of results
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, window: PageWindow) -> Self {
        Self {
            items,
            total,
            page: window.page,
            limit: window.limit,
            total_pages: (total + window.limit - 1) / window.limit,
        }
    }
}

/// Turn a free-text search into an ILIKE pattern, treating `%` and `_` literally
pub fn like_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

/// Quote a CSV field when it contains a delimiter, quote or line break
pub fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
