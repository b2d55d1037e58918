//! Support analytics

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::shared::log_db_err;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const DEFAULT_DAYS: i64 = 7;
pub const MAX_DAYS: i64 = 90;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTotals {
    pub total_chats: i64,
    pub active_chats: i64,
    pub closed_chats: i64,
    pub total_messages: i64,
    pub bot_messages: i64,
    pub average_rating: Option<f64>,
    pub banned_users: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyChatCount {
    /// Calendar day in UTC, `YYYY-MM-DD`
    pub day: String,
    pub chats: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub days: i64,
    pub totals: AnalyticsTotals,
    pub chats_per_day: Vec<DailyChatCount>,
}

/// Validate the reporting window
pub fn resolve_days(days: Option<i64>) -> Result<i64, ApiError> {
    match days {
        None => Ok(DEFAULT_DAYS),
        Some(d) if (1..=MAX_DAYS).contains(&d) => Ok(d),
        Some(_) => Err(ApiError::Validation(format!(
            "days must be between 1 and {MAX_DAYS}"
        ))),
    }
}

pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsResponse>> {
    let days = resolve_days(query.days)?;

    let totals = sqlx::query_as::<_, AnalyticsTotals>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM chat_sessions) AS total_chats,
            (SELECT COUNT(*) FROM chat_sessions WHERE status = 'ACTIVE') AS active_chats,
            (SELECT COUNT(*) FROM chat_sessions WHERE status = 'CLOSED') AS closed_chats,
            (SELECT COUNT(*) FROM messages) AS total_messages,
            (SELECT COUNT(*) FROM messages WHERE is_bot) AS bot_messages,
            (SELECT AVG(satisfaction_rating)::float8 FROM chat_sessions
              WHERE satisfaction_rating IS NOT NULL) AS average_rating,
            (SELECT COUNT(*) FROM users WHERE is_banned) AS banned_users
        "#,
    )
    .fetch_one(&state.pool)
    .await
    .inspect_err(|e| log_db_err("analytics_totals", e))?;

    let chats_per_day = sqlx::query_as::<_, DailyChatCount>(
        r#"
        SELECT to_char(d.day, 'YYYY-MM-DD') AS day, COUNT(c.id) AS chats
        FROM generate_series(
                 (NOW() AT TIME ZONE 'UTC')::date - ($1::int - 1),
                 (NOW() AT TIME ZONE 'UTC')::date,
                 INTERVAL '1 day'
             ) AS d(day)
        LEFT JOIN chat_sessions c
               ON (c.created_at AT TIME ZONE 'UTC')::date = d.day::date
        GROUP BY d.day
        ORDER BY d.day ASC
        "#,
    )
    .bind(days as i32)
    .fetch_all(&state.pool)
    .await
    .inspect_err(|e| log_db_err("analytics_per_day", e))?;

    Ok(Json(AnalyticsResponse {
        days,
        totals,
        chats_per_day,
    }))
}
