//! Auto-response settings

use axum::{extract::State, Extension, Json};
use livechat_shared::{Settings, MAX_MESSAGE_LENGTH};
use serde::Deserialize;

use crate::{
    auth::AdminUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub enable_auto_response: Option<bool>,
    pub auto_response_message: Option<String>,
}

/// Merge an update into the current settings
pub fn apply_update(current: &Settings, req: UpdateSettingsRequest) -> Result<Settings, ApiError> {
    let message = match req.auto_response_message {
        Some(message) => {
            let message = message.trim().to_string();
            if message.chars().count() > MAX_MESSAGE_LENGTH {
                return Err(ApiError::Validation(format!(
                    "Auto-response message must be at most {MAX_MESSAGE_LENGTH} characters"
                )));
            }
            Some(message).filter(|m| !m.is_empty())
        }
        None => current.auto_response_message.clone(),
    };

    let enabled = req
        .enable_auto_response
        .unwrap_or(current.enable_auto_response);
    if enabled && message.is_none() {
        return Err(ApiError::Validation(
            "An auto-response message is required to enable auto-responses".to_string(),
        ));
    }

    Ok(Settings {
        enable_auto_response: enabled,
        auto_response_message: message,
        updated_at: current.updated_at,
    })
}

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Settings>> {
    Ok(Json(state.store.settings().await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Json(req): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<Settings>> {
    let current = state.store.settings().await?;
    let next = apply_update(&current, req)?;

    let settings = sqlx::query_as::<_, Settings>(
        r#"
        INSERT INTO settings (id, enable_auto_response, auto_response_message, updated_at)
        VALUES (1, $1, $2, NOW())
        ON CONFLICT (id) DO UPDATE
        SET enable_auto_response = EXCLUDED.enable_auto_response,
            auto_response_message = EXCLUDED.auto_response_message,
            updated_at = NOW()
        RETURNING enable_auto_response, auto_response_message, updated_at
        "#,
    )
    .bind(next.enable_auto_response)
    .bind(&next.auto_response_message)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        enable_auto_response = settings.enable_auto_response,
        "Settings updated"
    );

    Ok(Json(settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Settings {
        Settings {
            enable_auto_response: false,
            auto_response_message: Some("Hello!".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_enable_keeps_existing_message() {
        let next = apply_update(
            &current(),
            UpdateSettingsRequest {
                enable_auto_response: Some(true),
                auto_response_message: None,
            },
        )
        .unwrap();
        assert!(next.enable_auto_response);
        assert_eq!(next.auto_response_template(), Some("Hello!"));
    }

    #[test]
    fn test_blank_message_cannot_be_enabled() {
        let result = apply_update(
            &current(),
            UpdateSettingsRequest {
                enable_auto_response: Some(true),
                auto_response_message: Some("   ".into()),
            },
        );
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_clearing_message_while_disabled() {
        let next = apply_update(
            &current(),
            UpdateSettingsRequest {
                enable_auto_response: None,
                auto_response_message: Some(String::new()),
            },
        )
        .unwrap();
        assert!(!next.enable_auto_response);
        assert!(next.auto_response_message.is_none());
    }
}
