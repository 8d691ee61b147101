//! Global notification destination and user display preferences.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use subwatch_core::{NotificationSettings, UserConfiguration, ValidationError, DEFAULT_NTFY_DOMAIN};

use crate::state::AppState;

use super::{store_error, validation_error, ApiError};

/// Stored settings, or an empty topic on the default domain when none are set.
pub async fn notification_settings_get(State(state): State<Arc<AppState>>) -> Json<NotificationSettings> {
    let settings = state.store.begin().await.notification_settings();
    Json(settings.unwrap_or_default())
}

pub async fn notification_settings_set(
    State(state): State<Arc<AppState>>,
    Json(mut settings): Json<NotificationSettings>,
) -> Result<Json<NotificationSettings>, ApiError> {
    settings.topic = settings.topic.trim().to_string();
    if settings.topic.is_empty() {
        return Err(validation_error(ValidationError::EmptyField { field: "topic" }));
    }
    settings.domain = settings.domain.trim().trim_end_matches('/').to_string();
    if settings.domain.is_empty() {
        settings.domain = DEFAULT_NTFY_DOMAIN.to_string();
    }

    let saved = state
        .store
        .begin()
        .await
        .set_notification_settings(settings)
        .map_err(store_error)?;
    tracing::info!(topic = %saved.topic, domain = %saved.domain, "Notification settings saved");
    Ok(Json(saved))
}

pub async fn user_configuration_get(State(state): State<Arc<AppState>>) -> Json<UserConfiguration> {
    Json(state.store.begin().await.user_configuration())
}

pub async fn user_configuration_set(
    State(state): State<Arc<AppState>>,
    Json(mut config): Json<UserConfiguration>,
) -> Result<Json<UserConfiguration>, ApiError> {
    config.currency = config.currency.trim().to_uppercase();
    if config.currency.is_empty() {
        return Err(validation_error(ValidationError::EmptyField { field: "currency" }));
    }

    let saved = state
        .store
        .begin()
        .await
        .set_user_configuration(config)
        .map_err(store_error)?;
    Ok(Json(saved))
}
