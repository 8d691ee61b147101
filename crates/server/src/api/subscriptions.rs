//! Subscription CRUD and upcoming-occurrence listing.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::Serialize;

use subwatch_core::{
    list_upcoming_occurrences, MonthRollover, Subscription, SubscriptionDraft, SubscriptionId,
    UserConfiguration,
};
use subwatch_store::StoreError;

use crate::state::{local_now, AppState};

use super::{store_error, ApiError};

/// A subscription as listed: the stored record plus its occurrences in the
/// next 30 days.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: Subscription,
    /// `currency` with the `default` marker replaced by the user's currency.
    pub effective_currency: String,
    pub upcoming: Vec<NaiveDateTime>,
}

impl SubscriptionView {
    fn build(
        subscription: Subscription,
        user_configuration: &UserConfiguration,
        now: NaiveDateTime,
        rollover: MonthRollover,
    ) -> Self {
        let upcoming = list_upcoming_occurrences(&subscription, now, rollover).occurrences;
        let effective_currency = user_configuration
            .effective_currency(&subscription.currency)
            .to_string();
        Self {
            subscription,
            effective_currency,
            upcoming,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingResponse {
    pub subscription_id: SubscriptionId,
    pub occurrences: Vec<NaiveDateTime>,
    /// Set when a calendar error cut the listing short.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// List every subscription with its upcoming occurrences.
pub async fn subscriptions_list(State(state): State<Arc<AppState>>) -> Json<Vec<SubscriptionView>> {
    let (subscriptions, user_configuration) = {
        let txn = state.store.begin().await;
        (txn.list_all(), txn.user_configuration())
    };
    let now = local_now();
    Json(
        subscriptions
            .into_iter()
            .map(|s| SubscriptionView::build(s, &user_configuration, now, state.rollover))
            .collect(),
    )
}

pub async fn subscriptions_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SubscriptionId>,
) -> Result<Json<SubscriptionView>, ApiError> {
    let (subscription, user_configuration) = {
        let txn = state.store.begin().await;
        (txn.get(id), txn.user_configuration())
    };
    let subscription = subscription.ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    Ok(Json(SubscriptionView::build(
        subscription,
        &user_configuration,
        local_now(),
        state.rollover,
    )))
}

pub async fn subscriptions_create(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<SubscriptionDraft>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let created = state.store.create(draft).await.map_err(store_error)?;
    tracing::info!(subscription_id = created.id, name = %created.name, "Subscription created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn subscriptions_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SubscriptionId>,
    Json(draft): Json<SubscriptionDraft>,
) -> Result<Json<Subscription>, ApiError> {
    let updated = state.store.update(id, draft).await.map_err(store_error)?;
    tracing::info!(subscription_id = id, "Subscription updated");
    Ok(Json(updated))
}

pub async fn subscriptions_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SubscriptionId>,
) -> Result<Json<Subscription>, ApiError> {
    let removed = state.store.delete(id).await.map_err(store_error)?;
    tracing::info!(subscription_id = id, "Subscription deleted");
    Ok(Json(removed))
}

/// Listing-window occurrences for one subscription.
pub async fn subscriptions_upcoming(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SubscriptionId>,
) -> Result<Json<UpcomingResponse>, ApiError> {
    let subscription = state
        .store
        .get(id)
        .await
        .ok_or_else(|| store_error(StoreError::NotFound(id)))?;
    let upcoming = list_upcoming_occurrences(&subscription, local_now(), state.rollover);
    Ok(Json(UpcomingResponse {
        subscription_id: id,
        occurrences: upcoming.occurrences,
        error: upcoming.error.map(|e| e.to_string()),
    }))
}
