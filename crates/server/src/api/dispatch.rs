use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use subwatch_notify::CycleReport;

use crate::state::{local_now, AppState};

use super::{store_error, ApiError};

/// Run one dispatch cycle now and return its report.
pub async fn dispatch_run(State(state): State<Arc<AppState>>) -> Result<Json<CycleReport>, ApiError> {
    state
        .dispatcher
        .run_cycle(local_now())
        .await
        .map(Json)
        .map_err(store_error)
}
