//! Console lock handlers — the five coordinator operations plus the admin
//! session-history view.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use wavecast_console::dto::{HeartbeatStatus, HistoryPage, KickNotice, LockStatus};

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::middleware::rbac::require_admin;
use crate::state::AppState;

/// GET /api/console/lock
pub async fn lock_status(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<LockStatus>, ApiError> {
    let status = state.coordinator.status(&auth.caller()).await?;
    Ok(Json(status))
}

/// POST /api/console/lock/claim
pub async fn claim_lock(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.coordinator.claim(&auth.caller()).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/console/lock/release
pub async fn release_lock(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.coordinator.release(&auth.caller()).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/console/lock/heartbeat
pub async fn lock_heartbeat(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<HeartbeatStatus>, ApiError> {
    let status = state.coordinator.heartbeat(&auth.caller()).await?;
    Ok(Json(status))
}

/// POST /api/console/lock/kick-notice
pub async fn lock_kick_notice(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<KickNotice>, ApiError> {
    let notice = state.coordinator.check_kicked(&auth.caller()).await?;
    Ok(Json(notice))
}

/// Paging parameters for the history view.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum rows to return.
    pub limit: Option<i64>,
    /// Rows to skip.
    pub offset: Option<i64>,
}

/// GET /api/console/sessions
pub async fn session_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    require_admin(&auth)?;

    let limit = query
        .limit
        .unwrap_or(state.config.console.history_page_size as i64);
    let page = state
        .coordinator
        .history(limit, query.offset.unwrap_or(0))
        .await?;

    Ok(Json(page))
}
