use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::{
    error::WaitlistError,
    handlers::{
        landing_dtos::{LocalWaitlistResponse, WaitlistRequest, WaitlistResponse, WaitlistStatusResponse},
        visitor_middleware::CallerKey,
    },
    landing::waitlist_flow::LOCAL_WAITLIST_KEY,
    AppState,
};

pub async fn join_waitlist(
    State(state): State<Arc<AppState>>,
    CallerKey(caller): CallerKey,
    Json(waitlist_req): Json<WaitlistRequest>,
) -> Result<Json<WaitlistResponse>, (StatusCode, Json<serde_json::Value>)> {
    let session = state.visitors.session(&caller);
    match session.waitlist.submit(&waitlist_req.email).await {
        Ok(message) => Ok(Json(message.into())),
        Err(WaitlistError::LocalPersistence(e)) => {
            tracing::error!("CRITICAL: waitlist entry lost, local fallback failed: {}", e);
            sentry::capture_message(
                &format!("Waitlist local fallback write failed: {}", e),
                sentry::Level::Error,
            );
            Err(WaitlistError::LocalPersistence(e).into_response_parts())
        }
        Err(e) => Err(e.into_response_parts()),
    }
}

pub async fn waitlist_status(
    State(state): State<Arc<AppState>>,
    CallerKey(caller): CallerKey,
) -> Json<WaitlistStatusResponse> {
    // a visitor who never submitted has nothing to report, so no session is created
    let Some(session) = state.visitors.existing(&caller) else {
        return Json(WaitlistStatusResponse::idle());
    };
    let flow = &session.waitlist;
    Json(WaitlistStatusResponse {
        phase: flow.phase(),
        submitting: flow.is_submitting(),
        status: flow.status(),
        has_draft: !flow.draft().is_empty(),
    })
}

pub async fn get_local_waitlist(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LocalWaitlistResponse>, (StatusCode, Json<serde_json::Value>)> {
    let entries = state.local_store.waitlist_records(LOCAL_WAITLIST_KEY).map_err(|e| {
        tracing::error!("Failed to read local waitlist: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Database error"})),
        )
    })?;
    Ok(Json(LocalWaitlistResponse {
        count: entries.len(),
        entries,
    }))
}
