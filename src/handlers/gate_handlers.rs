use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde_json::json;

use crate::{
    handlers::{
        landing_dtos::{GateStatusResponse, UnlockRequest},
        visitor_middleware::{CallerKey, GateToken, GATE_COOKIE},
    },
    landing::access_gate::{issue_gate_token, verify_gate_token, GATE_TOKEN_DAYS},
    AppState,
};

pub async fn unlock(
    State(state): State<Arc<AppState>>,
    CallerKey(caller): CallerKey,
    Json(unlock_req): Json<UnlockRequest>,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let session = state.visitors.session(&caller);
    if !session.gate.attempt_unlock(&unlock_req.password) {
        tracing::debug!("Gate unlock attempt rejected");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Incorrect password"})),
        ));
    }
    tracing::info!("Gate unlocked for a visitor");

    let token = issue_gate_token(&state.config.jwt_secret).map_err(|e| {
        tracing::error!("Failed to sign gate token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Token generation failed"})),
        )
    })?;

    // Secure only when served over HTTPS
    let cookie_options = if state.config.is_development() {
        "; HttpOnly; SameSite=Lax; Path=/"
    } else {
        "; HttpOnly; Secure; SameSite=Lax; Path=/"
    };
    let cookie = format!(
        "{}={}{}; Max-Age={}",
        GATE_COOKIE,
        token,
        cookie_options,
        GATE_TOKEN_DAYS * 24 * 60 * 60
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::SET_COOKIE, cookie)
        .body(Body::from(json!({"unlocked": true, "token": token}).to_string()))
        .map_err(|e| {
            tracing::error!("Failed to build unlock response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
        })
}

pub async fn gate_status(
    State(state): State<Arc<AppState>>,
    CallerKey(caller): CallerKey,
    GateToken(token): GateToken,
) -> Json<GateStatusResponse> {
    let unlocked = state
        .visitors
        .existing(&caller)
        .map(|session| session.gate.is_unlocked())
        .unwrap_or(false)
        || token
            .as_deref()
            .map(|token| verify_gate_token(&state.config.jwt_secret, token))
            .unwrap_or(false);
    Json(GateStatusResponse { unlocked })
}
