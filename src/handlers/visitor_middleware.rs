use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::AppState;

pub const CLIENT_HEADER: &str = "x-lernis-client";
pub const GATE_COOKIE: &str = "lernis_access";
pub const VISITOR_COOKIE: &str = "lernis_visitor";
const VISITOR_COOKIE_DAYS: i64 = 30;
const MAX_CALLER_KEY_LEN: usize = 128;

/// Identifies which visitor session a request belongs to. Inserted by
/// `assign_caller`; routes without that middleware cannot extract it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerKey(pub String);

fn cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
}

fn usable_key(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value.len() <= MAX_CALLER_KEY_LEN).then(|| value.to_string())
}

/// Explicit client header first, then the visitor cookie from an earlier
/// response. `None` means the browser has not been seen yet.
fn caller_key_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CLIENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(usable_key)
        .or_else(|| cookie_value(headers, VISITOR_COOKIE).as_deref().and_then(usable_key))
}

/// Gives every request a caller key. Browsers without one get a random id
/// and a `lernis_visitor` cookie so their next request lands in the same
/// session.
pub async fn assign_caller(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let (key, minted) = match caller_key_from_headers(request.headers()) {
        Some(key) => (key, false),
        None => (Uuid::new_v4().to_string(), true),
    };
    request.extensions_mut().insert(CallerKey(key.clone()));

    let mut response = next.run(request).await;
    if minted {
        let secure = if state.config.is_development() { "" } else { "; Secure" };
        let cookie = format!(
            "{}={}; HttpOnly{}; SameSite=Lax; Path=/; Max-Age={}",
            VISITOR_COOKIE,
            key,
            secure,
            VISITOR_COOKIE_DAYS * 24 * 60 * 60
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Failed to build visitor cookie: {}", e),
        }
    }
    response
}

impl<S: Send + Sync> FromRequestParts<S> for CallerKey {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerKey>()
            .cloned()
            .ok_or(AuthError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Visitor identification missing (middleware failure)".to_string(),
            })
    }
}

/// Gate capability presented by the browser, from the `lernis_access`
/// cookie or a bearer header. `None` when neither is present.
#[derive(Debug, Clone)]
pub struct GateToken(pub Option<String>);

fn gate_token_from_parts(parts: &Parts) -> Option<String> {
    cookie_value(&parts.headers, GATE_COOKIE).or_else(|| {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.to_string())
    })
}

impl<S: Send + Sync> FromRequestParts<S> for GateToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(GateToken(gate_token_from_parts(parts)))
    }
}

#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
        }));

        (self.status, body).into_response()
    }
}

/// Admin routes take the static `ADMIN_API_KEY` as a bearer token. With no
/// key configured every request is refused.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(expected) = state.config.admin_api_key.as_deref() else {
        warn!("Admin route called but ADMIN_API_KEY is not configured");
        return Err(AuthError {
            status: StatusCode::FORBIDDEN,
            message: "Admin access required".to_string(),
        });
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => {
            debug!("Admin key accepted");
            Ok(next.run(request).await)
        }
        Some(_) => Err(AuthError {
            status: StatusCode::FORBIDDEN,
            message: "Admin access required".to_string(),
        }),
        None => Err(AuthError {
            status: StatusCode::UNAUTHORIZED,
            message: "No authorization token provided".to_string(),
        }),
    }
}
