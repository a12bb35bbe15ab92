use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const GATE_TOKEN_TYPE: &str = "gate";
pub const GATE_TOKEN_DAYS: i64 = 30;

/// Password toggle in front of the "coming soon" page. Plain-text comparison
/// with no lockout; this only decides what the page shows.
pub struct AccessGate {
    secret: Arc<str>,
    unlocked: AtomicBool,
}

impl AccessGate {
    pub fn new(secret: Arc<str>) -> Self {
        Self {
            secret,
            unlocked: AtomicBool::new(false),
        }
    }

    /// Flips the gate to unlocked iff `candidate` is exactly the secret.
    /// A mismatch leaves the current state untouched.
    pub fn attempt_unlock(&self, candidate: &str) -> bool {
        if candidate != &*self.secret {
            return false;
        }
        self.unlocked.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GateClaims {
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: String,
}

/// Signs a capability proving the holder passed the gate, so the browser
/// never needs the secret itself.
pub fn issue_gate_token(jwt_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        &GateClaims {
            exp: (Utc::now() + Duration::days(GATE_TOKEN_DAYS)).timestamp(),
            token_type: GATE_TOKEN_TYPE.to_string(),
        },
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

pub fn verify_gate_token(jwt_secret: &str, token: &str) -> bool {
    match decode::<GateClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    ) {
        Ok(data) => data.claims.token_type == GATE_TOKEN_TYPE,
        Err(e) => {
            tracing::debug!("Rejected gate token: {}", e);
            false
        }
    }
}
