use serde::{Deserialize, Serialize};

use crate::landing::{
    transient_status::{StatusKind, StatusMessage},
    waitlist_flow::SubmissionPhase,
};
use crate::models::waitlist_models::LocalWaitlistRecord;

#[derive(Deserialize, Serialize)]
pub struct UnlockRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GateStatusResponse {
    pub unlocked: bool,
}

#[derive(Deserialize, Serialize)]
pub struct WaitlistRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct WaitlistResponse {
    pub status: StatusKind,
    pub message: String,
    pub clear_input: bool, // tells the form to empty the email field
}

impl From<StatusMessage> for WaitlistResponse {
    fn from(message: StatusMessage) -> Self {
        Self {
            clear_input: message.kind == StatusKind::Success,
            status: message.kind,
            message: message.text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WaitlistStatusResponse {
    pub phase: SubmissionPhase,
    pub submitting: bool,
    pub status: Option<StatusMessage>,
    pub has_draft: bool, // the typed email itself is never echoed back
}

impl WaitlistStatusResponse {
    pub fn idle() -> Self {
        Self {
            phase: SubmissionPhase::Idle,
            submitting: false,
            status: None,
            has_draft: false,
        }
    }
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub certificate: String,
}

#[derive(Serialize)]
pub struct LocalWaitlistResponse {
    pub count: usize,
    pub entries: Vec<LocalWaitlistRecord>,
}
