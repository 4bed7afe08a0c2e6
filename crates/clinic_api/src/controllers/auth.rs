//! One-time passcode issue and verification.

use crate::reply::{body, ok, Reply};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::routing::post;
use axum::Router;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct OtpRequestBody {
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OtpVerifyBody {
    pub destination: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OtpIssued {
    pub expires_at: NaiveDateTime,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/Auth/RequestOtp", post(request_otp))
        .route("/api/Auth/VerifyOtp", post(verify_otp))
}

async fn request_otp(
    State(state): State<AppState>,
    payload: Result<Json<OtpRequestBody>, JsonRejection>,
) -> Reply<OtpIssued> {
    let now = state.now();
    let result = body(payload).and_then(|request| {
        state
            .otp()
            .request_code(&request.destination, now)
            .map(|expires_at| OtpIssued { expires_at })
    });
    ok("otp_request", "Code sent.", result)
}

async fn verify_otp(
    State(state): State<AppState>,
    payload: Result<Json<OtpVerifyBody>, JsonRejection>,
) -> Reply<()> {
    let now = state.now();
    let result = body(payload)
        .and_then(|request| state.otp().verify_code(&request.destination, &request.code, now));
    ok("otp_verify", "Code verified.", result)
}
