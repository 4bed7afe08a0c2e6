//! One-time passcodes with request rate limiting.
//!
//! # Invariants
//! - At most `MAX_REQUESTS_PER_WINDOW` delivered codes per destination per
//!   rolling `REQUEST_WINDOW_MINUTES`; failed deliveries do not count.
//! - A destination holds at most one pending code; a new request replaces it.
//! - Codes expire after `CODE_TTL_MINUTES` and burn after
//!   `MAX_VERIFY_ATTEMPTS` wrong guesses.
//! - Codes never reach the log.

use super::error::{ServiceError, ServiceResult};
use crate::model::validation::ValidationError;
use chrono::{Duration, NaiveDateTime};
use log::{info, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const MAX_REQUESTS_PER_WINDOW: usize = 3;
pub const REQUEST_WINDOW_MINUTES: i64 = 15;
pub const CODE_TTL_MINUTES: i64 = 5;
pub const MAX_VERIFY_ATTEMPTS: u32 = 5;
const CODE_DIGITS: u32 = 6;

/// Outbound channel for issued codes (email, SMS, ...).
pub trait OtpDelivery: Send + Sync {
    fn deliver(&self, destination: &str, code: &str) -> Result<(), String>;
}

impl<D: OtpDelivery + ?Sized> OtpDelivery for Arc<D> {
    fn deliver(&self, destination: &str, code: &str) -> Result<(), String> {
        (**self).deliver(destination, code)
    }
}

/// Delivery that records only metadata. Used where no channel is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyDelivery;

impl OtpDelivery for LogOnlyDelivery {
    fn deliver(&self, destination: &str, _code: &str) -> Result<(), String> {
        info!(
            "event=otp_deliver module=otp status=skipped channel=log destination={}",
            mask_destination(destination)
        );
        Ok(())
    }
}

#[derive(Debug)]
struct PendingCode {
    code: String,
    expires_at: NaiveDateTime,
    failed_attempts: u32,
}

#[derive(Debug, Default)]
struct OtpState {
    requests: HashMap<String, VecDeque<NaiveDateTime>>,
    pending: HashMap<String, PendingCode>,
}

pub struct OtpService<D: OtpDelivery> {
    delivery: D,
    state: Mutex<OtpState>,
}

impl<D: OtpDelivery> OtpService<D> {
    pub fn new(delivery: D) -> Self {
        Self {
            delivery,
            state: Mutex::new(OtpState::default()),
        }
    }

    /// Issues and delivers a fresh code. Returns its expiry time.
    pub fn request_code(&self, destination: &str, now: NaiveDateTime) -> ServiceResult<NaiveDateTime> {
        let key = normalize_destination(destination)?;
        let mut state = self.lock_state();

        let window_start = now - Duration::minutes(REQUEST_WINDOW_MINUTES);
        let history = state.requests.entry(key.clone()).or_default();
        while history.front().is_some_and(|at| *at <= window_start) {
            history.pop_front();
        }
        if history.len() >= MAX_REQUESTS_PER_WINDOW {
            let retry_after = history
                .front()
                .map(|oldest| (*oldest - window_start).num_seconds().max(1))
                .unwrap_or(1);
            warn!(
                "event=otp_request module=otp status=rejected destination={} error_code=rate_limited",
                mask_destination(&key)
            );
            return Err(ServiceError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let code = generate_code();
        let expires_at = now + Duration::minutes(CODE_TTL_MINUTES);
        if let Err(err) = self.delivery.deliver(&key, &code) {
            warn!(
                "event=otp_request module=otp status=error destination={} error_code=delivery_failed",
                mask_destination(&key)
            );
            return Err(ServiceError::DeliveryFailed(err));
        }
        history.push_back(now);
        state.pending.insert(
            key.clone(),
            PendingCode {
                code,
                expires_at,
                failed_attempts: 0,
            },
        );
        info!(
            "event=otp_request module=otp status=ok destination={}",
            mask_destination(&key)
        );
        Ok(expires_at)
    }

    /// Checks a code. Success consumes it.
    pub fn verify_code(&self, destination: &str, code: &str, now: NaiveDateTime) -> ServiceResult<()> {
        let key = normalize_destination(destination)?;
        let mut state = self.lock_state();

        let Some(pending) = state.pending.get_mut(&key) else {
            return Err(ServiceError::Unauthorized("no pending code".to_string()));
        };
        if pending.expires_at <= now {
            state.pending.remove(&key);
            return Err(ServiceError::Unauthorized("code expired".to_string()));
        }
        if pending.code != code.trim() {
            pending.failed_attempts += 1;
            if pending.failed_attempts >= MAX_VERIFY_ATTEMPTS {
                state.pending.remove(&key);
                warn!(
                    "event=otp_verify module=otp status=rejected destination={} error_code=attempts_exhausted",
                    mask_destination(&key)
                );
            }
            return Err(ServiceError::Unauthorized("invalid code".to_string()));
        }

        state.pending.remove(&key);
        info!(
            "event=otp_verify module=otp status=ok destination={}",
            mask_destination(&key)
        );
        Ok(())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, OtpState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn normalize_destination(destination: &str) -> ServiceResult<String> {
    let key = destination.trim().to_ascii_lowercase();
    if key.is_empty() {
        return Err(ValidationError::Blank("destination").into());
    }
    Ok(key)
}

fn generate_code() -> String {
    let modulus = 10_u128.pow(CODE_DIGITS);
    let value = Uuid::new_v4().as_u128() % modulus;
    format!("{value:0width$}", width = CODE_DIGITS as usize)
}

/// Keeps the first two and last two characters of a destination.
fn mask_destination(destination: &str) -> String {
    let chars: Vec<char> = destination.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}***{tail}")
}
