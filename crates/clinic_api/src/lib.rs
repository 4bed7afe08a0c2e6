//! HTTP surface for clinic core.
//!
//! # Responsibility
//! - Map `/api/{Controller}/{Action}` routes onto core use-cases.
//! - Wrap every outcome in the `ResponseValue` envelope with a matching
//!   HTTP status.
//!
//! # Invariants
//! - Handlers never panic on bad input; malformed JSON or query strings
//!   come back as `bad_request` envelopes.
//! - Failures are logged once, here, with a stable `error_code`.

mod controllers;
pub mod reply;
mod services;
pub mod state;

pub use state::{AppState, DEFAULT_CONSULTATION_FEE};

use axum::Router;

/// Full application router with state attached.
pub fn build_router(state: AppState) -> Router {
    controllers::router().with_state(state)
}
