//! `/api/{Controller}/{Action}` handlers.
//!
//! Reads are `GET` with query strings; writes are `POST` with JSON bodies.
//! Ids of the record being acted on travel in the body or query as `id`.

use crate::state::AppState;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

mod appointment;
mod auth;
mod clinical;
mod health;
mod inventory;
mod invoice;
mod patient;
mod queue;
mod schedule;
mod user;

#[derive(Debug, Deserialize)]
pub(crate) struct IdParam {
    pub id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(user::routes())
        .merge(patient::routes())
        .merge(appointment::routes())
        .merge(schedule::routes())
        .merge(queue::routes())
        .merge(clinical::routes())
        .merge(inventory::routes())
        .merge(invoice::routes())
        .merge(auth::routes())
}
