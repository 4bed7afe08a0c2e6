use crate::reply::{body, created, ok, query, Reply};
use crate::services;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use clinic_core::model::queue::{QueueEntry, QueueStatus};
use clinic_core::service::queue_service::EnqueueRequest;
use serde::Deserialize;
use uuid::Uuid;

/// Room and optional day; the day defaults to today.
#[derive(Debug, Deserialize)]
pub(crate) struct RoomParams {
    pub room: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateStatusBody {
    pub id: Uuid,
    pub status: QueueStatus,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/Queue/Enqueue", post(enqueue))
        .route("/api/Queue/List", get(list))
        .route("/api/Queue/UpdateStatus", post(update_status))
        .route("/api/Queue/CallNext", post(call_next))
}

async fn enqueue(
    State(state): State<AppState>,
    payload: Result<Json<EnqueueRequest>, JsonRejection>,
) -> Reply<QueueEntry> {
    let now = state.now();
    let result = body(payload)
        .and_then(|request| state.with_conn(|conn| services::queue(conn)?.enqueue(&request, now)));
    created("queue_enqueue", "Queue number issued.", result)
}

async fn list(
    State(state): State<AppState>,
    params: Result<Query<RoomParams>, QueryRejection>,
) -> Reply<Vec<QueueEntry>> {
    let today = state.now().date();
    let result = query(params).and_then(|params| {
        let date = params.date.unwrap_or(today);
        state.with_conn(|conn| services::queue(conn)?.list(&params.room, date))
    });
    ok("queue_list", "Queue loaded.", result)
}

async fn update_status(
    State(state): State<AppState>,
    payload: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> Reply<QueueEntry> {
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::queue(conn)?.update_status(request.id, request.status))
    });
    ok("queue_update_status", "Queue entry updated.", result)
}

/// `data` is `null` when nobody is waiting.
async fn call_next(
    State(state): State<AppState>,
    payload: Result<Json<RoomParams>, JsonRejection>,
) -> Reply<Option<QueueEntry>> {
    let today = state.now().date();
    let result = body(payload).and_then(|params| {
        let date = params.date.unwrap_or(today);
        state.with_conn(|conn| services::queue(conn)?.call_next(&params.room, date))
    });
    ok("queue_call_next", "Next patient called.", result)
}
