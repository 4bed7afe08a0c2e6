use super::IdParam;
use crate::reply::{body, created, ok, query, Reply};
use crate::services;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use clinic_core::model::schedule::StaffSchedule;
use clinic_core::service::schedule_service::ScheduleInput;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateScheduleBody {
    pub id: Uuid,
    #[serde(flatten)]
    pub schedule: ScheduleInput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleListParams {
    pub staff_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/Schedule/Create", post(create))
        .route("/api/Schedule/Update", post(update))
        .route("/api/Schedule/Delete", post(delete))
        .route("/api/Schedule/List", get(list))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<ScheduleInput>, JsonRejection>,
) -> Reply<StaffSchedule> {
    let result = body(payload)
        .and_then(|input| state.with_conn(|conn| services::schedules(conn)?.create(&input)));
    created("schedule_create", "Schedule created.", result)
}

async fn update(
    State(state): State<AppState>,
    payload: Result<Json<UpdateScheduleBody>, JsonRejection>,
) -> Reply<StaffSchedule> {
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::schedules(conn)?.update(request.id, &request.schedule))
    });
    ok("schedule_update", "Schedule updated.", result)
}

async fn delete(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<()> {
    let result = body(payload)
        .and_then(|IdParam { id }| state.with_conn(|conn| services::schedules(conn)?.delete(id)));
    ok("schedule_delete", "Schedule deleted.", result)
}

async fn list(
    State(state): State<AppState>,
    params: Result<Query<ScheduleListParams>, QueryRejection>,
) -> Reply<Vec<StaffSchedule>> {
    let result = query(params).and_then(|params| {
        state.with_conn(|conn| {
            services::schedules(conn)?.list(params.staff_id, params.from, params.to)
        })
    });
    ok("schedule_list", "Schedules loaded.", result)
}
