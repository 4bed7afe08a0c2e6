use super::IdParam;
use crate::reply::{body, created, ok, query, Reply};
use crate::services;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, NaiveTime};
use clinic_core::model::appointment::{Appointment, AppointmentStatus};
use clinic_core::repo::appointment_repo::AppointmentListQuery;
use clinic_core::service::appointment_service::BookAppointmentRequest;
use clinic_core::service::availability::{slot_time_format, SlotAvailability};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct DateParam {
    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AppointmentListParams {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CancelBody {
    pub id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RescheduleBody {
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "slot_time_format")]
    pub time: NaiveTime,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/Appointment/AvailableSlots", get(available_slots))
        .route("/api/Appointment/Book", post(book))
        .route("/api/Appointment/GetById", get(get_by_id))
        .route("/api/Appointment/List", get(list))
        .route("/api/Appointment/Confirm", post(confirm))
        .route("/api/Appointment/CheckIn", post(check_in))
        .route("/api/Appointment/Complete", post(complete))
        .route("/api/Appointment/Cancel", post(cancel))
        .route("/api/Appointment/Reschedule", post(reschedule))
}

async fn available_slots(
    State(state): State<AppState>,
    params: Result<Query<DateParam>, QueryRejection>,
) -> Reply<Vec<SlotAvailability>> {
    let now = state.now();
    let result = query(params).and_then(|DateParam { date }| {
        state.with_conn(|conn| services::appointments(conn)?.available_slots(date, now))
    });
    ok("appointment_slots", "Slots loaded.", result)
}

async fn book(
    State(state): State<AppState>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Reply<Appointment> {
    let now = state.now();
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::appointments(conn)?.book(&request, now))
    });
    created("appointment_book", "Appointment booked.", result)
}

async fn get_by_id(
    State(state): State<AppState>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> Reply<Appointment> {
    let result = query(params)
        .and_then(|IdParam { id }| state.with_conn(|conn| services::appointments(conn)?.get(id)));
    ok("appointment_get", "Appointment loaded.", result)
}

async fn list(
    State(state): State<AppState>,
    params: Result<Query<AppointmentListParams>, QueryRejection>,
) -> Reply<Vec<Appointment>> {
    let result = query(params).and_then(|params| {
        let list_query = AppointmentListQuery {
            patient_id: params.patient_id,
            doctor_id: params.doctor_id,
            date: params.date,
            status: params.status,
        };
        state.with_conn(|conn| services::appointments(conn)?.list(&list_query))
    });
    ok("appointment_list", "Appointments loaded.", result)
}

async fn confirm(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<Appointment> {
    let result = body(payload).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::appointments(conn)?.confirm(id))
    });
    ok("appointment_confirm", "Appointment confirmed.", result)
}

async fn check_in(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<Appointment> {
    let result = body(payload).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::appointments(conn)?.check_in(id))
    });
    ok("appointment_check_in", "Patient checked in.", result)
}

async fn complete(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<Appointment> {
    let result = body(payload).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::appointments(conn)?.complete(id))
    });
    ok("appointment_complete", "Appointment completed.", result)
}

async fn cancel(
    State(state): State<AppState>,
    payload: Result<Json<CancelBody>, JsonRejection>,
) -> Reply<Appointment> {
    let now = state.now();
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| {
            services::appointments(conn)?.cancel(request.id, request.reason.as_deref(), now)
        })
    });
    ok("appointment_cancel", "Appointment cancelled.", result)
}

async fn reschedule(
    State(state): State<AppState>,
    payload: Result<Json<RescheduleBody>, JsonRejection>,
) -> Reply<Appointment> {
    let now = state.now();
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| {
            services::appointments(conn)?.reschedule(request.id, request.date, request.time, now)
        })
    });
    ok("appointment_reschedule", "Appointment rescheduled.", result)
}
