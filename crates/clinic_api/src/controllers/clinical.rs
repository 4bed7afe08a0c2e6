//! `Diagnosis`, `ServiceOrder` and `Prescription` controllers.

use super::IdParam;
use crate::reply::{body, created, ok, query, Reply};
use crate::services;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::routing::{get, post};
use axum::Router;
use clinic_core::model::clinical::{Diagnosis, Prescription, ServiceOrder};
use clinic_core::service::clinical_service::{
    DiagnosisRequest, PrescriptionRequest, ServiceOrderRequest,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct AssignBody {
    pub id: Uuid,
    pub technician_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteBody {
    pub id: Uuid,
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentParam {
    pub appointment_id: Uuid,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/Diagnosis/Create", post(create_diagnosis))
        .route("/api/ServiceOrder/Create", post(order_service))
        .route("/api/ServiceOrder/AssignTechnician", post(assign_technician))
        .route("/api/ServiceOrder/Start", post(start_service))
        .route("/api/ServiceOrder/Complete", post(complete_service))
        .route("/api/ServiceOrder/Cancel", post(cancel_service))
        .route("/api/ServiceOrder/ListByAppointment", get(list_service_orders))
        .route("/api/Prescription/Create", post(prescribe))
        .route("/api/Prescription/GetById", get(get_prescription))
}

async fn create_diagnosis(
    State(state): State<AppState>,
    payload: Result<Json<DiagnosisRequest>, JsonRejection>,
) -> Reply<Diagnosis> {
    let now = state.now();
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::clinical(conn)?.create_diagnosis(&request, now))
    });
    created("diagnosis_create", "Diagnosis recorded.", result)
}

async fn order_service(
    State(state): State<AppState>,
    payload: Result<Json<ServiceOrderRequest>, JsonRejection>,
) -> Reply<ServiceOrder> {
    let now = state.now();
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::clinical(conn)?.order_service(&request, now))
    });
    created("service_order_create", "Service ordered.", result)
}

async fn assign_technician(
    State(state): State<AppState>,
    payload: Result<Json<AssignBody>, JsonRejection>,
) -> Reply<ServiceOrder> {
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| {
            services::clinical(conn)?.assign_technician(request.id, request.technician_id)
        })
    });
    ok("service_order_assign", "Technician assigned.", result)
}

async fn start_service(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<ServiceOrder> {
    let result = body(payload).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::clinical(conn)?.start_service(id))
    });
    ok("service_order_start", "Service started.", result)
}

async fn complete_service(
    State(state): State<AppState>,
    payload: Result<Json<CompleteBody>, JsonRejection>,
) -> Reply<ServiceOrder> {
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::clinical(conn)?.complete_service(request.id, &request.result))
    });
    ok("service_order_complete", "Service completed.", result)
}

async fn cancel_service(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<ServiceOrder> {
    let result = body(payload).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::clinical(conn)?.cancel_service(id))
    });
    ok("service_order_cancel", "Service cancelled.", result)
}

async fn list_service_orders(
    State(state): State<AppState>,
    params: Result<Query<AppointmentParam>, QueryRejection>,
) -> Reply<Vec<ServiceOrder>> {
    let result = query(params).and_then(|AppointmentParam { appointment_id }| {
        state.with_conn(|conn| services::clinical(conn)?.list_service_orders(appointment_id))
    });
    ok("service_order_list", "Service orders loaded.", result)
}

async fn prescribe(
    State(state): State<AppState>,
    payload: Result<Json<PrescriptionRequest>, JsonRejection>,
) -> Reply<Prescription> {
    let now = state.now();
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::clinical(conn)?.prescribe(&request, now))
    });
    created("prescription_create", "Prescription issued.", result)
}

async fn get_prescription(
    State(state): State<AppState>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> Reply<Prescription> {
    let result = query(params).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::clinical(conn)?.get_prescription(id))
    });
    ok("prescription_get", "Prescription loaded.", result)
}
