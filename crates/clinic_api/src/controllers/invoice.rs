use super::IdParam;
use crate::reply::{body, created, ok, query, Reply};
use crate::services;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::routing::{get, post};
use axum::Router;
use clinic_core::model::invoice::Invoice;
use clinic_core::model::Money;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateBody {
    pub appointment_id: Uuid,
    /// Falls back to the configured fee.
    pub consultation_fee: Option<Money>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/Invoice/Generate", post(generate))
        .route("/api/Invoice/GetById", get(get_by_id))
        .route("/api/Invoice/Pay", post(pay))
        .route("/api/Invoice/Cancel", post(cancel))
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Reply<Invoice> {
    let now = state.now();
    let default_fee = state.consultation_fee();
    let result = body(payload).and_then(|request| {
        let fee = request.consultation_fee.unwrap_or(default_fee);
        state.with_conn(|conn| {
            services::invoices(conn)?.generate_for_appointment(request.appointment_id, fee, now)
        })
    });
    created("invoice_generate", "Invoice generated.", result)
}

async fn get_by_id(
    State(state): State<AppState>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> Reply<Invoice> {
    let result = query(params)
        .and_then(|IdParam { id }| state.with_conn(|conn| services::invoices(conn)?.get(id)));
    ok("invoice_get", "Invoice loaded.", result)
}

async fn pay(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<Invoice> {
    let now = state.now();
    let result = body(payload)
        .and_then(|IdParam { id }| state.with_conn(|conn| services::invoices(conn)?.pay(id, now)));
    ok("invoice_pay", "Invoice paid.", result)
}

async fn cancel(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<Invoice> {
    let result = body(payload)
        .and_then(|IdParam { id }| state.with_conn(|conn| services::invoices(conn)?.cancel(id)));
    ok("invoice_cancel", "Invoice cancelled.", result)
}
