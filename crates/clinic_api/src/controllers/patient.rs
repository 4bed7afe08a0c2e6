use super::IdParam;
use crate::reply::{body, created, ok, query, Reply};
use crate::services;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::routing::{get, post};
use axum::Router;
use clinic_core::model::patient::{MedicalRecord, Patient};
use clinic_core::repo::patient_repo::PatientListQuery;
use clinic_core::service::patient_service::{MedicalHistory, MedicalRecordInput, PatientInput};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct UpdatePatientBody {
    pub id: Uuid,
    #[serde(flatten)]
    pub patient: PatientInput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PatientListParams {
    pub search: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PatientParam {
    pub patient_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateRecordBody {
    pub patient_id: Uuid,
    #[serde(flatten)]
    pub record: MedicalRecordInput,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/Patient/Register", post(register))
        .route("/api/Patient/Update", post(update))
        .route("/api/Patient/GetById", get(get_by_id))
        .route("/api/Patient/List", get(list))
        .route("/api/Patient/MedicalHistory", get(medical_history))
        .route("/api/Patient/UpdateMedicalRecord", post(update_medical_record))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Reply<Patient> {
    let now = state.now();
    let result = body(payload)
        .and_then(|input| state.with_conn(|conn| services::patients(conn)?.register(&input, now)));
    created("patient_register", "Patient registered.", result)
}

async fn update(
    State(state): State<AppState>,
    payload: Result<Json<UpdatePatientBody>, JsonRejection>,
) -> Reply<Patient> {
    let now = state.now();
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::patients(conn)?.update(request.id, &request.patient, now))
    });
    ok("patient_update", "Patient updated.", result)
}

async fn get_by_id(
    State(state): State<AppState>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> Reply<Patient> {
    let result = query(params)
        .and_then(|IdParam { id }| state.with_conn(|conn| services::patients(conn)?.get(id)));
    ok("patient_get", "Patient loaded.", result)
}

async fn list(
    State(state): State<AppState>,
    params: Result<Query<PatientListParams>, QueryRejection>,
) -> Reply<Vec<Patient>> {
    let result = query(params).and_then(|params| {
        let list_query = PatientListQuery {
            search: params.search,
            limit: params.limit,
            offset: params.offset,
        };
        state.with_conn(|conn| services::patients(conn)?.list(&list_query))
    });
    ok("patient_list", "Patients loaded.", result)
}

async fn medical_history(
    State(state): State<AppState>,
    params: Result<Query<PatientParam>, QueryRejection>,
) -> Reply<MedicalHistory> {
    let result = query(params).and_then(|PatientParam { patient_id }| {
        state.with_conn(|conn| services::patients(conn)?.medical_history(patient_id))
    });
    ok("patient_history", "Medical history loaded.", result)
}

async fn update_medical_record(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRecordBody>, JsonRejection>,
) -> Reply<MedicalRecord> {
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| {
            services::patients(conn)?.update_medical_record(request.patient_id, &request.record)
        })
    });
    ok("patient_record_update", "Medical record updated.", result)
}
