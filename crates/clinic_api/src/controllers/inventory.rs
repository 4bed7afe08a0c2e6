//! `Medicine`, `Supplier` and `ImportBill` controllers.

use super::IdParam;
use crate::reply::{body, created, ok, query, Reply};
use crate::services;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::routing::{get, post};
use axum::Router;
use clinic_core::model::inventory::{ImportBill, Medicine, Supplier};
use clinic_core::service::inventory_service::{ImportBillRequest, MedicineInput, SupplierInput};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateMedicineBody {
    pub id: Uuid,
    #[serde(flatten)]
    pub medicine: MedicineInput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MedicineListParams {
    #[serde(default)]
    pub include_inactive: bool,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/Medicine/Create", post(create_medicine))
        .route("/api/Medicine/Update", post(update_medicine))
        .route("/api/Medicine/Deactivate", post(deactivate_medicine))
        .route("/api/Medicine/GetById", get(get_medicine))
        .route("/api/Medicine/List", get(list_medicines))
        .route("/api/Supplier/Create", post(create_supplier))
        .route("/api/Supplier/GetById", get(get_supplier))
        .route("/api/Supplier/List", get(list_suppliers))
        .route("/api/ImportBill/Create", post(import_stock))
        .route("/api/ImportBill/GetById", get(get_import_bill))
}

async fn create_medicine(
    State(state): State<AppState>,
    payload: Result<Json<MedicineInput>, JsonRejection>,
) -> Reply<Medicine> {
    let result = body(payload).and_then(|input| {
        state.with_conn(|conn| services::inventory(conn)?.create_medicine(&input))
    });
    created("medicine_create", "Medicine created.", result)
}

async fn update_medicine(
    State(state): State<AppState>,
    payload: Result<Json<UpdateMedicineBody>, JsonRejection>,
) -> Reply<Medicine> {
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| {
            services::inventory(conn)?.update_medicine(request.id, &request.medicine)
        })
    });
    ok("medicine_update", "Medicine updated.", result)
}

async fn deactivate_medicine(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<Medicine> {
    let result = body(payload).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::inventory(conn)?.deactivate_medicine(id))
    });
    ok("medicine_deactivate", "Medicine deactivated.", result)
}

async fn get_medicine(
    State(state): State<AppState>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> Reply<Medicine> {
    let result = query(params).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::inventory(conn)?.get_medicine(id))
    });
    ok("medicine_get", "Medicine loaded.", result)
}

async fn list_medicines(
    State(state): State<AppState>,
    params: Result<Query<MedicineListParams>, QueryRejection>,
) -> Reply<Vec<Medicine>> {
    let result = query(params).and_then(|params| {
        state.with_conn(|conn| services::inventory(conn)?.list_medicines(params.include_inactive))
    });
    ok("medicine_list", "Medicines loaded.", result)
}

async fn create_supplier(
    State(state): State<AppState>,
    payload: Result<Json<SupplierInput>, JsonRejection>,
) -> Reply<Supplier> {
    let result = body(payload).and_then(|input| {
        state.with_conn(|conn| services::inventory(conn)?.create_supplier(&input))
    });
    created("supplier_create", "Supplier created.", result)
}

async fn get_supplier(
    State(state): State<AppState>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> Reply<Supplier> {
    let result = query(params).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::inventory(conn)?.get_supplier(id))
    });
    ok("supplier_get", "Supplier loaded.", result)
}

async fn list_suppliers(State(state): State<AppState>) -> Reply<Vec<Supplier>> {
    let result = state.with_conn(|conn| services::inventory(conn)?.list_suppliers());
    ok("supplier_list", "Suppliers loaded.", result)
}

async fn import_stock(
    State(state): State<AppState>,
    payload: Result<Json<ImportBillRequest>, JsonRejection>,
) -> Reply<ImportBill> {
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::inventory(conn)?.import_stock(&request))
    });
    created("import_bill_create", "Stock imported.", result)
}

async fn get_import_bill(
    State(state): State<AppState>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> Reply<ImportBill> {
    let result = query(params).and_then(|IdParam { id }| {
        state.with_conn(|conn| services::inventory(conn)?.get_import_bill(id))
    });
    ok("import_bill_get", "Import bill loaded.", result)
}
