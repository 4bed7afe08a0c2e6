use super::IdParam;
use crate::reply::{body, created, ok, query, Reply};
use crate::services;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::routing::{get, post};
use axum::Router;
use clinic_core::model::user::{Role, User};
use clinic_core::service::user_service::CreateUserRequest;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct UserListParams {
    pub role: Option<Role>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetRolesBody {
    pub id: Uuid,
    pub roles: Vec<Role>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/User/Create", post(create))
        .route("/api/User/GetById", get(get_by_id))
        .route("/api/User/List", get(list))
        .route("/api/User/SetRoles", post(set_roles))
        .route("/api/User/Deactivate", post(deactivate))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Reply<User> {
    let now = state.now();
    let result = body(payload)
        .and_then(|request| state.with_conn(|conn| services::users(conn)?.create(&request, now)));
    created("user_create", "User created.", result)
}

async fn get_by_id(
    State(state): State<AppState>,
    params: Result<Query<IdParam>, QueryRejection>,
) -> Reply<User> {
    let result = query(params)
        .and_then(|IdParam { id }| state.with_conn(|conn| services::users(conn)?.get(id)));
    ok("user_get", "User loaded.", result)
}

async fn list(
    State(state): State<AppState>,
    params: Result<Query<UserListParams>, QueryRejection>,
) -> Reply<Vec<User>> {
    let result = query(params).and_then(|params| {
        state.with_conn(|conn| services::users(conn)?.list(params.role, params.include_inactive))
    });
    ok("user_list", "Users loaded.", result)
}

async fn set_roles(
    State(state): State<AppState>,
    payload: Result<Json<SetRolesBody>, JsonRejection>,
) -> Reply<User> {
    let result = body(payload).and_then(|request| {
        state.with_conn(|conn| services::users(conn)?.set_roles(request.id, &request.roles))
    });
    ok("user_set_roles", "Roles updated.", result)
}

async fn deactivate(
    State(state): State<AppState>,
    payload: Result<Json<IdParam>, JsonRejection>,
) -> Reply<User> {
    let result = body(payload)
        .and_then(|IdParam { id }| state.with_conn(|conn| services::users(conn)?.deactivate(id)));
    ok("user_deactivate", "User deactivated.", result)
}
