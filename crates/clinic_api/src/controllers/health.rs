use crate::reply::{ok, Reply};
use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct HealthInfo {
    pub ping: &'static str,
    pub version: &'static str,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/api/Health/Ping", get(ping))
}

async fn ping() -> Reply<HealthInfo> {
    ok(
        "health_ping",
        "Service is up.",
        Ok(HealthInfo {
            ping: clinic_core::ping(),
            version: clinic_core::core_version(),
        }),
    )
}
