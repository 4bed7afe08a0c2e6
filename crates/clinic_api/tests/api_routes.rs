use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clinic_api::{build_router, AppState};
use clinic_core::db::open_db_in_memory;
use clinic_core::service::otp_service::OtpDelivery;
use clinic_core::FixedClock;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct CapturingDelivery {
    codes: Mutex<Vec<String>>,
}

impl OtpDelivery for CapturingDelivery {
    fn deliver(&self, _destination: &str, code: &str) -> Result<(), String> {
        self.codes.lock().unwrap().push(code.to_string());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    clock: Arc<FixedClock>,
    delivery: Arc<CapturingDelivery>,
}

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 9)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn app() -> TestApp {
    let clock = Arc::new(FixedClock::new(start()));
    let delivery = Arc::new(CapturingDelivery::default());
    let state = AppState::new(open_db_in_memory().unwrap())
        .with_clock(clock.clone())
        .with_otp_delivery(delivery.clone())
        .with_consultation_fee(100_000);
    TestApp {
        router: build_router(state),
        clock,
        delivery,
    }
}

impl TestApp {
    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Body::empty()).await
    }

    async fn post(&self, uri: &str, payload: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Body::from(payload.to_string()))
            .await
    }

    async fn send(&self, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn register_patient(&self, phone: &str) -> String {
        let (status, body) = self
            .post(
                "/api/Patient/Register",
                json!({
                    "full_name": "Nguyen Thi Hoa",
                    "gender": "female",
                    "phone": phone,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_user(&self, username: &str, roles: Value) -> String {
        let (status, body) = self
            .post(
                "/api/User/Create",
                json!({ "username": username, "full_name": username, "roles": roles }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_ping_returns_envelope() {
    let app = app();
    let (status, body) = app.get("/api/Health/Ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["ping"], "pong");
}

#[tokio::test]
async fn booking_flow_reports_slots_and_blocks_late_cancellation() {
    let app = app();
    let patient_id = app.register_patient("0901111222").await;

    let (status, body) = app
        .get("/api/Appointment/AvailableSlots?date=2026-03-10")
        .await;
    assert_eq!(status, StatusCode::OK);
    let slots = body["data"].as_array().unwrap();
    assert_eq!(slots.len(), 17);
    assert_eq!(slots[0]["time"], "07:00");

    let (status, body) = app
        .post(
            "/api/Appointment/Book",
            json!({ "patient_id": patient_id, "date": "2026-03-10", "time": "09:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let appointment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .get("/api/Appointment/AvailableSlots?date=2026-03-10")
        .await;
    let nine = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|slot| slot["time"] == "09:00")
        .cloned()
        .unwrap();
    assert_eq!(nine["booked"], 1);

    app.clock.advance(Duration::hours(10));
    let (status, body) = app
        .post("/api/Appointment/Cancel", json!({ "id": appointment_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "bad_request");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn unknown_record_is_not_found() {
    let app = app();
    let (status, body) = app
        .get("/api/Appointment/GetById?id=00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn malformed_input_is_a_bad_request_envelope() {
    let app = app();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/Appointment/Book",
            Body::from("{not json"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "bad_request");

    let (status, body) = app.get("/api/Appointment/GetById?id=42").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn schedule_overlap_is_rejected_over_http() {
    let app = app();
    let doctor = app.create_user("dr.an", json!(["doctor"])).await;
    let desk = app.create_user("desk", json!(["receptionist"])).await;

    let shift = |staff: &str, start: &str, end: &str| {
        json!({
            "staff_id": staff,
            "work_date": "2026-03-10",
            "start_time": start,
            "end_time": end,
        })
    };

    let (status, _) = app
        .post("/api/Schedule/Create", shift(&doctor, "07:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .post("/api/Schedule/Create", shift(&doctor, "10:00", "12:00"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("overlaps"));
    let (status, _) = app
        .post("/api/Schedule/Create", shift(&doctor, "11:00", "12:00"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post("/api/Schedule/Create", shift(&desk, "07:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .get(&format!(
            "/api/Schedule/List?staff_id={doctor}&from=2026-03-10&to=2026-03-10"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn queue_numbers_and_call_next() {
    let app = app();
    let patient_id = app.register_patient("0903333444").await;

    for expected in 1..=2_u32 {
        let (status, body) = app
            .post(
                "/api/Queue/Enqueue",
                json!({ "patient_id": patient_id, "room": "R1" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["number"], expected);
    }

    let (status, body) = app.post("/api/Queue/CallNext", json!({ "room": "R1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["number"], 1);
    assert_eq!(body["data"]["status"], "in_progress");

    let (_, body) = app.get("/api/Queue/List?room=R1").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn otp_requests_are_rate_limited_and_verified() {
    let app = app();
    let destination = json!({ "destination": "patient@clinic.vn" });

    for _ in 0..3 {
        let (status, body) = app.post("/api/Auth/RequestOtp", destination.clone()).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    let (status, body) = app.post("/api/Auth/RequestOtp", destination.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("retry"));

    let code = app.delivery.codes.lock().unwrap().last().cloned().unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let (status, _) = app
        .post(
            "/api/Auth/VerifyOtp",
            json!({ "destination": "patient@clinic.vn", "code": wrong }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/api/Auth/VerifyOtp",
            json!({ "destination": "patient@clinic.vn", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn invoice_uses_configured_consultation_fee() {
    let app = app();
    let patient_id = app.register_patient("0905555666").await;
    let (_, body) = app
        .post(
            "/api/Appointment/Book",
            json!({ "patient_id": patient_id, "date": "2026-03-10", "time": "13:30" }),
        )
        .await;
    let appointment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/Invoice/Generate",
            json!({ "appointment_id": appointment_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["total"], 100_000);
    assert_eq!(body["data"]["status"], "unpaid");
    let invoice_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.post("/api/Invoice/Pay", json!({ "id": invoice_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");
}
