use chrono::{Duration, NaiveDate, NaiveDateTime};
use clinic_core::db::{open_db, open_db_in_memory};
use clinic_core::model::patient::{Gender, PatientId};
use clinic_core::model::queue::QueueStatus;
use clinic_core::repo::appointment_repo::SqliteAppointmentRepository;
use clinic_core::repo::clinical_repo::SqliteClinicalRepository;
use clinic_core::repo::patient_repo::SqlitePatientRepository;
use clinic_core::repo::queue_repo::SqliteQueueRepository;
use clinic_core::service::patient_service::{PatientInput, PatientService};
use clinic_core::service::queue_service::{EnqueueRequest, QueueService};
use clinic_core::ServiceError;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::thread;

type Queue<'conn> = QueueService<
    SqliteQueueRepository<'conn>,
    SqlitePatientRepository<'conn>,
    SqliteAppointmentRepository<'conn>,
>;

fn service(conn: &Connection) -> Queue<'_> {
    QueueService::new(
        SqliteQueueRepository::try_new(conn).unwrap(),
        SqlitePatientRepository::try_new(conn).unwrap(),
        SqliteAppointmentRepository::try_new(conn).unwrap(),
    )
}

fn morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 10)
        .unwrap()
        .and_hms_opt(7, 15, 0)
        .unwrap()
}

fn register_patient(conn: &Connection) -> PatientId {
    let service = PatientService::new(
        SqlitePatientRepository::try_new(conn).unwrap(),
        SqliteClinicalRepository::try_new(conn).unwrap(),
    );
    service
        .register(
            &PatientInput {
                user_id: None,
                full_name: "Tran Thi Mai".to_string(),
                date_of_birth: None,
                gender: Gender::Female,
                phone: "0912345678".to_string(),
                email: None,
                address: None,
            },
            morning(),
        )
        .unwrap()
        .id
}

fn ticket(patient_id: PatientId, room: &str) -> EnqueueRequest {
    EnqueueRequest {
        patient_id,
        appointment_id: None,
        room: room.to_string(),
        date: None,
    }
}

#[test]
fn numbers_count_up_per_room_and_day() {
    let conn = open_db_in_memory().unwrap();
    let patient = register_patient(&conn);
    let queue = service(&conn);

    let numbers: Vec<u32> = (0..3)
        .map(|_| queue.enqueue(&ticket(patient, "R1"), morning()).unwrap().number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let other_room = queue.enqueue(&ticket(patient, "R2"), morning()).unwrap();
    assert_eq!(other_room.number, 1);

    let trimmed = queue.enqueue(&ticket(patient, "  R1 "), morning()).unwrap();
    assert_eq!(trimmed.number, 4);
    assert_eq!(trimmed.room, "R1");

    let next_day = queue
        .enqueue(&ticket(patient, "R1"), morning() + Duration::days(1))
        .unwrap();
    assert_eq!(next_day.number, 1);
}

#[test]
fn numbers_are_not_reused_after_status_changes() {
    let conn = open_db_in_memory().unwrap();
    let patient = register_patient(&conn);
    let queue = service(&conn);

    let first = queue.enqueue(&ticket(patient, "R1"), morning()).unwrap();
    queue.update_status(first.id, QueueStatus::Skipped).unwrap();
    let second = queue.enqueue(&ticket(patient, "R1"), morning()).unwrap();
    assert_eq!(second.number, 2);
}

#[test]
fn blank_room_and_unknown_patient_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let patient = register_patient(&conn);
    let queue = service(&conn);

    let err = queue.enqueue(&ticket(patient, "   "), morning()).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = queue
        .enqueue(&ticket(uuid::Uuid::new_v4(), "R1"), morning())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[test]
fn call_next_serves_lowest_waiting_number() {
    let conn = open_db_in_memory().unwrap();
    let patient = register_patient(&conn);
    let queue = service(&conn);
    let today = morning().date();

    let first = queue.enqueue(&ticket(patient, "R1"), morning()).unwrap();
    let second = queue.enqueue(&ticket(patient, "R1"), morning()).unwrap();
    queue.update_status(first.id, QueueStatus::Skipped).unwrap();

    let called = queue.call_next("R1", today).unwrap().unwrap();
    assert_eq!(called.id, second.id);
    assert_eq!(called.status, QueueStatus::InProgress);
    assert!(queue.call_next("R1", today).unwrap().is_none());

    queue.update_status(first.id, QueueStatus::Waiting).unwrap();
    let recalled = queue.call_next("R1", today).unwrap().unwrap();
    assert_eq!(recalled.id, first.id);
}

#[test]
fn invalid_queue_transitions_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let patient = register_patient(&conn);
    let queue = service(&conn);

    let entry = queue.enqueue(&ticket(patient, "R1"), morning()).unwrap();
    let err = queue.update_status(entry.id, QueueStatus::Done).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));

    queue.update_status(entry.id, QueueStatus::InProgress).unwrap();
    queue.update_status(entry.id, QueueStatus::Done).unwrap();
    let err = queue
        .update_status(entry.id, QueueStatus::Waiting)
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));
}

#[test]
fn concurrent_connections_never_share_a_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.sqlite3");
    let patient = register_patient(&open_db(&path).unwrap());

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let queue = service(&conn);
                (0..5)
                    .map(|_| queue.enqueue(&ticket(patient, "R1"), morning()).unwrap().number)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let numbers: BTreeSet<u32> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .collect();
    assert_eq!(numbers, (1..=20).collect::<BTreeSet<u32>>());
}

#[test]
fn explicit_queue_day_is_honoured_and_past_days_rejected() {
    let conn = open_db_in_memory().unwrap();
    let patient = register_patient(&conn);
    let queue = service(&conn);
    let tomorrow = morning().date() + Duration::days(1);

    queue.enqueue(&ticket(patient, "R1"), morning()).unwrap();
    let ahead = queue
        .enqueue(
            &EnqueueRequest {
                date: Some(tomorrow),
                ..ticket(patient, "R1")
            },
            morning(),
        )
        .unwrap();
    assert_eq!(ahead.queue_date, tomorrow);
    assert_eq!(ahead.number, 1);
    assert_eq!(queue.list("R1", tomorrow).unwrap(), vec![ahead]);

    let err = queue
        .enqueue(
            &EnqueueRequest {
                date: Some(morning().date() - Duration::days(1)),
                ..ticket(patient, "R1")
            },
            morning(),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}
