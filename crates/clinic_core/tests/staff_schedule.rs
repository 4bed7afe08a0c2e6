use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clinic_core::db::open_db_in_memory;
use clinic_core::model::user::{Role, UserId};
use clinic_core::repo::schedule_repo::SqliteScheduleRepository;
use clinic_core::repo::user_repo::SqliteUserRepository;
use clinic_core::service::schedule_service::{ScheduleInput, ScheduleService};
use clinic_core::service::user_service::{CreateUserRequest, UserService};
use clinic_core::ServiceError;
use rusqlite::Connection;

fn service(
    conn: &Connection,
) -> ScheduleService<SqliteScheduleRepository<'_>, SqliteUserRepository<'_>> {
    ScheduleService::new(
        SqliteScheduleRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
    )
}

fn created_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn create_user(conn: &Connection, username: &str, role: Role) -> UserId {
    let users = UserService::new(SqliteUserRepository::try_new(conn).unwrap());
    users
        .create(
            &CreateUserRequest {
                username: username.to_string(),
                full_name: username.to_string(),
                email: None,
                phone: None,
                roles: vec![role],
            },
            created_at(),
        )
        .unwrap()
        .id
}

fn shift(staff_id: UserId, start: NaiveTime, end: NaiveTime) -> ScheduleInput {
    ScheduleInput {
        staff_id,
        work_date: day(),
        start_time: start,
        end_time: end,
        room: Some(" R1 ".to_string()),
        note: None,
    }
}

#[test]
fn overlapping_shift_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let doctor = create_user(&conn, "dr.an", Role::Doctor);
    let service = service(&conn);

    let morning = service.create(&shift(doctor, t(7, 0), t(11, 0))).unwrap();
    assert_eq!(morning.room.as_deref(), Some("R1"));

    let err = service
        .create(&shift(doctor, t(10, 30), t(12, 0)))
        .unwrap_err();
    match err {
        ServiceError::ScheduleOverlap { existing } => assert_eq!(existing, morning.id),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn touching_shifts_do_not_overlap() {
    let conn = open_db_in_memory().unwrap();
    let doctor = create_user(&conn, "dr.an", Role::Doctor);
    let service = service(&conn);

    service.create(&shift(doctor, t(7, 0), t(11, 0))).unwrap();
    service.create(&shift(doctor, t(11, 0), t(13, 0))).unwrap();
    service.create(&shift(doctor, t(6, 0), t(7, 0))).unwrap();

    assert_eq!(service.list(doctor, day(), day()).unwrap().len(), 3);
}

#[test]
fn other_doctors_and_days_are_independent() {
    let conn = open_db_in_memory().unwrap();
    let first = create_user(&conn, "dr.an", Role::Doctor);
    let second = create_user(&conn, "dr.binh", Role::Doctor);
    let service = service(&conn);

    service.create(&shift(first, t(7, 0), t(11, 0))).unwrap();
    service.create(&shift(second, t(7, 0), t(11, 0))).unwrap();

    let mut next_day = shift(first, t(7, 0), t(11, 0));
    next_day.work_date = day().succ_opt().unwrap();
    service.create(&next_day).unwrap();
}

#[test]
fn only_doctors_get_schedules() {
    let conn = open_db_in_memory().unwrap();
    let technician = create_user(&conn, "tech.lam", Role::Technician);
    let service = service(&conn);

    let err = service
        .create(&shift(technician, t(7, 0), t(11, 0)))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::RoleRequired {
            role: Role::Doctor,
            ..
        }
    ));

    let err = service
        .create(&shift(uuid::Uuid::new_v4(), t(7, 0), t(11, 0)))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[test]
fn start_must_precede_end() {
    let conn = open_db_in_memory().unwrap();
    let doctor = create_user(&conn, "dr.an", Role::Doctor);
    let service = service(&conn);

    let err = service.create(&shift(doctor, t(9, 0), t(9, 0))).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err}");
    let err = service.create(&shift(doctor, t(11, 0), t(9, 0))).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err}");
}

#[test]
fn update_ignores_its_own_interval() {
    let conn = open_db_in_memory().unwrap();
    let doctor = create_user(&conn, "dr.an", Role::Doctor);
    let service = service(&conn);

    let morning = service.create(&shift(doctor, t(7, 0), t(11, 0))).unwrap();
    let afternoon = service.create(&shift(doctor, t(13, 0), t(16, 0))).unwrap();

    let extended = service
        .update(morning.id, &shift(doctor, t(7, 0), t(12, 0)))
        .unwrap();
    assert_eq!(extended.end_time, t(12, 0));

    let err = service
        .update(morning.id, &shift(doctor, t(7, 0), t(14, 0)))
        .unwrap_err();
    match err {
        ServiceError::ScheduleOverlap { existing } => assert_eq!(existing, afternoon.id),
        other => panic!("unexpected error: {other}"),
    }

    service.delete(afternoon.id).unwrap();
    service
        .update(morning.id, &shift(doctor, t(7, 0), t(14, 0)))
        .unwrap();
}
