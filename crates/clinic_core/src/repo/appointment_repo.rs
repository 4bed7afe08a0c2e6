//! Appointment persistence and slot occupancy queries.
//!
//! # Invariants
//! - Slot occupancy counts only statuses where
//!   `AppointmentStatus::occupies_slot()` holds.

use super::{enum_column, ensure_connection_ready, opt_id, optional_uuid_column, uuid_column};
use super::{RepoError, RepoResult};
use crate::model::appointment::{Appointment, AppointmentId, AppointmentStatus};
use crate::model::patient::PatientId;
use crate::model::user::UserId;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const APPOINTMENT_SELECT_SQL: &str = "SELECT
    id,
    patient_id,
    doctor_id,
    appointment_date,
    slot_time,
    status,
    reason,
    cancelled_reason,
    created_at
FROM appointments";

/// Status text list for slot-occupying appointments, used in SQL `IN (...)`.
const OCCUPYING_STATUSES_SQL: &str = "('pending', 'confirmed', 'checked_in')";

#[derive(Debug, Clone, Default)]
pub struct AppointmentListQuery {
    pub patient_id: Option<PatientId>,
    pub doctor_id: Option<UserId>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

pub trait AppointmentRepository {
    fn create_appointment(&self, appointment: &Appointment) -> RepoResult<AppointmentId>;
    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()>;
    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>>;
    fn list_appointments(&self, query: &AppointmentListQuery) -> RepoResult<Vec<Appointment>>;
    /// All appointments on `date`, any status.
    fn list_for_date(&self, date: NaiveDate) -> RepoResult<Vec<Appointment>>;
    /// Number of slot-occupying appointments in one slot.
    fn count_occupying(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<AppointmentId>,
    ) -> RepoResult<u32>;
    /// True when the patient already holds a slot-occupying booking there.
    fn patient_has_booking(
        &self,
        patient_id: PatientId,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<AppointmentId>,
    ) -> RepoResult<bool>;
}

pub struct SqliteAppointmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAppointmentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AppointmentRepository for SqliteAppointmentRepository<'_> {
    fn create_appointment(&self, appointment: &Appointment) -> RepoResult<AppointmentId> {
        self.conn.execute(
            "INSERT INTO appointments (
                id, patient_id, doctor_id, appointment_date, slot_time,
                status, reason, cancelled_reason, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                appointment.id.to_string(),
                appointment.patient_id.to_string(),
                opt_id(appointment.doctor_id),
                appointment.date,
                appointment.time,
                appointment.status.as_str(),
                appointment.reason.as_deref(),
                appointment.cancelled_reason.as_deref(),
                appointment.created_at,
            ],
        )?;
        Ok(appointment.id)
    }

    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE appointments
             SET doctor_id = ?2, appointment_date = ?3, slot_time = ?4, status = ?5,
                 reason = ?6, cancelled_reason = ?7
             WHERE id = ?1;",
            params![
                appointment.id.to_string(),
                opt_id(appointment.doctor_id),
                appointment.date,
                appointment.time,
                appointment.status.as_str(),
                appointment.reason.as_deref(),
                appointment.cancelled_reason.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "appointment",
                id: appointment.id,
            });
        }
        Ok(())
    }

    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{APPOINTMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_appointment_row(row)?));
        }
        Ok(None)
    }

    fn list_appointments(&self, query: &AppointmentListQuery) -> RepoResult<Vec<Appointment>> {
        let mut sql = format!("{APPOINTMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(patient_id) = query.patient_id {
            sql.push_str(" AND patient_id = ?");
            bind_values.push(Value::Text(patient_id.to_string()));
        }
        if let Some(doctor_id) = query.doctor_id {
            sql.push_str(" AND doctor_id = ?");
            bind_values.push(Value::Text(doctor_id.to_string()));
        }
        if let Some(date) = query.date {
            sql.push_str(" AND appointment_date = ?");
            bind_values.push(Value::Text(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY appointment_date ASC, slot_time ASC, created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut appointments = Vec::new();
        while let Some(row) = rows.next()? {
            appointments.push(parse_appointment_row(row)?);
        }
        Ok(appointments)
    }

    fn list_for_date(&self, date: NaiveDate) -> RepoResult<Vec<Appointment>> {
        self.list_appointments(&AppointmentListQuery {
            date: Some(date),
            ..AppointmentListQuery::default()
        })
    }

    fn count_occupying(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<AppointmentId>,
    ) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*)
                 FROM appointments
                 WHERE appointment_date = ?1
                   AND slot_time = ?2
                   AND status IN {OCCUPYING_STATUSES_SQL}
                   AND (?3 IS NULL OR id <> ?3);"
            ),
            params![date, time, opt_id(exclude)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn patient_has_booking(
        &self,
        patient_id: PatientId,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<AppointmentId>,
    ) -> RepoResult<bool> {
        let exists: bool = self.conn.query_row(
            &format!(
                "SELECT EXISTS(
                    SELECT 1 FROM appointments
                    WHERE patient_id = ?1
                      AND appointment_date = ?2
                      AND slot_time = ?3
                      AND status IN {OCCUPYING_STATUSES_SQL}
                      AND (?4 IS NULL OR id <> ?4)
                );"
            ),
            params![patient_id.to_string(), date, time, opt_id(exclude)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

fn parse_appointment_row(row: &Row<'_>) -> RepoResult<Appointment> {
    Ok(Appointment {
        id: uuid_column(row, "id")?,
        patient_id: uuid_column(row, "patient_id")?,
        doctor_id: optional_uuid_column(row, "doctor_id")?,
        date: row.get("appointment_date")?,
        time: row.get("slot_time")?,
        status: enum_column(row, "status", AppointmentStatus::parse)?,
        reason: row.get("reason")?,
        cancelled_reason: row.get("cancelled_reason")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::OCCUPYING_STATUSES_SQL;
    use crate::model::appointment::AppointmentStatus;

    #[test]
    fn occupying_status_sql_matches_model() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::CheckedIn,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            let listed = OCCUPYING_STATUSES_SQL.contains(&format!("'{}'", status.as_str()));
            assert_eq!(listed, status.occupies_slot(), "{status:?}");
        }
    }
}
