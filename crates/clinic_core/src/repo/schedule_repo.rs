//! Staff schedule persistence.

use super::{ensure_connection_ready, uuid_column, RepoError, RepoResult};
use crate::model::schedule::{ScheduleId, StaffSchedule};
use crate::model::user::UserId;
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

const SCHEDULE_SELECT_SQL: &str = "SELECT
    id,
    staff_id,
    work_date,
    start_time,
    end_time,
    room,
    note
FROM staff_schedules";

pub trait ScheduleRepository {
    fn create_schedule(&self, schedule: &StaffSchedule) -> RepoResult<ScheduleId>;
    fn update_schedule(&self, schedule: &StaffSchedule) -> RepoResult<()>;
    fn delete_schedule(&self, id: ScheduleId) -> RepoResult<()>;
    fn get_schedule(&self, id: ScheduleId) -> RepoResult<Option<StaffSchedule>>;
    /// Schedules of one staff member within `[from, to]`, ordered by time.
    fn list_for_staff(
        &self,
        staff_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<StaffSchedule>>;
}

pub struct SqliteScheduleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScheduleRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ScheduleRepository for SqliteScheduleRepository<'_> {
    fn create_schedule(&self, schedule: &StaffSchedule) -> RepoResult<ScheduleId> {
        schedule.validate()?;
        self.conn.execute(
            "INSERT INTO staff_schedules (id, staff_id, work_date, start_time, end_time, room, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                schedule.id.to_string(),
                schedule.staff_id.to_string(),
                schedule.work_date,
                schedule.start_time,
                schedule.end_time,
                schedule.room.as_deref(),
                schedule.note.as_deref(),
            ],
        )?;
        Ok(schedule.id)
    }

    fn update_schedule(&self, schedule: &StaffSchedule) -> RepoResult<()> {
        schedule.validate()?;
        let changed = self.conn.execute(
            "UPDATE staff_schedules
             SET staff_id = ?2, work_date = ?3, start_time = ?4, end_time = ?5, room = ?6, note = ?7
             WHERE id = ?1;",
            params![
                schedule.id.to_string(),
                schedule.staff_id.to_string(),
                schedule.work_date,
                schedule.start_time,
                schedule.end_time,
                schedule.room.as_deref(),
                schedule.note.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "schedule",
                id: schedule.id,
            });
        }
        Ok(())
    }

    fn delete_schedule(&self, id: ScheduleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM staff_schedules WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "schedule",
                id,
            });
        }
        Ok(())
    }

    fn get_schedule(&self, id: ScheduleId) -> RepoResult<Option<StaffSchedule>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCHEDULE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_schedule_row(row)?));
        }
        Ok(None)
    }

    fn list_for_staff(
        &self,
        staff_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<StaffSchedule>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SCHEDULE_SELECT_SQL}
             WHERE staff_id = ?1
               AND work_date BETWEEN ?2 AND ?3
             ORDER BY work_date ASC, start_time ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![staff_id.to_string(), from, to])?;
        let mut schedules = Vec::new();
        while let Some(row) = rows.next()? {
            schedules.push(parse_schedule_row(row)?);
        }
        Ok(schedules)
    }
}

fn parse_schedule_row(row: &Row<'_>) -> RepoResult<StaffSchedule> {
    Ok(StaffSchedule {
        id: uuid_column(row, "id")?,
        staff_id: uuid_column(row, "staff_id")?,
        work_date: row.get("work_date")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        room: row.get("room")?,
        note: row.get("note")?,
    })
}
