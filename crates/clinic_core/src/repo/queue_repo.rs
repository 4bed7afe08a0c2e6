//! Queue persistence and per-room number allocation.
//!
//! # Invariants
//! - `enqueue` reads `MAX(number)` and inserts inside one IMMEDIATE
//!   transaction, so two writers never observe the same maximum.
//! - `UNIQUE(room, queue_date, number)` backs the allocation.

use super::{enum_column, ensure_connection_ready, opt_id, optional_uuid_column, uuid_column};
use super::{RepoError, RepoResult};
use crate::model::appointment::AppointmentId;
use crate::model::patient::PatientId;
use crate::model::queue::{QueueEntry, QueueEntryId, QueueStatus};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const QUEUE_SELECT_SQL: &str = "SELECT
    id,
    patient_id,
    appointment_id,
    room,
    queue_date,
    number,
    status,
    created_at
FROM queue_entries";

/// Input for one queue allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueEntry<'a> {
    pub patient_id: PatientId,
    pub appointment_id: Option<AppointmentId>,
    pub room: &'a str,
    pub queue_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

pub trait QueueRepository {
    /// Allocates the next number for `room`/`queue_date` and inserts the entry.
    fn enqueue(&self, entry: &NewQueueEntry<'_>) -> RepoResult<QueueEntry>;
    fn get_entry(&self, id: QueueEntryId) -> RepoResult<Option<QueueEntry>>;
    fn update_status(&self, id: QueueEntryId, status: QueueStatus) -> RepoResult<()>;
    /// Entries for one room and day, ordered by number.
    fn list_entries(&self, room: &str, queue_date: NaiveDate) -> RepoResult<Vec<QueueEntry>>;
}

pub struct SqliteQueueRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteQueueRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl QueueRepository for SqliteQueueRepository<'_> {
    fn enqueue(&self, entry: &NewQueueEntry<'_>) -> RepoResult<QueueEntry> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let number: u32 = tx.query_row(
            "SELECT COALESCE(MAX(number), 0) + 1
             FROM queue_entries
             WHERE room = ?1 AND queue_date = ?2;",
            params![entry.room, entry.queue_date],
            |row| row.get(0),
        )?;

        let created = QueueEntry {
            id: Uuid::new_v4(),
            patient_id: entry.patient_id,
            appointment_id: entry.appointment_id,
            room: entry.room.to_string(),
            queue_date: entry.queue_date,
            number,
            status: QueueStatus::Waiting,
            created_at: entry.created_at,
        };
        tx.execute(
            "INSERT INTO queue_entries (
                id, patient_id, appointment_id, room, queue_date, number, status, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                created.id.to_string(),
                created.patient_id.to_string(),
                opt_id(created.appointment_id),
                created.room.as_str(),
                created.queue_date,
                created.number,
                created.status.as_str(),
                created.created_at,
            ],
        )?;
        tx.commit()?;

        Ok(created)
    }

    fn get_entry(&self, id: QueueEntryId) -> RepoResult<Option<QueueEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{QUEUE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_queue_row(row)?));
        }
        Ok(None)
    }

    fn update_status(&self, id: QueueEntryId, status: QueueStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE queue_entries SET status = ?2 WHERE id = ?1;",
            params![id.to_string(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "queue entry",
                id,
            });
        }
        Ok(())
    }

    fn list_entries(&self, room: &str, queue_date: NaiveDate) -> RepoResult<Vec<QueueEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{QUEUE_SELECT_SQL}
             WHERE room = ?1 AND queue_date = ?2
             ORDER BY number ASC;"
        ))?;
        let mut rows = stmt.query(params![room, queue_date])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_queue_row(row)?);
        }
        Ok(entries)
    }
}

fn parse_queue_row(row: &Row<'_>) -> RepoResult<QueueEntry> {
    Ok(QueueEntry {
        id: uuid_column(row, "id")?,
        patient_id: uuid_column(row, "patient_id")?,
        appointment_id: optional_uuid_column(row, "appointment_id")?,
        room: row.get("room")?,
        queue_date: row.get("queue_date")?,
        number: row.get("number")?,
        status: enum_column(row, "status", QueueStatus::parse)?,
        created_at: row.get("created_at")?,
    })
}
