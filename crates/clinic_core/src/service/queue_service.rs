//! Per-room daily queue.
//!
//! # Invariants
//! - Numbers are allocated by the repository as `max + 1` per room and day.
//! - Room names are trimmed before use, so ` R1 ` and `R1` share a queue.

use super::error::{ServiceError, ServiceResult};
use crate::model::appointment::AppointmentId;
use crate::model::patient::PatientId;
use crate::model::queue::{QueueEntry, QueueEntryId, QueueStatus};
use crate::model::validation::ValidationError;
use crate::repo::appointment_repo::AppointmentRepository;
use crate::repo::patient_repo::PatientRepository;
use crate::repo::queue_repo::{NewQueueEntry, QueueRepository};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnqueueRequest {
    pub patient_id: PatientId,
    pub appointment_id: Option<AppointmentId>,
    pub room: String,
    /// Queue day; `None` means today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

pub struct QueueService<Q, P, A>
where
    Q: QueueRepository,
    P: PatientRepository,
    A: AppointmentRepository,
{
    queue: Q,
    patients: P,
    appointments: A,
}

impl<Q, P, A> QueueService<Q, P, A>
where
    Q: QueueRepository,
    P: PatientRepository,
    A: AppointmentRepository,
{
    pub fn new(queue: Q, patients: P, appointments: A) -> Self {
        Self {
            queue,
            patients,
            appointments,
        }
    }

    /// Adds a patient to the queue of `room` for the requested day, today by default.
    pub fn enqueue(&self, request: &EnqueueRequest, now: NaiveDateTime) -> ServiceResult<QueueEntry> {
        let room = normalize_room(&request.room)?;
        let queue_date = request.date.unwrap_or(now.date());
        if queue_date < now.date() {
            return Err(ValidationError::OutOfRange {
                field: "date",
                message: format!("must not be before {}, got {queue_date}", now.date()),
            }
            .into());
        }
        if self.patients.get_patient(request.patient_id)?.is_none() {
            return Err(ServiceError::NotFound {
                entity: "patient",
                id: request.patient_id,
            });
        }
        if let Some(appointment_id) = request.appointment_id {
            let appointment = self
                .appointments
                .get_appointment(appointment_id)?
                .ok_or(ServiceError::NotFound {
                    entity: "appointment",
                    id: appointment_id,
                })?;
            if appointment.patient_id != request.patient_id {
                return Err(ServiceError::Conflict(format!(
                    "appointment {appointment_id} belongs to another patient"
                )));
            }
        }

        let entry = self.queue.enqueue(&NewQueueEntry {
            patient_id: request.patient_id,
            appointment_id: request.appointment_id,
            room: room.as_str(),
            queue_date,
            created_at: now,
        })?;
        info!(
            "event=queue_enqueue module=queue status=ok entry_id={} room={} number={}",
            entry.id, entry.room, entry.number
        );
        Ok(entry)
    }

    pub fn list(&self, room: &str, date: NaiveDate) -> ServiceResult<Vec<QueueEntry>> {
        let room = normalize_room(room)?;
        Ok(self.queue.list_entries(&room, date)?)
    }

    pub fn update_status(&self, id: QueueEntryId, next: QueueStatus) -> ServiceResult<QueueEntry> {
        let mut entry = self.queue.get_entry(id)?.ok_or(ServiceError::NotFound {
            entity: "queue entry",
            id,
        })?;
        if !entry.status.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition {
                entity: "queue entry",
                from: entry.status.as_str(),
                to: next.as_str(),
            });
        }
        self.queue.update_status(id, next)?;
        entry.status = next;
        Ok(entry)
    }

    /// Moves the lowest-numbered waiting entry to `in_progress`.
    pub fn call_next(&self, room: &str, date: NaiveDate) -> ServiceResult<Option<QueueEntry>> {
        let entries = self.list(room, date)?;
        let Some(next) = entries
            .into_iter()
            .find(|entry| entry.status == QueueStatus::Waiting)
        else {
            return Ok(None);
        };
        self.update_status(next.id, QueueStatus::InProgress).map(Some)
    }
}

fn normalize_room(room: &str) -> ServiceResult<String> {
    let trimmed = room.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank("room").into());
    }
    Ok(trimmed.to_string())
}
