//! Same-day waiting list entries, numbered per room.
//!
//! # Invariants
//! - `number` is unique per `(room, queue_date)` and starts at 1.

use super::appointment::AppointmentId;
use super::patient::PatientId;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type QueueEntryId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    InProgress,
    Done,
    Skipped,
}

impl QueueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(Self::Waiting),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// `skipped -> waiting` re-queues a patient under the same number.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::InProgress)
                | (Self::Waiting, Self::Skipped)
                | (Self::InProgress, Self::Done)
                | (Self::Skipped, Self::Waiting)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub patient_id: PatientId,
    pub appointment_id: Option<AppointmentId>,
    pub room: String,
    pub queue_date: NaiveDate,
    pub number: u32,
    pub status: QueueStatus,
    pub created_at: NaiveDateTime,
}
