//! Appointment record and lifecycle.
//!
//! # Invariants
//! - `time` is the start of one of the fixed half-hour booking slots.
//! - Status moves forward only:
//!   `pending -> confirmed -> checked_in -> completed`, with `cancelled`
//!   reachable from `pending` and `confirmed`.

use super::patient::PatientId;
use super::user::UserId;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AppointmentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "checked_in" => Some(Self::CheckedIn),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether an appointment in this state still occupies its slot.
    pub fn occupies_slot(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Whether the appointment can still be moved or cancelled.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending | Self::Confirmed, Self::CheckedIn)
                | (Self::CheckedIn, Self::Completed)
                | (Self::Pending | Self::Confirmed, Self::Cancelled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: Option<UserId>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub cancelled_reason: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    /// Creates a pending appointment with a fresh id.
    pub fn new(
        patient_id: PatientId,
        doctor_id: Option<UserId>,
        date: NaiveDate,
        time: NaiveTime,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            date,
            time,
            status: AppointmentStatus::Pending,
            reason: None,
            cancelled_reason: None,
            created_at,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::AppointmentStatus::*;

    #[test]
    fn only_open_states_can_be_cancelled() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!CheckedIn.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn completion_requires_check_in() {
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Completed));
        assert!(CheckedIn.can_transition_to(Completed));
    }

    #[test]
    fn finished_states_release_the_slot() {
        assert!(Pending.occupies_slot());
        assert!(CheckedIn.occupies_slot());
        assert!(!Cancelled.occupies_slot());
        assert!(!Completed.occupies_slot());
    }
}
