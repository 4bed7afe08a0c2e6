//! Appointment booking, lifecycle and cancellation rules.
//!
//! # Invariants
//! - New bookings land only on a fixed, future slot with spare capacity.
//! - A patient holds at most one active booking per slot.
//! - Cancellation needs at least `CANCELLATION_NOTICE_HOURS` of notice.

use super::availability::{compute_availability, is_slot_time, slot_time_format, SlotAvailability, SLOT_CAPACITY};
use super::error::{ServiceError, ServiceResult};
use crate::model::appointment::{Appointment, AppointmentId, AppointmentStatus};
use crate::model::patient::PatientId;
use crate::model::user::{Role, UserId};
use crate::model::validation::normalize_optional_text;
use crate::repo::appointment_repo::{AppointmentListQuery, AppointmentRepository};
use crate::repo::patient_repo::PatientRepository;
use crate::repo::user_repo::UserRepository;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::{info, warn};
use serde::Deserialize;

pub const CANCELLATION_NOTICE_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: PatientId,
    pub doctor_id: Option<UserId>,
    pub date: NaiveDate,
    #[serde(with = "slot_time_format")]
    pub time: NaiveTime,
    pub reason: Option<String>,
}

pub struct AppointmentService<A, P, U>
where
    A: AppointmentRepository,
    P: PatientRepository,
    U: UserRepository,
{
    appointments: A,
    patients: P,
    users: U,
}

impl<A, P, U> AppointmentService<A, P, U>
where
    A: AppointmentRepository,
    P: PatientRepository,
    U: UserRepository,
{
    pub fn new(appointments: A, patients: P, users: U) -> Self {
        Self {
            appointments,
            patients,
            users,
        }
    }

    /// Per-slot availability for `date`, as seen at `now`.
    pub fn available_slots(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> ServiceResult<Vec<SlotAvailability>> {
        let appointments = self.appointments.list_for_date(date)?;
        Ok(compute_availability(date, now, &appointments))
    }

    pub fn book(
        &self,
        request: &BookAppointmentRequest,
        now: NaiveDateTime,
    ) -> ServiceResult<Appointment> {
        if self.patients.get_patient(request.patient_id)?.is_none() {
            return Err(ServiceError::NotFound {
                entity: "patient",
                id: request.patient_id,
            });
        }
        if let Some(doctor_id) = request.doctor_id {
            self.ensure_doctor(doctor_id)?;
        }
        self.ensure_bookable(request.patient_id, request.date, request.time, now, None)?;

        let mut appointment = Appointment::new(
            request.patient_id,
            request.doctor_id,
            request.date,
            request.time,
            now,
        );
        appointment.reason = normalize_optional_text(request.reason.as_deref());
        self.appointments.create_appointment(&appointment)?;

        info!(
            "event=appointment_book module=appointment status=ok appointment_id={} date={} slot={}",
            appointment.id,
            appointment.date,
            appointment.time.format("%H:%M")
        );
        Ok(appointment)
    }

    pub fn get(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        self.appointments
            .get_appointment(id)?
            .ok_or(ServiceError::NotFound {
                entity: "appointment",
                id,
            })
    }

    pub fn list(&self, query: &AppointmentListQuery) -> ServiceResult<Vec<Appointment>> {
        Ok(self.appointments.list_appointments(query)?)
    }

    pub fn confirm(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        self.transition(id, AppointmentStatus::Confirmed)
    }

    pub fn check_in(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        self.transition(id, AppointmentStatus::CheckedIn)
    }

    pub fn complete(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        self.transition(id, AppointmentStatus::Completed)
    }

    /// Cancels an open appointment at least 24 hours before it starts.
    pub fn cancel(
        &self,
        id: AppointmentId,
        reason: Option<&str>,
        now: NaiveDateTime,
    ) -> ServiceResult<Appointment> {
        let mut appointment = self.get(id)?;
        ensure_transition(appointment.status, AppointmentStatus::Cancelled)?;
        if !cancellation_allowed(appointment.starts_at(), now) {
            warn!(
                "event=appointment_cancel module=appointment status=rejected appointment_id={id} error_code=cancellation_window"
            );
            return Err(ServiceError::CancellationWindow {
                starts_at: appointment.starts_at(),
            });
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.cancelled_reason = normalize_optional_text(reason);
        self.appointments.update_appointment(&appointment)?;
        info!("event=appointment_cancel module=appointment status=ok appointment_id={id}");
        Ok(appointment)
    }

    /// Moves an open appointment to another slot, re-running slot checks.
    pub fn reschedule(
        &self,
        id: AppointmentId,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> ServiceResult<Appointment> {
        let mut appointment = self.get(id)?;
        if !appointment.status.is_open() {
            return Err(ServiceError::InvalidTransition {
                entity: "appointment",
                from: appointment.status.as_str(),
                to: "rescheduled",
            });
        }
        self.ensure_bookable(appointment.patient_id, date, time, now, Some(id))?;

        appointment.date = date;
        appointment.time = time;
        self.appointments.update_appointment(&appointment)?;
        info!(
            "event=appointment_reschedule module=appointment status=ok appointment_id={id} date={date} slot={}",
            time.format("%H:%M")
        );
        Ok(appointment)
    }

    fn transition(&self, id: AppointmentId, next: AppointmentStatus) -> ServiceResult<Appointment> {
        let mut appointment = self.get(id)?;
        ensure_transition(appointment.status, next)?;
        appointment.status = next;
        self.appointments.update_appointment(&appointment)?;
        info!(
            "event=appointment_status module=appointment status=ok appointment_id={id} new_status={}",
            next.as_str()
        );
        Ok(appointment)
    }

    fn ensure_doctor(&self, doctor_id: UserId) -> ServiceResult<()> {
        let doctor = self.users.get_user(doctor_id)?.ok_or(ServiceError::NotFound {
            entity: "doctor",
            id: doctor_id,
        })?;
        if !doctor.is_active || !doctor.has_role(Role::Doctor) {
            return Err(ServiceError::RoleRequired {
                user_id: doctor_id,
                role: Role::Doctor,
            });
        }
        Ok(())
    }

    fn ensure_bookable(
        &self,
        patient_id: PatientId,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
        exclude: Option<AppointmentId>,
    ) -> ServiceResult<()> {
        let unavailable = |reason| ServiceError::SlotUnavailable { date, time, reason };

        if !is_slot_time(time) {
            return Err(unavailable("not a bookable slot"));
        }
        if date.and_time(time) <= now {
            return Err(unavailable("slot is in the past"));
        }
        if self.appointments.count_occupying(date, time, exclude)? >= SLOT_CAPACITY {
            return Err(unavailable("slot is fully booked"));
        }
        if self
            .appointments
            .patient_has_booking(patient_id, date, time, exclude)?
        {
            return Err(ServiceError::Conflict(format!(
                "patient {patient_id} already has a booking at {date} {}",
                time.format("%H:%M")
            )));
        }
        Ok(())
    }
}

/// True when `now` is at least the notice period before `starts_at`.
pub fn cancellation_allowed(starts_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    starts_at - now >= Duration::hours(CANCELLATION_NOTICE_HOURS)
}

fn ensure_transition(from: AppointmentStatus, to: AppointmentStatus) -> ServiceResult<()> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    Err(ServiceError::InvalidTransition {
        entity: "appointment",
        from: from.as_str(),
        to: to.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::cancellation_allowed;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn cancellation_boundary_is_exactly_24_hours() {
        let starts_at = NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert!(cancellation_allowed(starts_at, starts_at - Duration::hours(24)));
        assert!(!cancellation_allowed(
            starts_at,
            starts_at - Duration::hours(24) + Duration::minutes(1)
        ));
        assert!(!cancellation_allowed(starts_at, starts_at + Duration::hours(1)));
    }
}
