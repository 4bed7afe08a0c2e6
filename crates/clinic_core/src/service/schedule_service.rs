//! Doctor working-schedule rules.
//!
//! # Invariants
//! - Only active users holding `Role::Doctor` get schedules.
//! - A doctor's schedules on one day never overlap (half-open intervals).

use super::availability::slot_time_format;
use super::error::{ServiceError, ServiceResult};
use crate::model::schedule::{ScheduleId, StaffSchedule};
use crate::model::user::{Role, UserId};
use crate::model::validation::normalize_optional_text;
use crate::repo::schedule_repo::ScheduleRepository;
use crate::repo::user_repo::UserRepository;
use chrono::{NaiveDate, NaiveTime};
use log::info;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleInput {
    pub staff_id: UserId,
    pub work_date: NaiveDate,
    #[serde(with = "slot_time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "slot_time_format")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub note: Option<String>,
}

pub struct ScheduleService<S: ScheduleRepository, U: UserRepository> {
    schedules: S,
    users: U,
}

impl<S: ScheduleRepository, U: UserRepository> ScheduleService<S, U> {
    pub fn new(schedules: S, users: U) -> Self {
        Self { schedules, users }
    }

    pub fn create(&self, input: &ScheduleInput) -> ServiceResult<StaffSchedule> {
        let schedule = build_schedule(Uuid::new_v4(), input);
        self.validate(&schedule)?;
        self.schedules.create_schedule(&schedule)?;
        info!(
            "event=schedule_create module=schedule status=ok schedule_id={} staff_id={} date={}",
            schedule.id, schedule.staff_id, schedule.work_date
        );
        Ok(schedule)
    }

    pub fn update(&self, id: ScheduleId, input: &ScheduleInput) -> ServiceResult<StaffSchedule> {
        if self.schedules.get_schedule(id)?.is_none() {
            return Err(ServiceError::NotFound {
                entity: "schedule",
                id,
            });
        }
        let schedule = build_schedule(id, input);
        self.validate(&schedule)?;
        self.schedules.update_schedule(&schedule)?;
        info!("event=schedule_update module=schedule status=ok schedule_id={id}");
        Ok(schedule)
    }

    pub fn delete(&self, id: ScheduleId) -> ServiceResult<()> {
        self.schedules.delete_schedule(id)?;
        Ok(())
    }

    pub fn list(
        &self,
        staff_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<Vec<StaffSchedule>> {
        Ok(self.schedules.list_for_staff(staff_id, from, to)?)
    }

    /// Doctor role, interval order and same-day overlap, in that order.
    fn validate(&self, schedule: &StaffSchedule) -> ServiceResult<()> {
        let staff = self
            .users
            .get_user(schedule.staff_id)?
            .ok_or(ServiceError::NotFound {
                entity: "staff",
                id: schedule.staff_id,
            })?;
        if !staff.is_active || !staff.has_role(Role::Doctor) {
            return Err(ServiceError::RoleRequired {
                user_id: staff.id,
                role: Role::Doctor,
            });
        }

        schedule.validate()?;

        let same_day =
            self.schedules
                .list_for_staff(schedule.staff_id, schedule.work_date, schedule.work_date)?;
        if let Some(existing) = find_overlap(schedule, &same_day) {
            return Err(ServiceError::ScheduleOverlap {
                existing: existing.id,
            });
        }
        Ok(())
    }
}

/// First schedule in `existing` overlapping `candidate`, ignoring itself.
pub fn find_overlap<'a>(
    candidate: &StaffSchedule,
    existing: &'a [StaffSchedule],
) -> Option<&'a StaffSchedule> {
    existing
        .iter()
        .filter(|other| other.id != candidate.id)
        .find(|other| candidate.overlaps(other))
}

fn build_schedule(id: ScheduleId, input: &ScheduleInput) -> StaffSchedule {
    StaffSchedule {
        id,
        staff_id: input.staff_id,
        work_date: input.work_date,
        start_time: input.start_time,
        end_time: input.end_time,
        room: normalize_optional_text(input.room.as_deref()),
        note: normalize_optional_text(input.note.as_deref()),
    }
}
