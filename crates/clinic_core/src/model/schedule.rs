//! Doctor working-hours intervals.
//!
//! # Invariants
//! - `start_time < end_time`.
//! - Intervals are half-open: `[start_time, end_time)`. Two schedules that
//!   only touch at a boundary do not overlap.

use super::user::UserId;
use super::validation::ValidationError;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ScheduleId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSchedule {
    pub id: ScheduleId,
    pub staff_id: UserId,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub note: Option<String>,
}

impl StaffSchedule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_time >= self.end_time {
            return Err(ValidationError::OutOfRange {
                field: "start_time",
                message: format!(
                    "must be before end_time ({} >= {})",
                    self.start_time.format("%H:%M"),
                    self.end_time.format("%H:%M")
                ),
            });
        }
        Ok(())
    }

    /// Same staff, same day and intersecting half-open intervals.
    pub fn overlaps(&self, other: &StaffSchedule) -> bool {
        self.staff_id == other.staff_id
            && self.work_date == other.work_date
            && intervals_overlap(
                (self.start_time, self.end_time),
                (other.start_time, other.end_time),
            )
    }
}

/// Half-open interval intersection test.
pub fn intervals_overlap(a: (NaiveTime, NaiveTime), b: (NaiveTime, NaiveTime)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

#[cfg(test)]
mod tests {
    use super::intervals_overlap;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!intervals_overlap((t(7, 0), t(11, 0)), (t(11, 0), t(13, 0))));
        assert!(!intervals_overlap((t(11, 0), t(13, 0)), (t(7, 0), t(11, 0))));
    }

    #[test]
    fn nested_and_partial_intervals_overlap() {
        assert!(intervals_overlap((t(7, 0), t(11, 0)), (t(8, 0), t(9, 0))));
        assert!(intervals_overlap((t(7, 0), t(11, 0)), (t(10, 30), t(12, 0))));
        assert!(intervals_overlap((t(9, 0), t(10, 0)), (t(9, 0), t(10, 0))));
    }
}
