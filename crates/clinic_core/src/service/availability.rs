//! Fixed half-hour booking slots and per-slot capacity.
//!
//! # Invariants
//! - Slot start times run 07:00..=11:00 and 13:00..=16:30 every 30 minutes.
//! - A slot holds at most `SLOT_CAPACITY` slot-occupying appointments.
//! - For the current day, slots starting at or before `now` are dropped.

use crate::model::appointment::Appointment;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub const SLOT_CAPACITY: u32 = 10;
pub const SLOT_MINUTES: i64 = 30;

/// Booking sessions as `(first slot start, last slot start)` in `(h, m)`.
const SESSIONS: [((u32, u32), (u32, u32)); 2] = [((7, 0), (11, 0)), ((13, 0), (16, 30))];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    #[serde(with = "slot_time_format")]
    pub time: NaiveTime,
    pub booked: u32,
    pub capacity: u32,
    pub available: bool,
}

/// All slot start times of a day, ascending.
pub fn slot_times() -> Vec<NaiveTime> {
    let step = Duration::minutes(SLOT_MINUTES);
    let mut slots = Vec::new();
    for ((first_h, first_m), (last_h, last_m)) in SESSIONS {
        let (Some(mut current), Some(last)) = (
            NaiveTime::from_hms_opt(first_h, first_m, 0),
            NaiveTime::from_hms_opt(last_h, last_m, 0),
        ) else {
            continue;
        };
        while current <= last {
            slots.push(current);
            current += step;
        }
    }
    slots
}

pub fn is_slot_time(time: NaiveTime) -> bool {
    slot_times().contains(&time)
}

/// Per-slot availability of `date` as seen at `now`.
///
/// `appointments` may contain any status and any date; only slot-occupying
/// appointments on `date` are counted.
pub fn compute_availability(
    date: NaiveDate,
    now: NaiveDateTime,
    appointments: &[Appointment],
) -> Vec<SlotAvailability> {
    if date < now.date() {
        return Vec::new();
    }
    let is_today = date == now.date();

    slot_times()
        .into_iter()
        .filter(|slot| !is_today || *slot > now.time())
        .map(|slot| {
            let booked = appointments
                .iter()
                .filter(|a| a.date == date && a.time == slot && a.status.occupies_slot())
                .count() as u32;
            SlotAvailability {
                time: slot,
                booked,
                capacity: SLOT_CAPACITY,
                available: booked < SLOT_CAPACITY,
            }
        })
        .collect()
}

/// Serializes slot times as `HH:MM`, accepting `HH:MM` or `HH:MM:SS`.
pub mod slot_time_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&text, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
