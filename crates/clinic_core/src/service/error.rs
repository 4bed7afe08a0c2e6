//! Service-level error shared by all use-cases.

use crate::model::user::Role;
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use crate::status::StatusResponse;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    NotFound { entity: &'static str, id: Uuid },
    /// Unique value already used by another record.
    Conflict(String),
    /// Slot is full, unknown, or already in the past.
    SlotUnavailable {
        date: NaiveDate,
        time: NaiveTime,
        reason: &'static str,
    },
    /// Cancellation attempted less than the minimum notice before start.
    CancellationWindow { starts_at: NaiveDateTime },
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
    InsufficientStock {
        medicine_id: Uuid,
        requested: i64,
        available: i64,
    },
    RoleRequired { user_id: Uuid, role: Role },
    ScheduleOverlap { existing: Uuid },
    Unauthorized(String),
    RateLimited { retry_after_secs: i64 },
    /// Outbound channel refused a message.
    DeliveryFailed(String),
    Repo(RepoError),
}

impl ServiceError {
    /// Outcome code used by controllers and the response envelope.
    pub fn status(&self) -> StatusResponse {
        match self {
            Self::NotFound { .. } => StatusResponse::NotFound,
            Self::Unauthorized(_) => StatusResponse::Unauthorized,
            Self::Repo(_) | Self::DeliveryFailed(_) => StatusResponse::Error,
            _ => StatusResponse::BadRequest,
        }
    }

    /// Stable machine-readable code for log lines.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::SlotUnavailable { .. } => "slot_unavailable",
            Self::CancellationWindow { .. } => "cancellation_window",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::RoleRequired { .. } => "role_required",
            Self::ScheduleOverlap { .. } => "schedule_overlap",
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::DeliveryFailed(_) => "delivery_failed",
            Self::Repo(_) => "repository_failure",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::SlotUnavailable { date, time, reason } => write!(
                f,
                "slot {date} {} is unavailable: {reason}",
                time.format("%H:%M")
            ),
            Self::CancellationWindow { starts_at } => write!(
                f,
                "appointment at {} can no longer be cancelled (less than 24 hours ahead)",
                starts_at.format("%Y-%m-%d %H:%M")
            ),
            Self::InvalidTransition { entity, from, to } => {
                write!(f, "{entity} cannot move from {from} to {to}")
            }
            Self::InsufficientStock {
                medicine_id,
                requested,
                available,
            } => write!(
                f,
                "insufficient stock for medicine {medicine_id}: requested {requested}, available {available}"
            ),
            Self::RoleRequired { user_id, role } => {
                write!(f, "user {user_id} must hold the {} role", role.as_str())
            }
            Self::ScheduleOverlap { existing } => {
                write!(f, "schedule overlaps existing schedule {existing}")
            }
            Self::Unauthorized(message) => write!(f, "{message}"),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "too many requests, retry after {retry_after_secs} seconds")
            }
            Self::DeliveryFailed(message) => write!(f, "delivery failed: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict(message) => Self::Conflict(message),
            RepoError::InsufficientStock {
                medicine_id,
                requested,
                available,
            } => Self::InsufficientStock {
                medicine_id,
                requested,
                available,
            },
            other => Self::Repo(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::repo::RepoError;
    use crate::status::StatusResponse;
    use uuid::Uuid;

    #[test]
    fn repo_not_found_maps_to_not_found_status() {
        let id = Uuid::new_v4();
        let err = ServiceError::from(RepoError::NotFound {
            entity: "patient",
            id,
        });
        assert_eq!(err.status(), StatusResponse::NotFound);
        assert_eq!(err.to_string(), format!("patient not found: {id}"));
    }

    #[test]
    fn storage_failures_map_to_error_status() {
        let err = ServiceError::from(RepoError::InvalidData("bad".to_string()));
        assert_eq!(err.status(), StatusResponse::Error);
        assert_eq!(err.error_code(), "repository_failure");
    }
}
