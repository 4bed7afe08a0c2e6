//! Diagnoses, service orders and prescriptions attached to an appointment.

use super::appointment::AppointmentId;
use super::inventory::MedicineId;
use super::patient::MedicalRecordId;
use super::user::UserId;
use super::validation::{require_amount, require_quantity, require_text, ValidationError};
use super::Money;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DiagnosisId = Uuid;
pub type ServiceOrderId = Uuid;
pub type PrescriptionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: DiagnosisId,
    pub appointment_id: AppointmentId,
    pub medical_record_id: MedicalRecordId,
    pub doctor_id: UserId,
    pub symptoms: String,
    pub conclusion: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Diagnosis {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("symptoms", &self.symptoms)?;
        require_text("conclusion", &self.conclusion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOrderStatus {
    Ordered,
    InProgress,
    Completed,
    Cancelled,
}

impl ServiceOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ordered" => Some(Self::Ordered),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Ordered, Self::InProgress)
                | (Self::Ordered | Self::InProgress, Self::Completed)
                | (Self::Ordered | Self::InProgress, Self::Cancelled)
        )
    }
}

/// Lab or technical service requested during a visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: ServiceOrderId,
    pub appointment_id: AppointmentId,
    pub service_name: String,
    pub price: Money,
    pub technician_id: Option<UserId>,
    pub status: ServiceOrderStatus,
    pub result: Option<String>,
    pub created_at: NaiveDateTime,
}

impl ServiceOrder {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("service_name", &self.service_name)?;
        require_amount("price", self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub medicine_id: MedicineId,
    pub quantity: i64,
    pub dosage: String,
    /// Medicine price captured when the prescription was issued.
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub appointment_id: AppointmentId,
    pub doctor_id: UserId,
    pub notes: Option<String>,
    pub lines: Vec<PrescriptionLine>,
    pub created_at: NaiveDateTime,
}

impl Prescription {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lines.is_empty() {
            return Err(ValidationError::Empty("lines"));
        }
        for line in &self.lines {
            require_quantity("quantity", line.quantity)?;
            require_text("dosage", &line.dosage)?;
            require_amount("unit_price", line.unit_price)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceOrderStatus::*;

    #[test]
    fn completed_service_order_cannot_be_cancelled() {
        assert!(Ordered.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InProgress));
    }
}
