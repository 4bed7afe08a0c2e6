//! Patient registration and the per-patient medical record.
//!
//! # Invariants
//! - `phone` is required and unique across patients.
//! - Each patient owns exactly one `MedicalRecord`.

use super::user::UserId;
use super::validation::{require_email, require_phone, require_text, ValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PatientId = Uuid;
pub type MedicalRecordId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    /// Portal account, when the patient self-registered.
    pub user_id: Option<UserId>,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Patient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("full_name", &self.full_name)?;
        require_phone("phone", &self.phone)?;
        if let Some(email) = &self.email {
            require_email("email", email)?;
        }
        Ok(())
    }

    /// Rejects birth dates after `today`.
    pub fn validate_birth_date(&self, today: NaiveDate) -> Result<(), ValidationError> {
        match self.date_of_birth {
            Some(dob) if dob > today => Err(ValidationError::OutOfRange {
                field: "date_of_birth",
                message: format!("must not be in the future, got {dob}"),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: MedicalRecordId,
    pub patient_id: PatientId,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub notes: Option<String>,
}

impl MedicalRecord {
    /// Empty record for a freshly registered patient.
    pub fn empty_for(patient_id: PatientId) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            blood_type: None,
            allergies: None,
            notes: None,
        }
    }
}
