//! Patient registration and medical record lookups.
//!
//! # Invariants
//! - Phone and email are normalized before the uniqueness check.
//! - Registration creates the medical record atomically.

use super::error::{ServiceError, ServiceResult};
use crate::model::clinical::Diagnosis;
use crate::model::patient::{Gender, MedicalRecord, Patient, PatientId};
use crate::model::user::UserId;
use crate::model::validation::{normalize_email, normalize_optional_text, normalize_phone};
use crate::repo::clinical_repo::ClinicalRepository;
use crate::repo::patient_repo::{PatientListQuery, PatientRepository};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatientInput {
    pub user_id: Option<UserId>,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MedicalRecordInput {
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub notes: Option<String>,
}

/// Medical record with its diagnosis history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedicalHistory {
    pub record: MedicalRecord,
    pub diagnoses: Vec<Diagnosis>,
}

pub struct PatientService<P: PatientRepository, C: ClinicalRepository> {
    patients: P,
    clinical: C,
}

impl<P: PatientRepository, C: ClinicalRepository> PatientService<P, C> {
    pub fn new(patients: P, clinical: C) -> Self {
        Self { patients, clinical }
    }

    pub fn register(&self, input: &PatientInput, now: NaiveDateTime) -> ServiceResult<Patient> {
        let patient = build_patient(Uuid::new_v4(), input, now);
        self.validate(&patient, now)?;

        let record = MedicalRecord::empty_for(patient.id);
        self.patients.create_patient(&patient, &record)?;
        info!(
            "event=patient_register module=patient status=ok patient_id={}",
            patient.id
        );
        Ok(patient)
    }

    pub fn update(
        &self,
        id: PatientId,
        input: &PatientInput,
        now: NaiveDateTime,
    ) -> ServiceResult<Patient> {
        let existing = self.get(id)?;
        let patient = build_patient(id, input, existing.created_at);
        self.validate(&patient, now)?;
        self.patients.update_patient(&patient)?;
        Ok(patient)
    }

    pub fn get(&self, id: PatientId) -> ServiceResult<Patient> {
        self.patients
            .get_patient(id)?
            .ok_or(ServiceError::NotFound {
                entity: "patient",
                id,
            })
    }

    pub fn list(&self, query: &PatientListQuery) -> ServiceResult<Vec<Patient>> {
        Ok(self.patients.list_patients(query)?)
    }

    pub fn medical_history(&self, patient_id: PatientId) -> ServiceResult<MedicalHistory> {
        let record = self.record_of(patient_id)?;
        let diagnoses = self.clinical.list_diagnoses_for_record(record.id)?;
        Ok(MedicalHistory { record, diagnoses })
    }

    pub fn update_medical_record(
        &self,
        patient_id: PatientId,
        input: &MedicalRecordInput,
    ) -> ServiceResult<MedicalRecord> {
        let mut record = self.record_of(patient_id)?;
        record.blood_type = normalize_optional_text(input.blood_type.as_deref());
        record.allergies = normalize_optional_text(input.allergies.as_deref());
        record.notes = normalize_optional_text(input.notes.as_deref());
        self.patients.update_medical_record(&record)?;
        Ok(record)
    }

    fn record_of(&self, patient_id: PatientId) -> ServiceResult<MedicalRecord> {
        self.patients
            .get_medical_record(patient_id)?
            .ok_or(ServiceError::NotFound {
                entity: "patient",
                id: patient_id,
            })
    }

    fn validate(&self, patient: &Patient, now: NaiveDateTime) -> ServiceResult<()> {
        patient.validate()?;
        patient.validate_birth_date(now.date())?;
        if self
            .patients
            .contact_taken(&patient.phone, patient.email.as_deref(), Some(patient.id))?
        {
            return Err(ServiceError::Conflict(
                "phone or email is already registered to another patient".to_string(),
            ));
        }
        Ok(())
    }
}

fn build_patient(id: PatientId, input: &PatientInput, created_at: NaiveDateTime) -> Patient {
    Patient {
        id,
        user_id: input.user_id,
        full_name: input.full_name.trim().to_string(),
        date_of_birth: input.date_of_birth,
        gender: input.gender,
        phone: normalize_phone(input.phone.trim()),
        email: normalize_email(input.email.as_deref()),
        address: normalize_optional_text(input.address.as_deref()),
        created_at,
    }
}
