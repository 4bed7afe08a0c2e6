//! Patient and medical record persistence.
//!
//! # Invariants
//! - A patient row and its medical record are inserted in one transaction.

use super::{
    enum_column, ensure_connection_ready, opt_id, optional_uuid_column, uuid_column, RepoError,
    RepoResult,
};
use crate::model::patient::{Gender, MedicalRecord, Patient, PatientId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PATIENT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    full_name,
    date_of_birth,
    gender,
    phone,
    email,
    address,
    created_at
FROM patients";

const PATIENT_LIMIT_DEFAULT: u32 = 20;
const PATIENT_LIMIT_MAX: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct PatientListQuery {
    /// Case-insensitive substring match on name, or prefix match on phone.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait PatientRepository {
    fn create_patient(&self, patient: &Patient, record: &MedicalRecord) -> RepoResult<PatientId>;
    fn update_patient(&self, patient: &Patient) -> RepoResult<()>;
    fn get_patient(&self, id: PatientId) -> RepoResult<Option<Patient>>;
    fn list_patients(&self, query: &PatientListQuery) -> RepoResult<Vec<Patient>>;
    /// True when `phone` or `email` belongs to a different patient.
    fn contact_taken(
        &self,
        phone: &str,
        email: Option<&str>,
        exclude: Option<PatientId>,
    ) -> RepoResult<bool>;
    fn get_medical_record(&self, patient_id: PatientId) -> RepoResult<Option<MedicalRecord>>;
    fn update_medical_record(&self, record: &MedicalRecord) -> RepoResult<()>;
}

pub struct SqlitePatientRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePatientRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PatientRepository for SqlitePatientRepository<'_> {
    fn create_patient(&self, patient: &Patient, record: &MedicalRecord) -> RepoResult<PatientId> {
        patient.validate()?;
        if record.patient_id != patient.id {
            return Err(RepoError::InvalidData(
                "medical record must reference the patient being created".to_string(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO patients (
                id, user_id, full_name, date_of_birth, gender, phone, email, address, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                patient.id.to_string(),
                opt_id(patient.user_id),
                patient.full_name.as_str(),
                patient.date_of_birth,
                patient.gender.as_str(),
                patient.phone.as_str(),
                patient.email.as_deref(),
                patient.address.as_deref(),
                patient.created_at,
            ],
        )?;
        tx.execute(
            "INSERT INTO medical_records (id, patient_id, blood_type, allergies, notes)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                record.id.to_string(),
                record.patient_id.to_string(),
                record.blood_type.as_deref(),
                record.allergies.as_deref(),
                record.notes.as_deref(),
            ],
        )?;
        tx.commit()?;

        Ok(patient.id)
    }

    fn update_patient(&self, patient: &Patient) -> RepoResult<()> {
        patient.validate()?;

        let changed = self.conn.execute(
            "UPDATE patients
             SET user_id = ?2, full_name = ?3, date_of_birth = ?4, gender = ?5,
                 phone = ?6, email = ?7, address = ?8
             WHERE id = ?1;",
            params![
                patient.id.to_string(),
                opt_id(patient.user_id),
                patient.full_name.as_str(),
                patient.date_of_birth,
                patient.gender.as_str(),
                patient.phone.as_str(),
                patient.email.as_deref(),
                patient.address.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "patient",
                id: patient.id,
            });
        }
        Ok(())
    }

    fn get_patient(&self, id: PatientId) -> RepoResult<Option<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PATIENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_patient_row(row)?));
        }
        Ok(None)
    }

    fn list_patients(&self, query: &PatientListQuery) -> RepoResult<Vec<Patient>> {
        let mut sql = format!("{PATIENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(" AND (full_name LIKE ? COLLATE NOCASE OR phone LIKE ?)");
            bind_values.push(Value::Text(format!("%{search}%")));
            bind_values.push(Value::Text(format!("{search}%")));
        }

        sql.push_str(" ORDER BY full_name ASC, id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_patient_limit(query.limit))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut patients = Vec::new();
        while let Some(row) = rows.next()? {
            patients.push(parse_patient_row(row)?);
        }
        Ok(patients)
    }

    fn contact_taken(
        &self,
        phone: &str,
        email: Option<&str>,
        exclude: Option<PatientId>,
    ) -> RepoResult<bool> {
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM patients
                WHERE (phone = ?1 OR (?2 IS NOT NULL AND email = ?2))
                  AND (?3 IS NULL OR id <> ?3)
            );",
            params![phone, email, opt_id(exclude)],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    fn get_medical_record(&self, patient_id: PatientId) -> RepoResult<Option<MedicalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, patient_id, blood_type, allergies, notes
             FROM medical_records
             WHERE patient_id = ?1;",
        )?;
        let mut rows = stmt.query([patient_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(MedicalRecord {
                id: uuid_column(row, "id")?,
                patient_id: uuid_column(row, "patient_id")?,
                blood_type: row.get("blood_type")?,
                allergies: row.get("allergies")?,
                notes: row.get("notes")?,
            }));
        }
        Ok(None)
    }

    fn update_medical_record(&self, record: &MedicalRecord) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE medical_records
             SET blood_type = ?2, allergies = ?3, notes = ?4
             WHERE id = ?1;",
            params![
                record.id.to_string(),
                record.blood_type.as_deref(),
                record.allergies.as_deref(),
                record.notes.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "medical record",
                id: record.id,
            });
        }
        Ok(())
    }
}

/// Applies default and upper bound to patient list page size.
pub fn normalize_patient_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(PATIENT_LIMIT_DEFAULT)
        .clamp(1, PATIENT_LIMIT_MAX)
}

fn parse_patient_row(row: &Row<'_>) -> RepoResult<Patient> {
    Ok(Patient {
        id: uuid_column(row, "id")?,
        user_id: optional_uuid_column(row, "user_id")?,
        full_name: row.get("full_name")?,
        date_of_birth: row.get("date_of_birth")?,
        gender: enum_column(row, "gender", Gender::parse)?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}
