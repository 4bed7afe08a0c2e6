//! Diagnosis, service order and prescription persistence.
//!
//! # Invariants
//! - A prescription and all its stock decrements commit together. If any
//!   line finds too little stock the whole prescription is rolled back.

use super::{enum_column, ensure_connection_ready, opt_id, optional_uuid_column, uuid_column};
use super::{RepoError, RepoResult};
use crate::model::appointment::AppointmentId;
use crate::model::clinical::{
    Diagnosis, DiagnosisId, Prescription, PrescriptionId, PrescriptionLine, ServiceOrder,
    ServiceOrderId, ServiceOrderStatus,
};
use crate::model::patient::MedicalRecordId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const DIAGNOSIS_SELECT_SQL: &str = "SELECT
    id,
    appointment_id,
    medical_record_id,
    doctor_id,
    symptoms,
    conclusion,
    notes,
    created_at
FROM diagnoses";

const SERVICE_ORDER_SELECT_SQL: &str = "SELECT
    id,
    appointment_id,
    service_name,
    price,
    technician_id,
    status,
    result,
    created_at
FROM service_orders";

pub trait ClinicalRepository {
    fn create_diagnosis(&self, diagnosis: &Diagnosis) -> RepoResult<DiagnosisId>;
    fn list_diagnoses_for_record(&self, record_id: MedicalRecordId) -> RepoResult<Vec<Diagnosis>>;

    fn create_service_order(&self, order: &ServiceOrder) -> RepoResult<ServiceOrderId>;
    fn update_service_order(&self, order: &ServiceOrder) -> RepoResult<()>;
    fn get_service_order(&self, id: ServiceOrderId) -> RepoResult<Option<ServiceOrder>>;
    fn list_service_orders(&self, appointment_id: AppointmentId) -> RepoResult<Vec<ServiceOrder>>;

    /// Inserts the prescription and dispenses every line from stock.
    fn create_prescription(&self, prescription: &Prescription) -> RepoResult<PrescriptionId>;
    fn get_prescription(&self, id: PrescriptionId) -> RepoResult<Option<Prescription>>;
    fn list_prescriptions(&self, appointment_id: AppointmentId) -> RepoResult<Vec<Prescription>>;
}

pub struct SqliteClinicalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteClinicalRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ClinicalRepository for SqliteClinicalRepository<'_> {
    fn create_diagnosis(&self, diagnosis: &Diagnosis) -> RepoResult<DiagnosisId> {
        diagnosis.validate()?;
        self.conn.execute(
            "INSERT INTO diagnoses (
                id, appointment_id, medical_record_id, doctor_id,
                symptoms, conclusion, notes, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                diagnosis.id.to_string(),
                diagnosis.appointment_id.to_string(),
                diagnosis.medical_record_id.to_string(),
                diagnosis.doctor_id.to_string(),
                diagnosis.symptoms.as_str(),
                diagnosis.conclusion.as_str(),
                diagnosis.notes.as_deref(),
                diagnosis.created_at,
            ],
        )?;
        Ok(diagnosis.id)
    }

    fn list_diagnoses_for_record(&self, record_id: MedicalRecordId) -> RepoResult<Vec<Diagnosis>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DIAGNOSIS_SELECT_SQL}
             WHERE medical_record_id = ?1
             ORDER BY created_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([record_id.to_string()])?;
        let mut diagnoses = Vec::new();
        while let Some(row) = rows.next()? {
            diagnoses.push(parse_diagnosis_row(row)?);
        }
        Ok(diagnoses)
    }

    fn create_service_order(&self, order: &ServiceOrder) -> RepoResult<ServiceOrderId> {
        order.validate()?;
        self.conn.execute(
            "INSERT INTO service_orders (
                id, appointment_id, service_name, price, technician_id, status, result, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                order.id.to_string(),
                order.appointment_id.to_string(),
                order.service_name.as_str(),
                order.price,
                opt_id(order.technician_id),
                order.status.as_str(),
                order.result.as_deref(),
                order.created_at,
            ],
        )?;
        Ok(order.id)
    }

    fn update_service_order(&self, order: &ServiceOrder) -> RepoResult<()> {
        order.validate()?;
        let changed = self.conn.execute(
            "UPDATE service_orders
             SET service_name = ?2, price = ?3, technician_id = ?4, status = ?5, result = ?6
             WHERE id = ?1;",
            params![
                order.id.to_string(),
                order.service_name.as_str(),
                order.price,
                opt_id(order.technician_id),
                order.status.as_str(),
                order.result.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "service order",
                id: order.id,
            });
        }
        Ok(())
    }

    fn get_service_order(&self, id: ServiceOrderId) -> RepoResult<Option<ServiceOrder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SERVICE_ORDER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_service_order_row(row)?));
        }
        Ok(None)
    }

    fn list_service_orders(&self, appointment_id: AppointmentId) -> RepoResult<Vec<ServiceOrder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SERVICE_ORDER_SELECT_SQL}
             WHERE appointment_id = ?1
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([appointment_id.to_string()])?;
        let mut orders = Vec::new();
        while let Some(row) = rows.next()? {
            orders.push(parse_service_order_row(row)?);
        }
        Ok(orders)
    }

    fn create_prescription(&self, prescription: &Prescription) -> RepoResult<PrescriptionId> {
        prescription.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO prescriptions (id, appointment_id, doctor_id, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                prescription.id.to_string(),
                prescription.appointment_id.to_string(),
                prescription.doctor_id.to_string(),
                prescription.notes.as_deref(),
                prescription.created_at,
            ],
        )?;

        for (line_no, line) in prescription.lines.iter().enumerate() {
            let medicine_id = line.medicine_id.to_string();
            let available: Option<i64> = tx
                .query_row(
                    "SELECT stock FROM medicines WHERE id = ?1 AND is_active = 1;",
                    [medicine_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(available) = available else {
                return Err(RepoError::NotFound {
                    entity: "medicine",
                    id: line.medicine_id,
                });
            };
            if available < line.quantity {
                return Err(RepoError::InsufficientStock {
                    medicine_id: line.medicine_id,
                    requested: line.quantity,
                    available,
                });
            }

            tx.execute(
                "UPDATE medicines SET stock = stock - ?2 WHERE id = ?1;",
                params![medicine_id.as_str(), line.quantity],
            )?;
            tx.execute(
                "INSERT INTO prescription_details (
                    prescription_id, line_no, medicine_id, quantity, dosage, unit_price
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    prescription.id.to_string(),
                    line_no as i64,
                    medicine_id.as_str(),
                    line.quantity,
                    line.dosage.as_str(),
                    line.unit_price,
                ],
            )?;
        }
        tx.commit()?;

        Ok(prescription.id)
    }

    fn get_prescription(&self, id: PrescriptionId) -> RepoResult<Option<Prescription>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, appointment_id, doctor_id, notes, created_at
             FROM prescriptions
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_prescription_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_prescriptions(&self, appointment_id: AppointmentId) -> RepoResult<Vec<Prescription>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, appointment_id, doctor_id, notes, created_at
             FROM prescriptions
             WHERE appointment_id = ?1
             ORDER BY created_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query([appointment_id.to_string()])?;
        let mut prescriptions = Vec::new();
        while let Some(row) = rows.next()? {
            prescriptions.push(parse_prescription_row(self.conn, row)?);
        }
        Ok(prescriptions)
    }
}

fn parse_diagnosis_row(row: &Row<'_>) -> RepoResult<Diagnosis> {
    Ok(Diagnosis {
        id: uuid_column(row, "id")?,
        appointment_id: uuid_column(row, "appointment_id")?,
        medical_record_id: uuid_column(row, "medical_record_id")?,
        doctor_id: uuid_column(row, "doctor_id")?,
        symptoms: row.get("symptoms")?,
        conclusion: row.get("conclusion")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_service_order_row(row: &Row<'_>) -> RepoResult<ServiceOrder> {
    Ok(ServiceOrder {
        id: uuid_column(row, "id")?,
        appointment_id: uuid_column(row, "appointment_id")?,
        service_name: row.get("service_name")?,
        price: row.get("price")?,
        technician_id: optional_uuid_column(row, "technician_id")?,
        status: enum_column(row, "status", ServiceOrderStatus::parse)?,
        result: row.get("result")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_prescription_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Prescription> {
    let id = uuid_column(row, "id")?;
    Ok(Prescription {
        id,
        appointment_id: uuid_column(row, "appointment_id")?,
        doctor_id: uuid_column(row, "doctor_id")?,
        notes: row.get("notes")?,
        lines: load_prescription_lines(conn, &id.to_string())?,
        created_at: row.get("created_at")?,
    })
}

fn load_prescription_lines(conn: &Connection, prescription_id: &str) -> RepoResult<Vec<PrescriptionLine>> {
    let mut stmt = conn.prepare(
        "SELECT medicine_id, quantity, dosage, unit_price
         FROM prescription_details
         WHERE prescription_id = ?1
         ORDER BY line_no ASC;",
    )?;
    let mut rows = stmt.query([prescription_id])?;
    let mut lines = Vec::new();
    while let Some(row) = rows.next()? {
        lines.push(PrescriptionLine {
            medicine_id: uuid_column(row, "medicine_id")?,
            quantity: row.get("quantity")?,
            dosage: row.get("dosage")?,
            unit_price: row.get("unit_price")?,
        });
    }
    Ok(lines)
}
