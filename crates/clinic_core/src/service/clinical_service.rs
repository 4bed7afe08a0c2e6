//! Diagnoses, service orders and prescriptions for a visit.
//!
//! # Invariants
//! - Diagnoses are written only for checked-in or completed appointments.
//! - Clinical actions need a non-cancelled appointment.
//! - Prescription lines capture the medicine price at issue time.

use super::error::{ServiceError, ServiceResult};
use crate::model::appointment::{Appointment, AppointmentId, AppointmentStatus};
use crate::model::clinical::{
    Diagnosis, Prescription, PrescriptionId, PrescriptionLine, ServiceOrder, ServiceOrderId,
    ServiceOrderStatus,
};
use crate::model::inventory::MedicineId;
use crate::model::user::{Role, UserId};
use crate::model::validation::{normalize_optional_text, ValidationError};
use crate::model::Money;
use crate::repo::appointment_repo::AppointmentRepository;
use crate::repo::clinical_repo::ClinicalRepository;
use crate::repo::inventory_repo::InventoryRepository;
use crate::repo::patient_repo::PatientRepository;
use crate::repo::user_repo::UserRepository;
use chrono::NaiveDateTime;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiagnosisRequest {
    pub appointment_id: AppointmentId,
    pub doctor_id: UserId,
    pub symptoms: String,
    pub conclusion: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceOrderRequest {
    pub appointment_id: AppointmentId,
    pub service_name: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrescriptionItemRequest {
    pub medicine_id: MedicineId,
    pub quantity: i64,
    pub dosage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrescriptionRequest {
    pub appointment_id: AppointmentId,
    pub doctor_id: UserId,
    pub notes: Option<String>,
    pub items: Vec<PrescriptionItemRequest>,
}

pub struct ClinicalService<C, A, P, U, I>
where
    C: ClinicalRepository,
    A: AppointmentRepository,
    P: PatientRepository,
    U: UserRepository,
    I: InventoryRepository,
{
    clinical: C,
    appointments: A,
    patients: P,
    users: U,
    inventory: I,
}

impl<C, A, P, U, I> ClinicalService<C, A, P, U, I>
where
    C: ClinicalRepository,
    A: AppointmentRepository,
    P: PatientRepository,
    U: UserRepository,
    I: InventoryRepository,
{
    pub fn new(clinical: C, appointments: A, patients: P, users: U, inventory: I) -> Self {
        Self {
            clinical,
            appointments,
            patients,
            users,
            inventory,
        }
    }

    pub fn create_diagnosis(
        &self,
        request: &DiagnosisRequest,
        now: NaiveDateTime,
    ) -> ServiceResult<Diagnosis> {
        let appointment = self.appointment(request.appointment_id)?;
        if !matches!(
            appointment.status,
            AppointmentStatus::CheckedIn | AppointmentStatus::Completed
        ) {
            return Err(ServiceError::InvalidTransition {
                entity: "appointment",
                from: appointment.status.as_str(),
                to: "diagnosed",
            });
        }
        self.ensure_role(request.doctor_id, Role::Doctor)?;
        let record = self
            .patients
            .get_medical_record(appointment.patient_id)?
            .ok_or(ServiceError::NotFound {
                entity: "medical record",
                id: appointment.patient_id,
            })?;

        let diagnosis = Diagnosis {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            medical_record_id: record.id,
            doctor_id: request.doctor_id,
            symptoms: request.symptoms.trim().to_string(),
            conclusion: request.conclusion.trim().to_string(),
            notes: normalize_optional_text(request.notes.as_deref()),
            created_at: now,
        };
        self.clinical.create_diagnosis(&diagnosis)?;
        info!(
            "event=diagnosis_create module=clinical status=ok diagnosis_id={} appointment_id={}",
            diagnosis.id, appointment.id
        );
        Ok(diagnosis)
    }

    pub fn order_service(
        &self,
        request: &ServiceOrderRequest,
        now: NaiveDateTime,
    ) -> ServiceResult<ServiceOrder> {
        let appointment = self.active_appointment(request.appointment_id)?;
        let order = ServiceOrder {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            service_name: request.service_name.trim().to_string(),
            price: request.price,
            technician_id: None,
            status: ServiceOrderStatus::Ordered,
            result: None,
            created_at: now,
        };
        self.clinical.create_service_order(&order)?;
        info!(
            "event=service_order_create module=clinical status=ok order_id={} appointment_id={}",
            order.id, appointment.id
        );
        Ok(order)
    }

    pub fn assign_technician(
        &self,
        order_id: ServiceOrderId,
        technician_id: UserId,
    ) -> ServiceResult<ServiceOrder> {
        self.ensure_role(technician_id, Role::Technician)?;
        let mut order = self.service_order(order_id)?;
        if !matches!(
            order.status,
            ServiceOrderStatus::Ordered | ServiceOrderStatus::InProgress
        ) {
            return Err(ServiceError::InvalidTransition {
                entity: "service order",
                from: order.status.as_str(),
                to: "assigned",
            });
        }
        order.technician_id = Some(technician_id);
        self.clinical.update_service_order(&order)?;
        Ok(order)
    }

    pub fn start_service(&self, order_id: ServiceOrderId) -> ServiceResult<ServiceOrder> {
        self.move_service_order(order_id, ServiceOrderStatus::InProgress, None)
    }

    pub fn complete_service(
        &self,
        order_id: ServiceOrderId,
        result: &str,
    ) -> ServiceResult<ServiceOrder> {
        if result.trim().is_empty() {
            return Err(ValidationError::Blank("result").into());
        }
        self.move_service_order(order_id, ServiceOrderStatus::Completed, Some(result.trim()))
    }

    pub fn cancel_service(&self, order_id: ServiceOrderId) -> ServiceResult<ServiceOrder> {
        self.move_service_order(order_id, ServiceOrderStatus::Cancelled, None)
    }

    pub fn list_service_orders(
        &self,
        appointment_id: AppointmentId,
    ) -> ServiceResult<Vec<ServiceOrder>> {
        Ok(self.clinical.list_service_orders(appointment_id)?)
    }

    /// Issues a prescription and dispenses every line from stock at once.
    pub fn prescribe(
        &self,
        request: &PrescriptionRequest,
        now: NaiveDateTime,
    ) -> ServiceResult<Prescription> {
        let appointment = self.active_appointment(request.appointment_id)?;
        self.ensure_role(request.doctor_id, Role::Doctor)?;
        if request.items.is_empty() {
            return Err(ValidationError::Empty("items").into());
        }

        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let medicine = self
                .inventory
                .get_medicine(item.medicine_id)?
                .filter(|medicine| medicine.is_active)
                .ok_or(ServiceError::NotFound {
                    entity: "medicine",
                    id: item.medicine_id,
                })?;
            lines.push(PrescriptionLine {
                medicine_id: medicine.id,
                quantity: item.quantity,
                dosage: item.dosage.trim().to_string(),
                unit_price: medicine.price,
            });
        }

        let prescription = Prescription {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            doctor_id: request.doctor_id,
            notes: normalize_optional_text(request.notes.as_deref()),
            lines,
            created_at: now,
        };
        self.clinical.create_prescription(&prescription)?;
        info!(
            "event=prescription_create module=clinical status=ok prescription_id={} lines={}",
            prescription.id,
            prescription.lines.len()
        );
        Ok(prescription)
    }

    pub fn get_prescription(&self, id: PrescriptionId) -> ServiceResult<Prescription> {
        self.clinical
            .get_prescription(id)?
            .ok_or(ServiceError::NotFound {
                entity: "prescription",
                id,
            })
    }

    fn move_service_order(
        &self,
        order_id: ServiceOrderId,
        next: ServiceOrderStatus,
        result: Option<&str>,
    ) -> ServiceResult<ServiceOrder> {
        let mut order = self.service_order(order_id)?;
        if !order.status.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition {
                entity: "service order",
                from: order.status.as_str(),
                to: next.as_str(),
            });
        }
        order.status = next;
        if let Some(result) = result {
            order.result = Some(result.to_string());
        }
        self.clinical.update_service_order(&order)?;
        info!(
            "event=service_order_status module=clinical status=ok order_id={order_id} new_status={}",
            next.as_str()
        );
        Ok(order)
    }

    fn service_order(&self, id: ServiceOrderId) -> ServiceResult<ServiceOrder> {
        self.clinical
            .get_service_order(id)?
            .ok_or(ServiceError::NotFound {
                entity: "service order",
                id,
            })
    }

    fn appointment(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        self.appointments
            .get_appointment(id)?
            .ok_or(ServiceError::NotFound {
                entity: "appointment",
                id,
            })
    }

    fn active_appointment(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        let appointment = self.appointment(id)?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(ServiceError::Conflict(format!(
                "appointment {id} is cancelled"
            )));
        }
        Ok(appointment)
    }

    fn ensure_role(&self, user_id: UserId, role: Role) -> ServiceResult<()> {
        let user = self.users.get_user(user_id)?.ok_or(ServiceError::NotFound {
            entity: "user",
            id: user_id,
        })?;
        if !user.is_active || !user.has_role(role) {
            return Err(ServiceError::RoleRequired { user_id, role });
        }
        Ok(())
    }
}
