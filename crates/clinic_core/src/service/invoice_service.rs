//! Invoice generation and payment.
//!
//! # Invariants
//! - An appointment has at most one non-cancelled invoice.
//! - Lines: one consultation, one per non-cancelled service order, one per
//!   prescription line.

use super::error::{ServiceError, ServiceResult};
use crate::model::appointment::{AppointmentId, AppointmentStatus};
use crate::model::clinical::ServiceOrderStatus;
use crate::model::invoice::{Invoice, InvoiceId, InvoiceLine, InvoiceStatus, LineKind};
use crate::model::validation::require_amount;
use crate::model::Money;
use crate::repo::appointment_repo::AppointmentRepository;
use crate::repo::clinical_repo::ClinicalRepository;
use crate::repo::inventory_repo::InventoryRepository;
use crate::repo::invoice_repo::InvoiceRepository;
use chrono::NaiveDateTime;
use log::info;

pub struct InvoiceService<V, A, C, I>
where
    V: InvoiceRepository,
    A: AppointmentRepository,
    C: ClinicalRepository,
    I: InventoryRepository,
{
    invoices: V,
    appointments: A,
    clinical: C,
    inventory: I,
}

impl<V, A, C, I> InvoiceService<V, A, C, I>
where
    V: InvoiceRepository,
    A: AppointmentRepository,
    C: ClinicalRepository,
    I: InventoryRepository,
{
    pub fn new(invoices: V, appointments: A, clinical: C, inventory: I) -> Self {
        Self {
            invoices,
            appointments,
            clinical,
            inventory,
        }
    }

    /// Bills everything recorded against an appointment.
    pub fn generate_for_appointment(
        &self,
        appointment_id: AppointmentId,
        consultation_fee: Money,
        now: NaiveDateTime,
    ) -> ServiceResult<Invoice> {
        require_amount("consultation_fee", consultation_fee)?;
        let appointment = self
            .appointments
            .get_appointment(appointment_id)?
            .ok_or(ServiceError::NotFound {
                entity: "appointment",
                id: appointment_id,
            })?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(ServiceError::Conflict(format!(
                "appointment {appointment_id} is cancelled"
            )));
        }
        if let Some(existing) = self.invoices.find_open_for_appointment(appointment_id)? {
            return Err(ServiceError::Conflict(format!(
                "appointment {appointment_id} already has invoice {}",
                existing.id
            )));
        }

        let mut lines = vec![InvoiceLine {
            kind: LineKind::Consultation,
            description: "Consultation".to_string(),
            quantity: 1,
            unit_price: consultation_fee,
        }];
        for order in self.clinical.list_service_orders(appointment_id)? {
            if order.status == ServiceOrderStatus::Cancelled {
                continue;
            }
            lines.push(InvoiceLine {
                kind: LineKind::Service,
                description: order.service_name,
                quantity: 1,
                unit_price: order.price,
            });
        }
        for prescription in self.clinical.list_prescriptions(appointment_id)? {
            for line in prescription.lines {
                let description = match self.inventory.get_medicine(line.medicine_id)? {
                    Some(medicine) => format!("{} ({})", medicine.name, medicine.unit),
                    None => format!("medicine {}", line.medicine_id),
                };
                lines.push(InvoiceLine {
                    kind: LineKind::Medicine,
                    description,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                });
            }
        }

        let invoice = Invoice::unpaid(appointment.patient_id, Some(appointment_id), lines, now)?;
        self.invoices.create_invoice(&invoice)?;
        info!(
            "event=invoice_create module=invoice status=ok invoice_id={} lines={} total={}",
            invoice.id,
            invoice.lines.len(),
            invoice.total
        );
        Ok(invoice)
    }

    pub fn get(&self, id: InvoiceId) -> ServiceResult<Invoice> {
        self.invoices
            .get_invoice(id)?
            .ok_or(ServiceError::NotFound {
                entity: "invoice",
                id,
            })
    }

    pub fn pay(&self, id: InvoiceId, now: NaiveDateTime) -> ServiceResult<Invoice> {
        self.settle(id, InvoiceStatus::Paid, Some(now))
    }

    pub fn cancel(&self, id: InvoiceId) -> ServiceResult<Invoice> {
        self.settle(id, InvoiceStatus::Cancelled, None)
    }

    fn settle(
        &self,
        id: InvoiceId,
        next: InvoiceStatus,
        paid_at: Option<NaiveDateTime>,
    ) -> ServiceResult<Invoice> {
        let mut invoice = self.get(id)?;
        if invoice.status != InvoiceStatus::Unpaid {
            return Err(ServiceError::InvalidTransition {
                entity: "invoice",
                from: invoice.status.as_str(),
                to: next.as_str(),
            });
        }
        self.invoices.set_status(id, next, paid_at)?;
        invoice.status = next;
        invoice.paid_at = paid_at;
        info!(
            "event=invoice_status module=invoice status=ok invoice_id={id} new_status={}",
            next.as_str()
        );
        Ok(invoice)
    }
}
