//! Patient invoices.
//!
//! # Invariants
//! - `total` equals the sum of `quantity * unit_price` over all lines.
//! - Only `unpaid` invoices can be paid or cancelled.

use super::appointment::AppointmentId;
use super::patient::PatientId;
use super::validation::{
    line_amount, require_amount, require_quantity, require_text, sum_amounts, ValidationError,
};
use super::Money;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type InvoiceId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unpaid" => Some(Self::Unpaid),
            "paid" => Some(Self::Paid),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Consultation,
    Service,
    Medicine,
}

impl LineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consultation => "consultation",
            Self::Service => "service",
            Self::Medicine => "medicine",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "consultation" => Some(Self::Consultation),
            "service" => Some(Self::Service),
            "medicine" => Some(Self::Medicine),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub kind: LineKind,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl InvoiceLine {
    pub fn amount(&self) -> Result<Money, ValidationError> {
        line_amount(self.quantity, self.unit_price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub patient_id: PatientId,
    pub appointment_id: Option<AppointmentId>,
    pub status: InvoiceStatus,
    pub total: Money,
    pub lines: Vec<InvoiceLine>,
    pub created_at: NaiveDateTime,
    pub paid_at: Option<NaiveDateTime>,
}

impl Invoice {
    /// Builds an unpaid invoice whose total is derived from `lines`.
    pub fn unpaid(
        patient_id: PatientId,
        appointment_id: Option<AppointmentId>,
        lines: Vec<InvoiceLine>,
        created_at: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let total = sum_amounts(lines.iter().map(InvoiceLine::amount))?;
        Ok(Self {
            id: Uuid::new_v4(),
            patient_id,
            appointment_id,
            status: InvoiceStatus::Unpaid,
            total,
            lines,
            created_at,
            paid_at: None,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lines.is_empty() {
            return Err(ValidationError::Empty("lines"));
        }
        for line in &self.lines {
            require_text("description", &line.description)?;
            require_quantity("quantity", line.quantity)?;
            require_amount("unit_price", line.unit_price)?;
        }
        let expected = sum_amounts(self.lines.iter().map(InvoiceLine::amount))?;
        if self.total != expected {
            return Err(ValidationError::OutOfRange {
                field: "total",
                message: format!("must equal line sum {expected}, got {}", self.total),
            });
        }
        Ok(())
    }
}
