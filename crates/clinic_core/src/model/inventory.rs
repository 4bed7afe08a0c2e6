//! Medicines, suppliers and stock import bills.
//!
//! # Invariants
//! - `Medicine::stock` never drops below zero.
//! - Import bill totals equal the sum of `quantity * unit_cost`.

use super::user::UserId;
use super::validation::{
    line_amount, require_amount, require_email, require_phone, require_quantity, require_range,
    require_text, sum_amounts, ValidationError, MAX_STOCK,
};
use super::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MedicineId = Uuid;
pub type SupplierId = Uuid;
pub type ImportBillId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    /// Dispensing unit, e.g. `tablet` or `bottle`.
    pub unit: String,
    pub price: Money,
    pub stock: i64,
    pub supplier_id: Option<SupplierId>,
    pub is_active: bool,
}

impl Medicine {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("unit", &self.unit)?;
        require_amount("price", self.price)?;
        require_range("stock", self.stock, 0, MAX_STOCK)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl Supplier {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_phone("phone", &self.phone)?;
        if let Some(email) = &self.email {
            require_email("email", email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLine {
    pub medicine_id: MedicineId,
    pub quantity: i64,
    pub unit_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBill {
    pub id: ImportBillId,
    pub supplier_id: SupplierId,
    pub created_by: UserId,
    pub import_date: NaiveDate,
    pub total: Money,
    pub note: Option<String>,
    pub lines: Vec<ImportLine>,
}

impl ImportBill {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lines.is_empty() {
            return Err(ValidationError::Empty("lines"));
        }
        for line in &self.lines {
            require_quantity("quantity", line.quantity)?;
            require_amount("unit_cost", line.unit_cost)?;
        }
        if self.total != import_total(&self.lines)? {
            return Err(ValidationError::OutOfRange {
                field: "total",
                message: "does not match line amounts".to_string(),
            });
        }
        Ok(())
    }
}

pub fn import_total(lines: &[ImportLine]) -> Result<Money, ValidationError> {
    sum_amounts(
        lines
            .iter()
            .map(|line| line_amount(line.quantity, line.unit_cost)),
    )
}
