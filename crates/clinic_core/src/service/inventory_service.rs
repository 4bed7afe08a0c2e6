//! Medicine catalogue, suppliers and stock imports.

use super::error::{ServiceError, ServiceResult};
use crate::model::inventory::{
    import_total, ImportBill, ImportBillId, ImportLine, Medicine, MedicineId, Supplier, SupplierId,
};
use crate::model::user::{Role, UserId};
use crate::model::validation::{normalize_email, normalize_optional_text, normalize_phone};
use crate::model::Money;
use crate::repo::inventory_repo::InventoryRepository;
use crate::repo::user_repo::UserRepository;
use chrono::NaiveDate;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MedicineInput {
    pub name: String,
    pub unit: String,
    pub price: Money,
    pub supplier_id: Option<SupplierId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportBillRequest {
    pub supplier_id: SupplierId,
    pub created_by: UserId,
    pub import_date: NaiveDate,
    pub note: Option<String>,
    pub lines: Vec<ImportLine>,
}

pub struct InventoryService<I: InventoryRepository, U: UserRepository> {
    inventory: I,
    users: U,
}

impl<I: InventoryRepository, U: UserRepository> InventoryService<I, U> {
    pub fn new(inventory: I, users: U) -> Self {
        Self { inventory, users }
    }

    pub fn create_supplier(&self, input: &SupplierInput) -> ServiceResult<Supplier> {
        let supplier = Supplier {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            phone: normalize_phone(input.phone.trim()),
            email: normalize_email(input.email.as_deref()),
            address: normalize_optional_text(input.address.as_deref()),
        };
        supplier.validate()?;
        if self.inventory.supplier_phone_taken(&supplier.phone)? {
            return Err(ServiceError::Conflict(
                "phone is already registered to another supplier".to_string(),
            ));
        }
        self.inventory.create_supplier(&supplier)?;
        Ok(supplier)
    }

    pub fn get_supplier(&self, id: SupplierId) -> ServiceResult<Supplier> {
        self.inventory
            .get_supplier(id)?
            .ok_or(ServiceError::NotFound {
                entity: "supplier",
                id,
            })
    }

    pub fn list_suppliers(&self) -> ServiceResult<Vec<Supplier>> {
        Ok(self.inventory.list_suppliers()?)
    }

    /// Creates a catalogue entry with zero stock.
    pub fn create_medicine(&self, input: &MedicineInput) -> ServiceResult<Medicine> {
        let medicine = Medicine {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            unit: input.unit.trim().to_string(),
            price: input.price,
            stock: 0,
            supplier_id: input.supplier_id,
            is_active: true,
        };
        self.check_medicine(&medicine)?;
        self.inventory.create_medicine(&medicine)?;
        Ok(medicine)
    }

    /// Updates catalogue fields. Stock is left untouched.
    pub fn update_medicine(&self, id: MedicineId, input: &MedicineInput) -> ServiceResult<Medicine> {
        let mut medicine = self.get_medicine(id)?;
        medicine.name = input.name.trim().to_string();
        medicine.unit = input.unit.trim().to_string();
        medicine.price = input.price;
        medicine.supplier_id = input.supplier_id;
        self.check_medicine(&medicine)?;
        self.inventory.update_medicine(&medicine)?;
        Ok(medicine)
    }

    pub fn deactivate_medicine(&self, id: MedicineId) -> ServiceResult<Medicine> {
        let mut medicine = self.get_medicine(id)?;
        medicine.is_active = false;
        self.inventory.update_medicine(&medicine)?;
        Ok(medicine)
    }

    pub fn get_medicine(&self, id: MedicineId) -> ServiceResult<Medicine> {
        self.inventory
            .get_medicine(id)?
            .ok_or(ServiceError::NotFound {
                entity: "medicine",
                id,
            })
    }

    pub fn list_medicines(&self, include_inactive: bool) -> ServiceResult<Vec<Medicine>> {
        Ok(self.inventory.list_medicines(include_inactive)?)
    }

    /// Records a stock import and adds its quantities to stock.
    pub fn import_stock(&self, request: &ImportBillRequest) -> ServiceResult<ImportBill> {
        self.get_supplier(request.supplier_id)?;
        let creator = self
            .users
            .get_user(request.created_by)?
            .ok_or(ServiceError::NotFound {
                entity: "user",
                id: request.created_by,
            })?;
        if !creator.is_active || !creator.has_role(Role::Admin) {
            return Err(ServiceError::RoleRequired {
                user_id: creator.id,
                role: Role::Admin,
            });
        }

        let bill = ImportBill {
            id: Uuid::new_v4(),
            supplier_id: request.supplier_id,
            created_by: request.created_by,
            import_date: request.import_date,
            total: import_total(&request.lines)?,
            note: normalize_optional_text(request.note.as_deref()),
            lines: request.lines.clone(),
        };
        self.inventory.create_import_bill(&bill)?;
        info!(
            "event=stock_import module=inventory status=ok bill_id={} lines={} total={}",
            bill.id,
            bill.lines.len(),
            bill.total
        );
        Ok(bill)
    }

    pub fn get_import_bill(&self, id: ImportBillId) -> ServiceResult<ImportBill> {
        self.inventory
            .get_import_bill(id)?
            .ok_or(ServiceError::NotFound {
                entity: "import bill",
                id,
            })
    }

    fn check_medicine(&self, medicine: &Medicine) -> ServiceResult<()> {
        medicine.validate()?;
        if let Some(supplier_id) = medicine.supplier_id {
            self.get_supplier(supplier_id)?;
        }
        if self
            .inventory
            .medicine_name_taken(&medicine.name, Some(medicine.id))?
        {
            return Err(ServiceError::Conflict(format!(
                "medicine `{}` already exists",
                medicine.name
            )));
        }
        Ok(())
    }
}
