//! Supplier, medicine and import bill persistence.
//!
//! # Invariants
//! - An import bill and its stock increments commit together.
//! - Stock increments are checked in Rust; SQLite never sees an overflowing sum.

use super::{bool_column, bool_to_int, ensure_connection_ready, opt_id, optional_uuid_column};
use super::{uuid_column, RepoError, RepoResult};
use crate::model::inventory::{
    ImportBill, ImportBillId, ImportLine, Medicine, MedicineId, Supplier, SupplierId,
};
use crate::model::validation::restocked;
use rusqlite::{params, Connection, OptionalExtension, Row};

const MEDICINE_SELECT_SQL: &str = "SELECT
    id,
    name,
    unit,
    price,
    stock,
    supplier_id,
    is_active
FROM medicines";

pub trait InventoryRepository {
    fn create_supplier(&self, supplier: &Supplier) -> RepoResult<SupplierId>;
    fn get_supplier(&self, id: SupplierId) -> RepoResult<Option<Supplier>>;
    fn list_suppliers(&self) -> RepoResult<Vec<Supplier>>;
    fn supplier_phone_taken(&self, phone: &str) -> RepoResult<bool>;

    fn create_medicine(&self, medicine: &Medicine) -> RepoResult<MedicineId>;
    fn update_medicine(&self, medicine: &Medicine) -> RepoResult<()>;
    fn get_medicine(&self, id: MedicineId) -> RepoResult<Option<Medicine>>;
    fn list_medicines(&self, include_inactive: bool) -> RepoResult<Vec<Medicine>>;
    fn medicine_name_taken(&self, name: &str, exclude: Option<MedicineId>) -> RepoResult<bool>;

    /// Inserts the bill and adds every line's quantity to stock.
    fn create_import_bill(&self, bill: &ImportBill) -> RepoResult<ImportBillId>;
    fn get_import_bill(&self, id: ImportBillId) -> RepoResult<Option<ImportBill>>;
}

pub struct SqliteInventoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInventoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl InventoryRepository for SqliteInventoryRepository<'_> {
    fn create_supplier(&self, supplier: &Supplier) -> RepoResult<SupplierId> {
        supplier.validate()?;
        self.conn.execute(
            "INSERT INTO suppliers (id, name, phone, email, address)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                supplier.id.to_string(),
                supplier.name.as_str(),
                supplier.phone.as_str(),
                supplier.email.as_deref(),
                supplier.address.as_deref(),
            ],
        )?;
        Ok(supplier.id)
    }

    fn get_supplier(&self, id: SupplierId) -> RepoResult<Option<Supplier>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, phone, email, address FROM suppliers WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_supplier_row(row)?));
        }
        Ok(None)
    }

    fn list_suppliers(&self) -> RepoResult<Vec<Supplier>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, phone, email, address
             FROM suppliers
             ORDER BY name ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut suppliers = Vec::new();
        while let Some(row) = rows.next()? {
            suppliers.push(parse_supplier_row(row)?);
        }
        Ok(suppliers)
    }

    fn supplier_phone_taken(&self, phone: &str) -> RepoResult<bool> {
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE phone = ?1);",
            [phone],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    fn create_medicine(&self, medicine: &Medicine) -> RepoResult<MedicineId> {
        medicine.validate()?;
        self.conn.execute(
            "INSERT INTO medicines (id, name, unit, price, stock, supplier_id, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                medicine.id.to_string(),
                medicine.name.as_str(),
                medicine.unit.as_str(),
                medicine.price,
                medicine.stock,
                opt_id(medicine.supplier_id),
                bool_to_int(medicine.is_active),
            ],
        )?;
        Ok(medicine.id)
    }

    fn update_medicine(&self, medicine: &Medicine) -> RepoResult<()> {
        medicine.validate()?;
        // Stock is owned by import bills and prescriptions, never by edits.
        let changed = self.conn.execute(
            "UPDATE medicines
             SET name = ?2, unit = ?3, price = ?4, supplier_id = ?5, is_active = ?6
             WHERE id = ?1;",
            params![
                medicine.id.to_string(),
                medicine.name.as_str(),
                medicine.unit.as_str(),
                medicine.price,
                opt_id(medicine.supplier_id),
                bool_to_int(medicine.is_active),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "medicine",
                id: medicine.id,
            });
        }
        Ok(())
    }

    fn get_medicine(&self, id: MedicineId) -> RepoResult<Option<Medicine>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEDICINE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_medicine_row(row)?));
        }
        Ok(None)
    }

    fn list_medicines(&self, include_inactive: bool) -> RepoResult<Vec<Medicine>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEDICINE_SELECT_SQL}
             WHERE (?1 = 1 OR is_active = 1)
             ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_inactive)])?;
        let mut medicines = Vec::new();
        while let Some(row) = rows.next()? {
            medicines.push(parse_medicine_row(row)?);
        }
        Ok(medicines)
    }

    fn medicine_name_taken(&self, name: &str, exclude: Option<MedicineId>) -> RepoResult<bool> {
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM medicines
                WHERE name = ?1 COLLATE NOCASE AND (?2 IS NULL OR id <> ?2)
            );",
            params![name, opt_id(exclude)],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    fn create_import_bill(&self, bill: &ImportBill) -> RepoResult<ImportBillId> {
        bill.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO import_bills (id, supplier_id, created_by, import_date, total, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                bill.id.to_string(),
                bill.supplier_id.to_string(),
                bill.created_by.to_string(),
                bill.import_date,
                bill.total,
                bill.note.as_deref(),
            ],
        )?;
        for (line_no, line) in bill.lines.iter().enumerate() {
            let current: Option<i64> = tx
                .query_row(
                    "SELECT stock FROM medicines WHERE id = ?1;",
                    [line.medicine_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Err(RepoError::NotFound {
                    entity: "medicine",
                    id: line.medicine_id,
                });
            };
            tx.execute(
                "UPDATE medicines SET stock = ?2 WHERE id = ?1;",
                params![
                    line.medicine_id.to_string(),
                    restocked(current, line.quantity)?
                ],
            )?;
            tx.execute(
                "INSERT INTO import_details (import_bill_id, line_no, medicine_id, quantity, unit_cost)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    bill.id.to_string(),
                    line_no as i64,
                    line.medicine_id.to_string(),
                    line.quantity,
                    line.unit_cost,
                ],
            )?;
        }
        tx.commit()?;

        Ok(bill.id)
    }

    fn get_import_bill(&self, id: ImportBillId) -> RepoResult<Option<ImportBill>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, supplier_id, created_by, import_date, total, note
             FROM import_bills
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let id_text = id.to_string();
        let mut line_stmt = self.conn.prepare(
            "SELECT medicine_id, quantity, unit_cost
             FROM import_details
             WHERE import_bill_id = ?1
             ORDER BY line_no ASC;",
        )?;
        let mut line_rows = line_stmt.query([id_text.as_str()])?;
        let mut lines = Vec::new();
        while let Some(line_row) = line_rows.next()? {
            lines.push(ImportLine {
                medicine_id: uuid_column(line_row, "medicine_id")?,
                quantity: line_row.get("quantity")?,
                unit_cost: line_row.get("unit_cost")?,
            });
        }

        Ok(Some(ImportBill {
            id: uuid_column(row, "id")?,
            supplier_id: uuid_column(row, "supplier_id")?,
            created_by: uuid_column(row, "created_by")?,
            import_date: row.get("import_date")?,
            total: row.get("total")?,
            note: row.get("note")?,
            lines,
        }))
    }
}

fn parse_supplier_row(row: &Row<'_>) -> RepoResult<Supplier> {
    Ok(Supplier {
        id: uuid_column(row, "id")?,
        name: row.get("name")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        address: row.get("address")?,
    })
}

fn parse_medicine_row(row: &Row<'_>) -> RepoResult<Medicine> {
    Ok(Medicine {
        id: uuid_column(row, "id")?,
        name: row.get("name")?,
        unit: row.get("unit")?,
        price: row.get("price")?,
        stock: row.get("stock")?,
        supplier_id: optional_uuid_column(row, "supplier_id")?,
        is_active: bool_column(row, "is_active")?,
    })
}
