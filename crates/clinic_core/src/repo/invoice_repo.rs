//! Invoice persistence.

use super::{enum_column, ensure_connection_ready, optional_uuid_column, uuid_column};
use super::{opt_id, RepoError, RepoResult};
use crate::model::appointment::AppointmentId;
use crate::model::invoice::{Invoice, InvoiceId, InvoiceLine, InvoiceStatus, LineKind};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

const INVOICE_SELECT_SQL: &str = "SELECT
    id,
    patient_id,
    appointment_id,
    status,
    total,
    created_at,
    paid_at
FROM invoices";

pub trait InvoiceRepository {
    fn create_invoice(&self, invoice: &Invoice) -> RepoResult<InvoiceId>;
    fn get_invoice(&self, id: InvoiceId) -> RepoResult<Option<Invoice>>;
    fn set_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
        paid_at: Option<NaiveDateTime>,
    ) -> RepoResult<()>;
    /// The non-cancelled invoice of an appointment, if any.
    fn find_open_for_appointment(&self, appointment_id: AppointmentId) -> RepoResult<Option<Invoice>>;
}

pub struct SqliteInvoiceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInvoiceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl InvoiceRepository for SqliteInvoiceRepository<'_> {
    fn create_invoice(&self, invoice: &Invoice) -> RepoResult<InvoiceId> {
        invoice.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO invoices (id, patient_id, appointment_id, status, total, created_at, paid_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                invoice.id.to_string(),
                invoice.patient_id.to_string(),
                opt_id(invoice.appointment_id),
                invoice.status.as_str(),
                invoice.total,
                invoice.created_at,
                invoice.paid_at,
            ],
        )?;
        for (line_no, line) in invoice.lines.iter().enumerate() {
            tx.execute(
                "INSERT INTO invoice_details (invoice_id, line_no, kind, description, quantity, unit_price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    invoice.id.to_string(),
                    line_no as i64,
                    line.kind.as_str(),
                    line.description.as_str(),
                    line.quantity,
                    line.unit_price,
                ],
            )?;
        }
        tx.commit()?;

        Ok(invoice.id)
    }

    fn get_invoice(&self, id: InvoiceId) -> RepoResult<Option<Invoice>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INVOICE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_invoice_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn set_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
        paid_at: Option<NaiveDateTime>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE invoices SET status = ?2, paid_at = ?3 WHERE id = ?1;",
            params![id.to_string(), status.as_str(), paid_at],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "invoice",
                id,
            });
        }
        Ok(())
    }

    fn find_open_for_appointment(&self, appointment_id: AppointmentId) -> RepoResult<Option<Invoice>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INVOICE_SELECT_SQL}
             WHERE appointment_id = ?1 AND status <> 'cancelled'
             ORDER BY created_at DESC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([appointment_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_invoice_row(self.conn, row)?));
        }
        Ok(None)
    }
}

fn parse_invoice_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Invoice> {
    let id = uuid_column(row, "id")?;
    let mut stmt = conn.prepare(
        "SELECT kind, description, quantity, unit_price
         FROM invoice_details
         WHERE invoice_id = ?1
         ORDER BY line_no ASC;",
    )?;
    let mut line_rows = stmt.query([id.to_string()])?;
    let mut lines = Vec::new();
    while let Some(line_row) = line_rows.next()? {
        lines.push(InvoiceLine {
            kind: enum_column(line_row, "kind", LineKind::parse)?,
            description: line_row.get("description")?,
            quantity: line_row.get("quantity")?,
            unit_price: line_row.get("unit_price")?,
        });
    }

    Ok(Invoice {
        id,
        patient_id: uuid_column(row, "patient_id")?,
        appointment_id: optional_uuid_column(row, "appointment_id")?,
        status: enum_column(row, "status", InvoiceStatus::parse)?,
        total: row.get("total")?,
        lines,
        created_at: row.get("created_at")?,
        paid_at: row.get("paid_at")?,
    })
}
