//! Per-call service wiring over a locked connection.

use clinic_core::repo::appointment_repo::SqliteAppointmentRepository;
use clinic_core::repo::clinical_repo::SqliteClinicalRepository;
use clinic_core::repo::inventory_repo::SqliteInventoryRepository;
use clinic_core::repo::invoice_repo::SqliteInvoiceRepository;
use clinic_core::repo::patient_repo::SqlitePatientRepository;
use clinic_core::repo::queue_repo::SqliteQueueRepository;
use clinic_core::repo::schedule_repo::SqliteScheduleRepository;
use clinic_core::repo::user_repo::SqliteUserRepository;
use clinic_core::service::appointment_service::AppointmentService;
use clinic_core::service::clinical_service::ClinicalService;
use clinic_core::service::inventory_service::InventoryService;
use clinic_core::service::invoice_service::InvoiceService;
use clinic_core::service::patient_service::PatientService;
use clinic_core::service::queue_service::QueueService;
use clinic_core::service::schedule_service::ScheduleService;
use clinic_core::service::user_service::UserService;
use clinic_core::ServiceResult;
use rusqlite::Connection;

pub type Users<'c> = UserService<SqliteUserRepository<'c>>;
pub type Patients<'c> = PatientService<SqlitePatientRepository<'c>, SqliteClinicalRepository<'c>>;
pub type Appointments<'c> = AppointmentService<
    SqliteAppointmentRepository<'c>,
    SqlitePatientRepository<'c>,
    SqliteUserRepository<'c>,
>;
pub type Schedules<'c> = ScheduleService<SqliteScheduleRepository<'c>, SqliteUserRepository<'c>>;
pub type Queue<'c> = QueueService<
    SqliteQueueRepository<'c>,
    SqlitePatientRepository<'c>,
    SqliteAppointmentRepository<'c>,
>;
pub type Clinical<'c> = ClinicalService<
    SqliteClinicalRepository<'c>,
    SqliteAppointmentRepository<'c>,
    SqlitePatientRepository<'c>,
    SqliteUserRepository<'c>,
    SqliteInventoryRepository<'c>,
>;
pub type Inventory<'c> = InventoryService<SqliteInventoryRepository<'c>, SqliteUserRepository<'c>>;
pub type Invoices<'c> = InvoiceService<
    SqliteInvoiceRepository<'c>,
    SqliteAppointmentRepository<'c>,
    SqliteClinicalRepository<'c>,
    SqliteInventoryRepository<'c>,
>;

pub fn users(conn: &Connection) -> ServiceResult<Users<'_>> {
    Ok(UserService::new(SqliteUserRepository::try_new(conn)?))
}

pub fn patients(conn: &Connection) -> ServiceResult<Patients<'_>> {
    Ok(PatientService::new(
        SqlitePatientRepository::try_new(conn)?,
        SqliteClinicalRepository::try_new(conn)?,
    ))
}

pub fn appointments(conn: &Connection) -> ServiceResult<Appointments<'_>> {
    Ok(AppointmentService::new(
        SqliteAppointmentRepository::try_new(conn)?,
        SqlitePatientRepository::try_new(conn)?,
        SqliteUserRepository::try_new(conn)?,
    ))
}

pub fn schedules(conn: &Connection) -> ServiceResult<Schedules<'_>> {
    Ok(ScheduleService::new(
        SqliteScheduleRepository::try_new(conn)?,
        SqliteUserRepository::try_new(conn)?,
    ))
}

pub fn queue(conn: &Connection) -> ServiceResult<Queue<'_>> {
    Ok(QueueService::new(
        SqliteQueueRepository::try_new(conn)?,
        SqlitePatientRepository::try_new(conn)?,
        SqliteAppointmentRepository::try_new(conn)?,
    ))
}

pub fn clinical(conn: &Connection) -> ServiceResult<Clinical<'_>> {
    Ok(ClinicalService::new(
        SqliteClinicalRepository::try_new(conn)?,
        SqliteAppointmentRepository::try_new(conn)?,
        SqlitePatientRepository::try_new(conn)?,
        SqliteUserRepository::try_new(conn)?,
        SqliteInventoryRepository::try_new(conn)?,
    ))
}

pub fn inventory(conn: &Connection) -> ServiceResult<Inventory<'_>> {
    Ok(InventoryService::new(
        SqliteInventoryRepository::try_new(conn)?,
        SqliteUserRepository::try_new(conn)?,
    ))
}

pub fn invoices(conn: &Connection) -> ServiceResult<Invoices<'_>> {
    Ok(InvoiceService::new(
        SqliteInvoiceRepository::try_new(conn)?,
        SqliteAppointmentRepository::try_new(conn)?,
        SqliteClinicalRepository::try_new(conn)?,
        SqliteInventoryRepository::try_new(conn)?,
    ))
}
