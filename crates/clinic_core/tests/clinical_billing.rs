use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clinic_core::db::open_db_in_memory;
use clinic_core::model::appointment::AppointmentId;
use clinic_core::model::inventory::{ImportLine, MedicineId, SupplierId};
use clinic_core::model::invoice::{InvoiceStatus, LineKind};
use clinic_core::model::patient::Gender;
use clinic_core::model::user::{Role, UserId};
use clinic_core::model::validation::{ValidationError, MAX_AMOUNT, MAX_STOCK};
use clinic_core::repo::appointment_repo::SqliteAppointmentRepository;
use clinic_core::repo::clinical_repo::SqliteClinicalRepository;
use clinic_core::repo::inventory_repo::SqliteInventoryRepository;
use clinic_core::repo::invoice_repo::SqliteInvoiceRepository;
use clinic_core::repo::patient_repo::SqlitePatientRepository;
use clinic_core::repo::user_repo::SqliteUserRepository;
use clinic_core::service::appointment_service::{AppointmentService, BookAppointmentRequest};
use clinic_core::service::clinical_service::{
    ClinicalService, DiagnosisRequest, PrescriptionItemRequest, PrescriptionRequest,
    ServiceOrderRequest,
};
use clinic_core::service::inventory_service::{
    ImportBillRequest, InventoryService, MedicineInput, SupplierInput,
};
use clinic_core::service::invoice_service::InvoiceService;
use clinic_core::service::patient_service::{PatientInput, PatientService};
use clinic_core::service::user_service::{CreateUserRequest, UserService};
use clinic_core::ServiceError;
use rusqlite::{params, Connection};

const CONSULTATION_FEE: i64 = 150_000;

type Clinical<'conn> = ClinicalService<
    SqliteClinicalRepository<'conn>,
    SqliteAppointmentRepository<'conn>,
    SqlitePatientRepository<'conn>,
    SqliteUserRepository<'conn>,
    SqliteInventoryRepository<'conn>,
>;

type Invoices<'conn> = InvoiceService<
    SqliteInvoiceRepository<'conn>,
    SqliteAppointmentRepository<'conn>,
    SqliteClinicalRepository<'conn>,
    SqliteInventoryRepository<'conn>,
>;

struct Visit {
    doctor: UserId,
    admin: UserId,
    technician: UserId,
    supplier: SupplierId,
    appointment: AppointmentId,
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 9)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn clinical(conn: &Connection) -> Clinical<'_> {
    ClinicalService::new(
        SqliteClinicalRepository::try_new(conn).unwrap(),
        SqliteAppointmentRepository::try_new(conn).unwrap(),
        SqlitePatientRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteInventoryRepository::try_new(conn).unwrap(),
    )
}

fn invoices(conn: &Connection) -> Invoices<'_> {
    InvoiceService::new(
        SqliteInvoiceRepository::try_new(conn).unwrap(),
        SqliteAppointmentRepository::try_new(conn).unwrap(),
        SqliteClinicalRepository::try_new(conn).unwrap(),
        SqliteInventoryRepository::try_new(conn).unwrap(),
    )
}

fn inventory(
    conn: &Connection,
) -> InventoryService<SqliteInventoryRepository<'_>, SqliteUserRepository<'_>> {
    InventoryService::new(
        SqliteInventoryRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
    )
}

fn appointments(
    conn: &Connection,
) -> AppointmentService<
    SqliteAppointmentRepository<'_>,
    SqlitePatientRepository<'_>,
    SqliteUserRepository<'_>,
> {
    AppointmentService::new(
        SqliteAppointmentRepository::try_new(conn).unwrap(),
        SqlitePatientRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
    )
}

fn create_user(conn: &Connection, username: &str, role: Role) -> UserId {
    UserService::new(SqliteUserRepository::try_new(conn).unwrap())
        .create(
            &CreateUserRequest {
                username: username.to_string(),
                full_name: username.to_string(),
                email: None,
                phone: None,
                roles: vec![role],
            },
            now(),
        )
        .unwrap()
        .id
}

fn setup(conn: &Connection) -> Visit {
    let doctor = create_user(conn, "dr.an", Role::Doctor);
    let admin = create_user(conn, "admin", Role::Admin);
    let technician = create_user(conn, "tech.lam", Role::Technician);

    let patient = PatientService::new(
        SqlitePatientRepository::try_new(conn).unwrap(),
        SqliteClinicalRepository::try_new(conn).unwrap(),
    )
    .register(
        &PatientInput {
            user_id: None,
            full_name: "Vo Thi Lan".to_string(),
            date_of_birth: None,
            gender: Gender::Female,
            phone: "0907654321".to_string(),
            email: None,
            address: None,
        },
        now(),
    )
    .unwrap();

    let appointment = appointments(conn)
        .book(
            &BookAppointmentRequest {
                patient_id: patient.id,
                doctor_id: Some(doctor),
                date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                reason: None,
            },
            now(),
        )
        .unwrap();

    let supplier = inventory(conn)
        .create_supplier(&SupplierInput {
            name: "Pharma Co".to_string(),
            phone: "02838123456".to_string(),
            email: None,
            address: None,
        })
        .unwrap();

    Visit {
        doctor,
        admin,
        technician,
        supplier: supplier.id,
        appointment: appointment.id,
    }
}

fn stocked_medicine(conn: &Connection, visit: &Visit, name: &str, price: i64, qty: i64) -> MedicineId {
    let inventory = inventory(conn);
    let medicine = inventory
        .create_medicine(&MedicineInput {
            name: name.to_string(),
            unit: "tablet".to_string(),
            price,
            supplier_id: Some(visit.supplier),
        })
        .unwrap();
    assert_eq!(medicine.stock, 0);
    inventory
        .import_stock(&ImportBillRequest {
            supplier_id: visit.supplier,
            created_by: visit.admin,
            import_date: now().date(),
            note: None,
            lines: vec![ImportLine {
                medicine_id: medicine.id,
                quantity: qty,
                unit_cost: price / 2,
            }],
        })
        .unwrap();
    medicine.id
}

fn stock_of(conn: &Connection, id: MedicineId) -> i64 {
    inventory(conn).get_medicine(id).unwrap().stock
}

fn prescription(visit: &Visit, items: Vec<(MedicineId, i64)>) -> PrescriptionRequest {
    PrescriptionRequest {
        appointment_id: visit.appointment,
        doctor_id: visit.doctor,
        notes: None,
        items: items
            .into_iter()
            .map(|(medicine_id, quantity)| PrescriptionItemRequest {
                medicine_id,
                quantity,
                dosage: "1 tablet after meals".to_string(),
            })
            .collect(),
    }
}

#[test]
fn import_adds_stock_and_records_total() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let medicine = stocked_medicine(&conn, &visit, "Paracetamol 500mg", 2_000, 100);
    assert_eq!(stock_of(&conn, medicine), 100);

    let bill = inventory(&conn)
        .import_stock(&ImportBillRequest {
            supplier_id: visit.supplier,
            created_by: visit.admin,
            import_date: now().date(),
            note: Some("restock".to_string()),
            lines: vec![ImportLine {
                medicine_id: medicine,
                quantity: 20,
                unit_cost: 1_200,
            }],
        })
        .unwrap();
    assert_eq!(bill.total, 24_000);
    assert_eq!(stock_of(&conn, medicine), 120);
    assert_eq!(inventory(&conn).get_import_bill(bill.id).unwrap(), bill);
}

#[test]
fn import_requires_admin_and_known_supplier() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let medicine = stocked_medicine(&conn, &visit, "Amoxicillin", 5_000, 10);

    let mut request = ImportBillRequest {
        supplier_id: visit.supplier,
        created_by: visit.doctor,
        import_date: now().date(),
        note: None,
        lines: vec![ImportLine {
            medicine_id: medicine,
            quantity: 5,
            unit_cost: 2_500,
        }],
    };
    let err = inventory(&conn).import_stock(&request).unwrap_err();
    assert!(matches!(err, ServiceError::RoleRequired { role: Role::Admin, .. }));

    let retired = create_user(&conn, "admin.old", Role::Admin);
    UserService::new(SqliteUserRepository::try_new(&conn).unwrap())
        .deactivate(retired)
        .unwrap();
    request.created_by = retired;
    let err = inventory(&conn).import_stock(&request).unwrap_err();
    assert!(matches!(err, ServiceError::RoleRequired { role: Role::Admin, .. }));

    request.created_by = visit.admin;
    request.supplier_id = uuid::Uuid::new_v4();
    let err = inventory(&conn).import_stock(&request).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert_eq!(stock_of(&conn, medicine), 10);
}

#[test]
fn duplicate_medicine_names_conflict_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    stocked_medicine(&conn, &visit, "Ibuprofen", 3_000, 1);

    let err = inventory(&conn)
        .create_medicine(&MedicineInput {
            name: "  IBUPROFEN ".to_string(),
            unit: "tablet".to_string(),
            price: 3_000,
            supplier_id: None,
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)), "{err}");
}

#[test]
fn prescription_dispenses_stock_atomically() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let paracetamol = stocked_medicine(&conn, &visit, "Paracetamol 500mg", 2_000, 50);
    let vitamin = stocked_medicine(&conn, &visit, "Vitamin C", 1_000, 5);

    let issued = clinical(&conn)
        .prescribe(&prescription(&visit, vec![(paracetamol, 10)]), now())
        .unwrap();
    assert_eq!(issued.lines[0].unit_price, 2_000);
    assert_eq!(stock_of(&conn, paracetamol), 40);

    let err = clinical(&conn)
        .prescribe(
            &prescription(&visit, vec![(paracetamol, 10), (vitamin, 6)]),
            now(),
        )
        .unwrap_err();
    match err {
        ServiceError::InsufficientStock {
            medicine_id,
            requested,
            available,
        } => {
            assert_eq!(medicine_id, vitamin);
            assert_eq!(requested, 6);
            assert_eq!(available, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stock_of(&conn, paracetamol), 40);
    assert_eq!(stock_of(&conn, vitamin), 5);
    assert_eq!(clinical(&conn).get_prescription(issued.id).unwrap(), issued);
}

#[test]
fn prescription_rejects_empty_or_non_doctor() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let medicine = stocked_medicine(&conn, &visit, "Paracetamol 500mg", 2_000, 50);

    let err = clinical(&conn)
        .prescribe(&prescription(&visit, vec![]), now())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let mut request = prescription(&visit, vec![(medicine, 1)]);
    request.doctor_id = visit.technician;
    let err = clinical(&conn).prescribe(&request, now()).unwrap_err();
    assert!(matches!(err, ServiceError::RoleRequired { .. }));

    let err = clinical(&conn)
        .prescribe(&prescription(&visit, vec![(medicine, 0)]), now())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(stock_of(&conn, medicine), 50);
}

#[test]
fn diagnosis_needs_checked_in_visit() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let request = DiagnosisRequest {
        appointment_id: visit.appointment,
        doctor_id: visit.doctor,
        symptoms: "fever, cough".to_string(),
        conclusion: "acute bronchitis".to_string(),
        notes: None,
    };

    let err = clinical(&conn).create_diagnosis(&request, now()).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));

    appointments(&conn).check_in(visit.appointment).unwrap();
    let diagnosis = clinical(&conn).create_diagnosis(&request, now()).unwrap();

    let patient_id = appointments(&conn).get(visit.appointment).unwrap().patient_id;
    let history = PatientService::new(
        SqlitePatientRepository::try_new(&conn).unwrap(),
        SqliteClinicalRepository::try_new(&conn).unwrap(),
    )
    .medical_history(patient_id)
    .unwrap();
    assert_eq!(history.diagnoses, vec![diagnosis]);
}

#[test]
fn service_orders_follow_their_lifecycle() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let service = clinical(&conn);
    let order = service
        .order_service(
            &ServiceOrderRequest {
                appointment_id: visit.appointment,
                service_name: "Chest X-ray".to_string(),
                price: 120_000,
            },
            now(),
        )
        .unwrap();

    let err = service.assign_technician(order.id, visit.doctor).unwrap_err();
    assert!(matches!(err, ServiceError::RoleRequired { .. }));
    let assigned = service.assign_technician(order.id, visit.technician).unwrap();
    assert_eq!(assigned.technician_id, Some(visit.technician));

    service.start_service(order.id).unwrap();
    assert!(service.complete_service(order.id, "  ").is_err());
    let done = service.complete_service(order.id, " clear lungs ").unwrap();
    assert_eq!(done.result.as_deref(), Some("clear lungs"));

    let err = service.cancel_service(order.id).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));
    assert_eq!(service.list_service_orders(visit.appointment).unwrap(), vec![done]);
}

#[test]
fn invoice_bills_consultation_services_and_medicines() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let medicine = stocked_medicine(&conn, &visit, "Paracetamol 500mg", 2_000, 50);
    let clinical = clinical(&conn);

    clinical
        .order_service(
            &ServiceOrderRequest {
                appointment_id: visit.appointment,
                service_name: "Blood test".to_string(),
                price: 80_000,
            },
            now(),
        )
        .unwrap();
    let dropped = clinical
        .order_service(
            &ServiceOrderRequest {
                appointment_id: visit.appointment,
                service_name: "Ultrasound".to_string(),
                price: 200_000,
            },
            now(),
        )
        .unwrap();
    clinical.cancel_service(dropped.id).unwrap();
    clinical
        .prescribe(&prescription(&visit, vec![(medicine, 10)]), now())
        .unwrap();

    let invoices = invoices(&conn);
    let invoice = invoices
        .generate_for_appointment(visit.appointment, CONSULTATION_FEE, now())
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Unpaid);
    assert_eq!(invoice.total, 150_000 + 80_000 + 10 * 2_000);
    let kinds: Vec<LineKind> = invoice.lines.iter().map(|line| line.kind).collect();
    assert_eq!(
        kinds,
        vec![LineKind::Consultation, LineKind::Service, LineKind::Medicine]
    );
    assert_eq!(invoice.lines[2].description, "Paracetamol 500mg (tablet)");

    let err = invoices
        .generate_for_appointment(visit.appointment, CONSULTATION_FEE, now())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let paid = invoices.pay(invoice.id, now()).unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.paid_at, Some(now()));
    assert_eq!(invoices.get(invoice.id).unwrap(), paid);
    let err = invoices.cancel(invoice.id).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));
}

#[test]
fn cancelled_invoice_can_be_regenerated() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let invoices = invoices(&conn);

    let first = invoices
        .generate_for_appointment(visit.appointment, CONSULTATION_FEE, now())
        .unwrap();
    invoices.cancel(first.id).unwrap();
    let second = invoices
        .generate_for_appointment(visit.appointment, CONSULTATION_FEE, now())
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.total, CONSULTATION_FEE);

    let err = invoices
        .generate_for_appointment(visit.appointment, -1, now())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn import_rejects_overflowing_lines_and_stock() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let medicine = stocked_medicine(&conn, &visit, "Cetirizine", 3_000, 1);
    let inventory = inventory(&conn);
    let import = |quantity: i64, unit_cost: i64| ImportBillRequest {
        supplier_id: visit.supplier,
        created_by: visit.admin,
        import_date: now().date(),
        note: None,
        lines: vec![ImportLine {
            medicine_id: medicine,
            quantity,
            unit_cost,
        }],
    };

    let err = inventory.import_stock(&import(1 << 40, 1 << 40)).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::OutOfRange { .. })));
    let err = inventory.import_stock(&import(i64::MAX, 0)).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::OutOfRange { field: "quantity", .. })
    ));
    assert_eq!(stock_of(&conn, medicine), 1);

    conn.execute(
        "UPDATE medicines SET stock = ?2 WHERE id = ?1;",
        params![medicine.to_string(), MAX_STOCK],
    )
    .unwrap();
    let err = inventory.import_stock(&import(1, 1_000)).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::OutOfRange { field: "stock", .. })
    ));
    assert_eq!(stock_of(&conn, medicine), MAX_STOCK);
    assert_eq!(inventory.list_medicines(false).unwrap().len(), 1);
    let bills: i64 = conn
        .query_row("SELECT COUNT(*) FROM import_bills;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(bills, 1);
}

#[test]
fn invoice_rejects_out_of_range_prices() {
    let conn = open_db_in_memory().unwrap();
    let visit = setup(&conn);
    let clinical = clinical(&conn);
    let order = |price: i64| ServiceOrderRequest {
        appointment_id: visit.appointment,
        service_name: "MRI".to_string(),
        price,
    };

    let err = clinical.order_service(&order(i64::MAX), now()).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::OutOfRange { field: "price", .. })
    ));
    assert!(clinical.list_service_orders(visit.appointment).unwrap().is_empty());
    clinical.order_service(&order(MAX_AMOUNT), now()).unwrap();

    let invoices = invoices(&conn);
    let err = invoices
        .generate_for_appointment(visit.appointment, MAX_AMOUNT + 1, now())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    let invoice = invoices
        .generate_for_appointment(visit.appointment, CONSULTATION_FEE, now())
        .unwrap();
    assert_eq!(invoice.total, MAX_AMOUNT + CONSULTATION_FEE);
}
