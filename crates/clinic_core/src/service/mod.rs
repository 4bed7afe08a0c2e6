//! Use-case services.
//!
//! # Responsibility
//! - Enforce cross-record business rules above the repository layer.
//! - Keep the HTTP layer decoupled from storage details.
//!
//! # Invariants
//! - Services never bypass repository validation.
//! - Time-dependent rules take `now` explicitly instead of reading a clock.

pub mod appointment_service;
pub mod availability;
pub mod clinical_service;
pub mod error;
pub mod inventory_service;
pub mod invoice_service;
pub mod otp_service;
pub mod patient_service;
pub mod queue_service;
pub mod schedule_service;
pub mod user_service;
