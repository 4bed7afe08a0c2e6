//! Clinic domain model.
//!
//! # Responsibility
//! - Define the records shared by repositories, services and the HTTP layer.
//! - Keep shape-level validation (`validate()`) next to each record.
//!
//! # Invariants
//! - Every record is identified by a stable v4 `Uuid`.
//! - Money is held in integer minor units, never floats.
//! - Cross-record rules (uniqueness, capacity, overlap) live in services.

pub mod appointment;
pub mod clinical;
pub mod inventory;
pub mod invoice;
pub mod patient;
pub mod queue;
pub mod schedule;
pub mod user;
pub mod validation;

/// Integer amount in the clinic's minor currency unit.
pub type Money = i64;
