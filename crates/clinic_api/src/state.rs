//! Shared handler state.
//!
//! # Invariants
//! - The connection is locked for exactly one use-case call; the guard is
//!   never held across an `.await`.
//! - Handlers read "now" from the injected clock only.

use clinic_core::model::Money;
use clinic_core::service::otp_service::{LogOnlyDelivery, OtpDelivery, OtpService};
use clinic_core::{Clock, ServiceResult, SystemClock};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub const DEFAULT_CONSULTATION_FEE: Money = 150_000;

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
    otp: Arc<OtpService<Arc<dyn OtpDelivery>>>,
    consultation_fee: Money,
}

impl AppState {
    /// State over a migrated connection, using the system clock and
    /// log-only OTP delivery.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(SystemClock),
            otp: Arc::new(OtpService::new(Arc::new(LogOnlyDelivery))),
            consultation_fee: DEFAULT_CONSULTATION_FEE,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_otp_delivery(mut self, delivery: Arc<dyn OtpDelivery>) -> Self {
        self.otp = Arc::new(OtpService::new(delivery));
        self
    }

    pub fn with_consultation_fee(mut self, fee: Money) -> Self {
        self.consultation_fee = fee;
        self
    }

    pub fn now(&self) -> chrono::NaiveDateTime {
        self.clock.now()
    }

    pub fn consultation_fee(&self) -> Money {
        self.consultation_fee
    }

    pub fn otp(&self) -> &OtpService<Arc<dyn OtpDelivery>> {
        &self.otp
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        // Open transactions roll back on unwind, so a poisoned guard is safe.
        let guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&guard)
    }
}
