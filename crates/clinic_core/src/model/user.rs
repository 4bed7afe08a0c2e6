//! Staff and portal users.
//!
//! # Invariants
//! - `username` is unique and non-blank.
//! - Every user carries at least one `Role`.
//! - `email` and `phone`, when present, are unique across users.

use super::validation::{require_email, require_phone, require_text, ValidationError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type UserId = Uuid;

/// Access role held by a user. A user may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Receptionist,
    Doctor,
    Technician,
    Patient,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Receptionist => "receptionist",
            Self::Doctor => "doctor",
            Self::Technician => "technician",
            Self::Patient => "patient",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "receptionist" => Some(Self::Receptionist),
            "doctor" => Some(Self::Doctor),
            "technician" => Some(Self::Technician),
            "patient" => Some(Self::Patient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub roles: BTreeSet<Role>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Creates an active user with a fresh id.
    pub fn new(
        username: impl Into<String>,
        full_name: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            full_name: full_name.into(),
            email: None,
            phone: None,
            roles: roles.into_iter().collect(),
            is_active: true,
            created_at,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("username", &self.username)?;
        require_text("full_name", &self.full_name)?;
        if self.roles.is_empty() {
            return Err(ValidationError::Empty("roles"));
        }
        if let Some(email) = &self.email {
            require_email("email", email)?;
        }
        if let Some(phone) = &self.phone {
            require_phone("phone", phone)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, User};
    use chrono::NaiveDate;

    fn created_at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn role_text_round_trips() {
        for role in [
            Role::Admin,
            Role::Receptionist,
            Role::Doctor,
            Role::Technician,
            Role::Patient,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("nurse"), None);
    }

    #[test]
    fn user_without_roles_is_invalid() {
        let user = User::new("dr.lan", "Lan Nguyen", [], created_at());
        assert!(user.validate().is_err());

        let doctor = User::new("dr.lan", "Lan Nguyen", [Role::Doctor], created_at());
        assert!(doctor.validate().is_ok());
        assert!(doctor.has_role(Role::Doctor));
        assert!(!doctor.has_role(Role::Admin));
    }
}
