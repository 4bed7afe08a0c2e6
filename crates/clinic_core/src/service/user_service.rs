//! Staff and portal user administration.

use super::error::{ServiceError, ServiceResult};
use crate::model::user::{Role, User, UserId};
use crate::model::validation::{normalize_email, normalize_phone};
use crate::repo::user_repo::{UserContactField, UserListQuery, UserRepository};
use chrono::NaiveDateTime;
use log::info;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub roles: Vec<Role>,
}

pub struct UserService<U: UserRepository> {
    repo: U,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(repo: U) -> Self {
        Self { repo }
    }

    pub fn create(&self, request: &CreateUserRequest, now: NaiveDateTime) -> ServiceResult<User> {
        let mut user = User::new(
            request.username.trim().to_ascii_lowercase(),
            request.full_name.trim(),
            request.roles.iter().copied(),
            now,
        );
        user.email = normalize_email(request.email.as_deref());
        user.phone = request
            .phone
            .as_deref()
            .map(normalize_phone)
            .filter(|phone| !phone.is_empty());
        user.validate()?;
        self.ensure_unique(&user)?;

        self.repo.create_user(&user)?;
        info!(
            "event=user_create module=user status=ok user_id={} roles={}",
            user.id,
            role_list(&user.roles)
        );
        Ok(user)
    }

    pub fn get(&self, id: UserId) -> ServiceResult<User> {
        self.repo
            .get_user(id)?
            .ok_or(ServiceError::NotFound { entity: "user", id })
    }

    pub fn list(&self, role: Option<Role>, include_inactive: bool) -> ServiceResult<Vec<User>> {
        Ok(self.repo.list_users(&UserListQuery {
            role,
            include_inactive,
        })?)
    }

    /// Replaces the whole role set of a user.
    pub fn set_roles(&self, id: UserId, roles: &[Role]) -> ServiceResult<User> {
        let mut user = self.get(id)?;
        user.roles = roles.iter().copied().collect();
        user.validate()?;
        self.repo.update_user(&user)?;
        info!(
            "event=user_roles module=user status=ok user_id={id} roles={}",
            role_list(&user.roles)
        );
        Ok(user)
    }

    pub fn deactivate(&self, id: UserId) -> ServiceResult<User> {
        let mut user = self.get(id)?;
        user.is_active = false;
        self.repo.update_user(&user)?;
        info!("event=user_deactivate module=user status=ok user_id={id}");
        Ok(user)
    }

    fn ensure_unique(&self, user: &User) -> ServiceResult<()> {
        let conflict = self.repo.find_contact_conflict(
            &user.username,
            user.email.as_deref(),
            user.phone.as_deref(),
            Some(user.id),
        )?;
        match conflict {
            None => Ok(()),
            Some(UserContactField::Username) => Err(ServiceError::Conflict(format!(
                "username `{}` is already taken",
                user.username
            ))),
            Some(UserContactField::Email) => Err(ServiceError::Conflict(
                "email is already registered to another user".to_string(),
            )),
            Some(UserContactField::Phone) => Err(ServiceError::Conflict(
                "phone is already registered to another user".to_string(),
            )),
        }
    }
}

fn role_list(roles: &BTreeSet<Role>) -> String {
    roles
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
