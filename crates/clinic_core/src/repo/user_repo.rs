//! User and role persistence.
//!
//! # Invariants
//! - Roles are replaced as a whole set, inside the same transaction as the
//!   user row.

use super::{
    bool_column, bool_to_int, ensure_connection_ready, uuid_column, RepoError, RepoResult,
};
use crate::model::user::{Role, User, UserId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeSet;

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    full_name,
    email,
    phone,
    is_active,
    created_at
FROM users";

/// Which unique contact field collides with an existing user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserContactField {
    Username,
    Email,
    Phone,
}

#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub include_inactive: bool,
}

pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn update_user(&self, user: &User) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>>;
    /// Returns the first unique field already used by a different user.
    fn find_contact_conflict(
        &self,
        username: &str,
        email: Option<&str>,
        phone: Option<&str>,
        exclude: Option<UserId>,
    ) -> RepoResult<Option<UserContactField>>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (id, username, full_name, email, phone, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                user.id.to_string(),
                user.username.as_str(),
                user.full_name.as_str(),
                user.email.as_deref(),
                user.phone.as_deref(),
                bool_to_int(user.is_active),
                user.created_at,
            ],
        )?;
        write_roles(&tx, user.id, &user.roles)?;
        tx.commit()?;

        Ok(user.id)
    }

    fn update_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE users
             SET username = ?2, full_name = ?3, email = ?4, phone = ?5, is_active = ?6
             WHERE id = ?1;",
            params![
                user.id.to_string(),
                user.username.as_str(),
                user.full_name.as_str(),
                user.email.as_deref(),
                user.phone.as_deref(),
                bool_to_int(user.is_active),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id: user.id,
            });
        }
        tx.execute(
            "DELETE FROM user_roles WHERE user_id = ?1;",
            [user.id.to_string()],
        )?;
        write_roles(&tx, user.id, &user.roles)?;
        tx.commit()?;

        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_inactive {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(role) = query.role {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1 FROM user_roles ur
                    WHERE ur.user_id = users.id AND ur.role = ?
                )",
            );
            bind_values.push(Value::Text(role.as_str().to_string()));
        }
        sql.push_str(" ORDER BY full_name ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(self.conn, row)?);
        }
        Ok(users)
    }

    fn find_contact_conflict(
        &self,
        username: &str,
        email: Option<&str>,
        phone: Option<&str>,
        exclude: Option<UserId>,
    ) -> RepoResult<Option<UserContactField>> {
        let exclude = exclude.map(|id| id.to_string());
        let checks = [
            ("username", Some(username), UserContactField::Username),
            ("email", email, UserContactField::Email),
            ("phone", phone, UserContactField::Phone),
        ];
        for (column, value, field) in checks {
            let Some(value) = value else { continue };
            let taken: bool = self.conn.query_row(
                &format!(
                    "SELECT EXISTS(
                        SELECT 1 FROM users
                        WHERE {column} = ?1 AND (?2 IS NULL OR id <> ?2)
                    );"
                ),
                params![value, exclude.as_deref()],
                |row| row.get(0),
            )?;
            if taken {
                return Ok(Some(field));
            }
        }
        Ok(None)
    }
}

fn write_roles(conn: &Connection, user_id: UserId, roles: &BTreeSet<Role>) -> RepoResult<()> {
    let mut stmt = conn.prepare("INSERT INTO user_roles (user_id, role) VALUES (?1, ?2);")?;
    for role in roles {
        stmt.execute(params![user_id.to_string(), role.as_str()])?;
    }
    Ok(())
}

fn load_roles(conn: &Connection, user_id: &str) -> RepoResult<BTreeSet<Role>> {
    let mut stmt = conn.prepare("SELECT role FROM user_roles WHERE user_id = ?1;")?;
    let mut rows = stmt.query([user_id])?;
    let mut roles = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        let role = Role::parse(&text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid role `{text}` in user_roles.role"))
        })?;
        roles.insert(role);
    }
    Ok(roles)
}

fn parse_user_row(conn: &Connection, row: &Row<'_>) -> RepoResult<User> {
    let id = uuid_column(row, "id")?;
    let roles = load_roles(conn, &id.to_string())?;
    Ok(User {
        id,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        roles,
        is_active: bool_column(row, "is_active")?,
        created_at: row.get("created_at")?,
    })
}
