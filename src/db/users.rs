//! User account storage.

use super::{Database, from_ms, now_ms};
use crate::error::ApiError;
use crate::types::User;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

/// Stored password material for one user.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
    pub password_salt: String,
}

fn find_credentials_internal(conn: &Connection, username: &str) -> Result<Option<UserCredentials>> {
    let creds = conn
        .query_row(
            "SELECT id, username, email, created_at, password_hash, password_salt
             FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok(UserCredentials {
                    user: User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        created_at: from_ms(row.get(3)?),
                    },
                    password_hash: row.get(4)?,
                    password_salt: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(creds)
}

impl Database {
    /// Create a user. A taken username is reported as `ALREADY_EXISTS`.
    pub fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<User> {
        let created_at = now_ms();
        self.with_conn(|conn| {
            if find_credentials_internal(conn, username)?.is_some() {
                return Err(ApiError::already_exists(&format!("User '{}'", username)).into());
            }

            conn.execute(
                "INSERT INTO users (username, email, password_hash, password_salt, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![username, email, password_hash, password_salt, created_at],
            )?;

            Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                email: email.to_string(),
                created_at: from_ms(created_at),
            })
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| Ok(find_credentials_internal(conn, username)?.map(|c| c.user)))
    }

    pub fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        self.with_conn(|conn| find_credentials_internal(conn, username))
    }
}
