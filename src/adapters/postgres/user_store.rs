use crate::domain::user::{NewUser, User};
use crate::domain::value_objects::{Role, UserId};
use crate::ports::user_store::{Result, UserRecord, UserStore as UserStoreTrait, UserStoreError};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

const USERNAME_UNIQUE_CONSTRAINT: &str = "users_username_key";

fn backend(e: sqlx::Error) -> UserStoreError {
    UserStoreError::Backend(Box::new(e))
}

fn invalid_data(message: String) -> UserStoreError {
    UserStoreError::Backend(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

fn map_row_to_user(row: &PgRow) -> Result<User> {
    let role: &str = row.get("role");
    let role =
        Role::from_str(role).map_err(|e| invalid_data(format!("invalid role in row: {}", e)))?;

    Ok(User {
        id: UserId::new(row.get("id")),
        username: row.get("username"),
        name: row.get("name"),
        role,
    })
}

/// PostgreSQL implementation of UserStore
#[allow(dead_code)]
pub struct UserStore {
    pool: PgPool,
}

#[allow(dead_code)]
impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStoreTrait for UserStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some(USERNAME_UNIQUE_CONSTRAINT) => {
                UserStoreError::DuplicateUsername
            }
            _ => backend(e),
        })?;

        Ok(User {
            id: UserId::new(row.get("id")),
            username: user.username,
            name: user.name,
            role: user.role,
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, name, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|row| {
            let user = map_row_to_user(&row)?;
            Ok(UserRecord {
                user,
                password_hash: row.get("password_hash"),
            })
        })
        .transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, name, role FROM users WHERE id = $1")
            .bind(user_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(map_row_to_user).transpose()
    }
}
