use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use fleetgate_core::domain::user::{Role, User, UserId};

use super::{
    decode_err, map_unique_violation, NewUser, RepositoryError, UserCredentials, UserRepository,
};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    let role: String = row.try_get("role").map_err(decode_err)?;

    Ok(User {
        id: UserId(row.try_get("id").map_err(decode_err)?),
        username: row.try_get("username").map_err(decode_err)?,
        name: row.try_get("name").map_err(decode_err)?,
        role: role.parse::<Role>().map_err(|error| RepositoryError::Decode(error.to_string()))?,
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, name, role FROM users WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, name, role, password_hash FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(UserCredentials {
                user: row_to_user(row)?,
                password_hash: row.try_get("password_hash").map_err(decode_err)?,
            })),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query("SELECT id, username, name, role FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        let rows =
            sqlx::query("SELECT id, username, name, role FROM users WHERE role = ? ORDER BY id")
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (username, name, role, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_violation(error, &format!("username `{}`", user.username)))?;

        Ok(User {
            id: UserId(result.last_insert_rowid()),
            username: user.username,
            name: user.name,
            role: user.role,
        })
    }
}
