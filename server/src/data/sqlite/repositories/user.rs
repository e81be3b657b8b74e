//! User repository

use sqlx::SqlitePool;

use super::parse_column;
use crate::data::sqlite::SqliteError;
use crate::data::types::{UserRole, UserRow};

type UserTuple = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
    i64,
);

fn map_user(row: UserTuple) -> Result<UserRow, SqliteError> {
    let (id, email, password_hash, name, role, display_picture, created_at, updated_at) = row;
    Ok(UserRow {
        id,
        email,
        password_hash,
        name,
        role: parse_column::<UserRole>(&role, "users.role")?,
        display_picture,
        created_at,
        updated_at,
    })
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, display_picture, created_at, updated_at";

/// Create a new user with a generated CUID2 ID
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
    name: &str,
    role: UserRole,
) -> Result<UserRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(UserRow {
        id,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        name: name.to_string(),
        role,
        display_picture: None,
        created_at: now,
        updated_at: now,
    })
}

/// Get a user by ID
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserTuple>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(map_user).transpose()
}

/// Get a user by email (login path)
pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserTuple>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(map_user).transpose()
}

/// Fields that can change on a user profile. `None` leaves a field untouched.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub display_picture: Option<String>,
    pub password_hash: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.display_picture.is_none() && self.password_hash.is_none()
    }
}

/// Update a user's profile fields. Returns the updated row, or None if the
/// user does not exist.
pub async fn update_user(
    pool: &SqlitePool,
    id: &str,
    update: &UserUpdate,
) -> Result<Option<UserRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "UPDATE users SET
            name = COALESCE(?, name),
            display_picture = COALESCE(?, display_picture),
            password_hash = COALESCE(?, password_hash),
            updated_at = ?
         WHERE id = ?",
    )
    .bind(&update.name)
    .bind(&update.display_picture)
    .bind(&update.password_hash)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_user(pool, id).await
}

/// Delete a user. Returns false if the user did not exist.
pub async fn delete_user(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
