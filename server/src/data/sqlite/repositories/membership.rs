//! Project membership repository

use sqlx::SqlitePool;

use super::parse_column;
use crate::data::sqlite::SqliteError;
use crate::data::types::{MemberRole, MemberWithUser, MembershipRow};

/// Add a member to a project. Fails with a unique violation if the (project,
/// user) pair already has a row.
pub async fn add_member(
    pool: &SqlitePool,
    project_id: &str,
    user_id: &str,
    role: MemberRole,
) -> Result<MembershipRow, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(user_id)
    .bind(role.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(MembershipRow {
        project_id: project_id.to_string(),
        user_id: user_id.to_string(),
        role,
        joined_at: now,
    })
}

/// Remove a member from a project. Returns false if no row existed.
pub async fn remove_member(
    pool: &SqlitePool,
    project_id: &str,
    user_id: &str,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Get a membership row for a (project, user) pair
pub async fn get_membership(
    pool: &SqlitePool,
    project_id: &str,
    user_id: &str,
) -> Result<Option<MembershipRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, i64)>(
        "SELECT role, joined_at FROM project_members WHERE project_id = ? AND user_id = ?",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(|(role, joined_at)| {
        Ok(MembershipRow {
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            role: parse_column::<MemberRole>(&role, "project_members.role")?,
            joined_at,
        })
    })
    .transpose()
}

/// List members of a project joined with user identity
pub async fn list_members(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<MemberWithUser>, SqliteError> {
    let rows = sqlx::query_as::<_, (String, String, String, String, i64)>(
        "SELECT pm.user_id, u.name, u.email, pm.role, pm.joined_at
         FROM project_members pm
         JOIN users u ON pm.user_id = u.id
         WHERE pm.project_id = ?
         ORDER BY pm.joined_at ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(user_id, name, email, role, joined_at)| {
            Ok(MemberWithUser {
                user_id,
                name,
                email,
                role: parse_column::<MemberRole>(&role, "project_members.role")?,
                joined_at,
            })
        })
        .collect()
}

/// Resolve the broadcast recipient set for a project: the owner plus all
/// current members, deduplicated. Recomputed on every call so membership
/// changes take effect immediately.
pub async fn list_recipient_user_ids(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<String>, SqliteError> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT DISTINCT user_id FROM project_members WHERE project_id = ?
         UNION
         SELECT owner_id AS user_id FROM projects WHERE id = ?",
    )
    .bind(project_id)
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
