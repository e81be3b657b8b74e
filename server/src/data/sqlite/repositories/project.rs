//! Project repository

use sqlx::SqlitePool;

use crate::core::constants::MEMBER_ROLE_ADMIN;
use crate::data::sqlite::SqliteError;
use crate::data::types::ProjectRow;

type ProjectTuple = (String, String, Option<String>, String, i64, i64);

fn map_project(row: ProjectTuple) -> ProjectRow {
    let (id, name, description, owner_id, created_at, updated_at) = row;
    ProjectRow {
        id,
        name,
        description,
        owner_id,
        created_at,
        updated_at,
    }
}

/// Create a new project. The owner also gets an admin membership row so the
/// member list always includes them, even though authorization treats
/// ownership as admin-equivalent without one.
pub async fn create_project(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
    owner_id: &str,
) -> Result<ProjectRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO projects (id, name, description, owner_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(description)
    .bind(owner_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(owner_id)
    .bind(MEMBER_ROLE_ADMIN)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ProjectRow {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
        owner_id: owner_id.to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Get a project by ID
pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Option<ProjectRow>, SqliteError> {
    let row = sqlx::query_as::<_, ProjectTuple>(
        "SELECT id, name, description, owner_id, created_at, updated_at FROM projects WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_project))
}

/// List projects the user owns or is a member of, newest first
pub async fn list_projects_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<ProjectRow>, SqliteError> {
    let rows = sqlx::query_as::<_, ProjectTuple>(
        "SELECT DISTINCT p.id, p.name, p.description, p.owner_id, p.created_at, p.updated_at
         FROM projects p
         LEFT JOIN project_members pm ON p.id = pm.project_id
         WHERE p.owner_id = ? OR pm.user_id = ?
         ORDER BY p.created_at DESC",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(map_project).collect())
}
