//! Batched authorization fact lookups
//!
//! Each action needs the same handful of facts: does the target exist, who
//! owns the project, what membership role (if any) does the caller hold, who
//! authored the entity. These queries resolve all of them in one round trip;
//! the pure decision logic lives in `domain::access`. Results are never
//! cached — membership can change between calls.

use sqlx::SqlitePool;

use super::parse_column;
use crate::data::sqlite::SqliteError;
use crate::data::types::MemberRole;
use crate::domain::access::{CommentFacts, ProjectFacts, SubmissionFacts};

fn parse_member_role(role: Option<String>) -> Result<Option<MemberRole>, SqliteError> {
    role.map(|r| parse_column::<MemberRole>(&r, "project_members.role"))
        .transpose()
}

/// Facts about a project relative to a caller. None if the project does not
/// exist.
pub async fn project_facts(
    pool: &SqlitePool,
    project_id: &str,
    caller_id: &str,
) -> Result<Option<ProjectFacts>, SqliteError> {
    let row = sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT p.owner_id, pm.role
         FROM projects p
         LEFT JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = ?
         WHERE p.id = ?",
    )
    .bind(caller_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    row.map(|(owner_id, role)| {
        Ok(ProjectFacts {
            owner_id,
            member_role: parse_member_role(role)?,
        })
    })
    .transpose()
}

/// Facts about a submission relative to a caller. None if the submission
/// does not exist (a missing parent project cannot happen under foreign
/// keys).
pub async fn submission_facts(
    pool: &SqlitePool,
    submission_id: &str,
    caller_id: &str,
) -> Result<Option<SubmissionFacts>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, String, Option<String>)>(
        "SELECT s.project_id, s.submitter_id, p.owner_id, pm.role
         FROM submissions s
         JOIN projects p ON s.project_id = p.id
         LEFT JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = ?
         WHERE s.id = ?",
    )
    .bind(caller_id)
    .bind(submission_id)
    .fetch_optional(pool)
    .await?;

    row.map(|(project_id, submitter_id, owner_id, role)| {
        Ok(SubmissionFacts {
            project_id,
            submitter_id,
            project: ProjectFacts {
                owner_id,
                member_role: parse_member_role(role)?,
            },
        })
    })
    .transpose()
}

/// Facts about a comment relative to a caller. None if the comment does not
/// exist.
pub async fn comment_facts(
    pool: &SqlitePool,
    comment_id: &str,
    caller_id: &str,
) -> Result<Option<CommentFacts>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, String, Option<String>)>(
        "SELECT c.reviewer_id, s.project_id, p.owner_id, pm.role
         FROM comments c
         JOIN submissions s ON c.submission_id = s.id
         JOIN projects p ON s.project_id = p.id
         LEFT JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = ?
         WHERE c.id = ?",
    )
    .bind(caller_id)
    .bind(comment_id)
    .fetch_optional(pool)
    .await?;

    row.map(|(author_id, project_id, owner_id, role)| {
        Ok(CommentFacts {
            author_id,
            project_id,
            project: ProjectFacts {
                owner_id,
                member_role: parse_member_role(role)?,
            },
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::membership::add_member;
    use crate::data::sqlite::repositories::project::create_project;
    use crate::data::sqlite::repositories::submission::create_submission;
    use crate::data::sqlite::repositories::user::create_user;
    use crate::data::types::UserRole;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, email: &str) -> String {
        create_user(pool, email, "hash", "User", UserRole::Reviewer)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_project_facts_resolution() {
        let pool = setup_test_pool().await;
        let owner = seed_user(&pool, "o@example.com").await;
        let member = seed_user(&pool, "m@example.com").await;
        let outsider = seed_user(&pool, "x@example.com").await;
        let project = create_project(&pool, "Core", None, &owner).await.unwrap();
        add_member(&pool, &project.id, &member, MemberRole::Reviewer)
            .await
            .unwrap();

        let facts = project_facts(&pool, &project.id, &member)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(facts.owner_id, owner);
        assert_eq!(facts.member_role, Some(MemberRole::Reviewer));

        let facts = project_facts(&pool, &project.id, &outsider)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(facts.member_role, None);

        assert!(project_facts(&pool, "missing", &owner)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_submission_facts_resolution() {
        let pool = setup_test_pool().await;
        let owner = seed_user(&pool, "o@example.com").await;
        let submitter = seed_user(&pool, "s@example.com").await;
        let project = create_project(&pool, "Core", None, &owner).await.unwrap();
        add_member(&pool, &project.id, &submitter, MemberRole::Reviewer)
            .await
            .unwrap();
        let sub = create_submission(&pool, &project.id, &submitter, "Fix", "code", None)
            .await
            .unwrap();

        let facts = submission_facts(&pool, &sub.id, &submitter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(facts.submitter_id, submitter);
        assert_eq!(facts.project.owner_id, owner);
        assert_eq!(facts.project.member_role, Some(MemberRole::Reviewer));
        assert_eq!(facts.project_id, project.id);
    }
}
