//! Shared row types and enum-like domain values
//!
//! Rows mirror the SQLite tables; enum columns are stored as TEXT and parsed
//! at the boundary so invalid values are rejected with a typed error instead
//! of leaking into the domain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::constants::{
    MEMBER_ROLE_ADMIN, MEMBER_ROLE_REVIEWER, USER_ROLE_REVIEWER, USER_ROLE_SUBMITTER,
};

// ============================================================================
// Platform roles
// ============================================================================

/// Platform-wide user role. A coarse capability hint, not a per-project
/// authorization source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Submitter,
    Reviewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitter => USER_ROLE_SUBMITTER,
            Self::Reviewer => USER_ROLE_REVIEWER,
        }
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            USER_ROLE_SUBMITTER => Ok(Self::Submitter),
            USER_ROLE_REVIEWER => Ok(Self::Reviewer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project-scoped member role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Reviewer,
    Admin,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reviewer => MEMBER_ROLE_REVIEWER,
            Self::Admin => MEMBER_ROLE_ADMIN,
        }
    }
}

impl FromStr for MemberRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            MEMBER_ROLE_REVIEWER => Ok(Self::Reviewer),
            MEMBER_ROLE_ADMIN => Ok(Self::Admin),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Submission workflow values
// ============================================================================

/// Submission review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    InReview,
    Approved,
    ChangesRequested,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_review" => Ok(Self::InReview),
            "approved" => Ok(Self::Approved),
            "changes_requested" => Ok(Self::ChangesRequested),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action recorded in review history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approved,
    ChangesRequested,
    ReviewStarted,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
            Self::ReviewStarted => "review_started",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Rows
// ============================================================================

/// User row from database (credential hash never leaves the data layer)
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub display_picture: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipRow {
    pub project_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub joined_at: i64,
}

/// Member with user info (for project detail listings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberWithUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub joined_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRow {
    pub id: String,
    pub project_id: String,
    pub submitter_id: String,
    pub title: String,
    pub code_content: String,
    pub file_name: Option<String>,
    pub status: SubmissionStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: String,
    pub submission_id: String,
    pub reviewer_id: String,
    pub content: String,
    pub line_number: Option<i64>,
    pub is_inline: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Comment joined with reviewer identity (for listings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithReviewer {
    #[serde(flatten)]
    pub comment: CommentRow,
    pub reviewer_name: String,
    pub reviewer_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewHistoryRow {
    pub id: String,
    pub submission_id: String,
    pub reviewer_id: String,
    pub action: String,
    pub notes: Option<String>,
    pub created_at: i64,
}

/// Review history entry joined with reviewer identity (for listings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewWithReviewer {
    #[serde(flatten)]
    pub review: ReviewHistoryRow,
    pub reviewer_name: String,
    pub reviewer_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub is_read: bool,
    pub created_at: i64,
}
