//! Access control evaluator
//!
//! Pure decision logic over a facts snapshot resolved by the data layer
//! (`repositories::access`). Every decision is re-derived per call; nothing
//! here touches the store or caches results.
//!
//! Denials distinguish a missing entity from an existing entity the caller
//! cannot touch, so the API layer can answer 404 vs 403 without leaking the
//! existence of resources the caller could not address.

use crate::data::types::{MemberRole, UserRole};

/// The authenticated caller, as extracted from a verified session token
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
}

impl Caller {
    /// Platform-wide reviewer capability, independent of project membership
    pub fn is_reviewer(&self) -> bool {
        self.role == UserRole::Reviewer
    }
}

/// Facts about a project relative to one caller: who owns it and which
/// membership role (if any) the caller holds.
#[derive(Debug, Clone)]
pub struct ProjectFacts {
    pub owner_id: String,
    pub member_role: Option<MemberRole>,
}

impl ProjectFacts {
    pub fn is_owner(&self, caller: &Caller) -> bool {
        self.owner_id == caller.user_id
    }

    pub fn is_member(&self) -> bool {
        self.member_role.is_some()
    }

    pub fn is_admin_member(&self) -> bool {
        self.member_role == Some(MemberRole::Admin)
    }

    /// Owner or member: the baseline for seeing project-scoped resources
    pub fn can_view(&self, caller: &Caller) -> bool {
        self.is_owner(caller) || self.is_member()
    }
}

/// Facts about a submission relative to one caller
#[derive(Debug, Clone)]
pub struct SubmissionFacts {
    pub project_id: String,
    pub submitter_id: String,
    pub project: ProjectFacts,
}

/// Facts about a comment relative to one caller
#[derive(Debug, Clone)]
pub struct CommentFacts {
    pub author_id: String,
    pub project_id: String,
    pub project: ProjectFacts,
}

/// Structured denial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The caller lacks rights to an entity they can address
    Forbidden(&'static str),
}

pub type Decision = Result<(), Denial>;

fn deny(reason: &'static str) -> Decision {
    Err(Denial::Forbidden(reason))
}

// ============================================================================
// Action-level rules (one function per row of the decision table)
// ============================================================================

/// Create a submission: project owner or member
pub fn can_create_submission(facts: &ProjectFacts, caller: &Caller) -> Decision {
    if facts.can_view(caller) {
        Ok(())
    } else {
        deny("Not authorized to create submissions for this project")
    }
}

/// View or list submissions, project detail, stats: owner or member
pub fn can_view_project(facts: &ProjectFacts, caller: &Caller) -> Decision {
    if facts.can_view(caller) {
        Ok(())
    } else {
        deny("Not authorized to view this project")
    }
}

/// Update submission status: owner, admin member, or reviewer member
pub fn can_update_status(facts: &SubmissionFacts, caller: &Caller) -> Decision {
    let p = &facts.project;
    if p.is_owner(caller) || p.is_admin_member() || (p.is_member() && caller.is_reviewer()) {
        Ok(())
    } else {
        deny("Only reviewers, admins, or the project owner can update status")
    }
}

/// Delete a submission: submitter, owner, or admin member
pub fn can_delete_submission(facts: &SubmissionFacts, caller: &Caller) -> Decision {
    if facts.submitter_id == caller.user_id
        || facts.project.is_owner(caller)
        || facts.project.is_admin_member()
    {
        Ok(())
    } else {
        deny("Only the submitter, project owner, or a project admin can delete this submission")
    }
}

/// Add a comment: platform reviewer AND (owner or member)
pub fn can_comment(facts: &SubmissionFacts, caller: &Caller) -> Decision {
    if !caller.is_reviewer() {
        return deny("Only reviewers can add comments");
    }
    if facts.project.can_view(caller) {
        Ok(())
    } else {
        deny("Not authorized to comment on this submission")
    }
}

/// View comments or review history: owner, member, or the original submitter
pub fn can_view_review_data(facts: &SubmissionFacts, caller: &Caller) -> Decision {
    if facts.project.can_view(caller) || facts.submitter_id == caller.user_id {
        Ok(())
    } else {
        deny("Not authorized to view review data for this submission")
    }
}

/// Update a comment: author only
pub fn can_update_comment(facts: &CommentFacts, caller: &Caller) -> Decision {
    if facts.author_id == caller.user_id {
        Ok(())
    } else {
        deny("Only the author can update this comment")
    }
}

/// Delete a comment: author or project owner
pub fn can_delete_comment(facts: &CommentFacts, caller: &Caller) -> Decision {
    if facts.author_id == caller.user_id || facts.project.is_owner(caller) {
        Ok(())
    } else {
        deny("Only the author or the project owner can delete this comment")
    }
}

/// Approve or request changes: platform reviewer AND (owner or member)
pub fn can_review(facts: &SubmissionFacts, caller: &Caller) -> Decision {
    if !caller.is_reviewer() {
        return deny("Only reviewers can review submissions");
    }
    if facts.project.can_view(caller) {
        Ok(())
    } else {
        deny("Not authorized to review this submission")
    }
}

/// Add or remove project members: owner or admin member
pub fn can_manage_members(facts: &ProjectFacts, caller: &Caller) -> Decision {
    if facts.is_owner(caller) || facts.is_admin_member() {
        Ok(())
    } else {
        deny("Not authorized to manage members of this project")
    }
}

/// View a user profile: self, or any platform reviewer (read-only exception)
pub fn can_view_profile(target_user_id: &str, caller: &Caller) -> Decision {
    if caller.user_id == target_user_id || caller.is_reviewer() {
        Ok(())
    } else {
        deny("Not authorized to view this profile")
    }
}

/// View notifications: strict identity match, no override
pub fn can_view_notifications(target_user_id: &str, caller: &Caller) -> Decision {
    if caller.user_id == target_user_id {
        Ok(())
    } else {
        deny("Not authorized to view these notifications")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: &str, role: UserRole) -> Caller {
        Caller {
            user_id: id.to_string(),
            email: format!("{id}@example.com"),
            role,
        }
    }

    fn facts(owner: &str, member_role: Option<MemberRole>) -> ProjectFacts {
        ProjectFacts {
            owner_id: owner.to_string(),
            member_role,
        }
    }

    fn sub_facts(owner: &str, submitter: &str, member_role: Option<MemberRole>) -> SubmissionFacts {
        SubmissionFacts {
            project_id: "p1".to_string(),
            submitter_id: submitter.to_string(),
            project: facts(owner, member_role),
        }
    }

    #[test]
    fn owner_can_view_without_membership_row() {
        let owner = caller("o", UserRole::Submitter);
        assert!(can_view_project(&facts("o", None), &owner).is_ok());
    }

    #[test]
    fn non_member_cannot_view_project() {
        let outsider = caller("x", UserRole::Reviewer);
        assert!(can_view_project(&facts("o", None), &outsider).is_err());
    }

    #[test]
    fn member_can_create_submission() {
        let member = caller("m", UserRole::Submitter);
        assert!(can_create_submission(&facts("o", Some(MemberRole::Reviewer)), &member).is_ok());
    }

    #[test]
    fn status_update_requires_role() {
        // Owner: allowed regardless of platform role
        let owner = caller("o", UserRole::Submitter);
        assert!(can_update_status(&sub_facts("o", "s", None), &owner).is_ok());

        // Admin member: allowed even without the reviewer platform role
        let admin = caller("a", UserRole::Submitter);
        assert!(can_update_status(&sub_facts("o", "s", Some(MemberRole::Admin)), &admin).is_ok());

        // Reviewer member: allowed
        let reviewer = caller("r", UserRole::Reviewer);
        assert!(
            can_update_status(&sub_facts("o", "s", Some(MemberRole::Reviewer)), &reviewer).is_ok()
        );

        // Plain member without reviewer role: denied
        let plain = caller("m", UserRole::Submitter);
        assert!(
            can_update_status(&sub_facts("o", "s", Some(MemberRole::Reviewer)), &plain).is_err()
        );
    }

    #[test]
    fn submitter_can_delete_own_submission() {
        let submitter = caller("s", UserRole::Submitter);
        assert!(can_delete_submission(&sub_facts("o", "s", None), &submitter).is_ok());

        let outsider = caller("x", UserRole::Reviewer);
        assert!(can_delete_submission(&sub_facts("o", "s", None), &outsider).is_err());
    }

    #[test]
    fn admin_member_cannot_comment_without_reviewer_role() {
        // Project admin, but platform role is submitter: comments denied
        let admin = caller("a", UserRole::Submitter);
        assert!(can_comment(&sub_facts("o", "s", Some(MemberRole::Admin)), &admin).is_err());

        let reviewer = caller("r", UserRole::Reviewer);
        assert!(can_comment(&sub_facts("o", "s", Some(MemberRole::Reviewer)), &reviewer).is_ok());
    }

    #[test]
    fn submitter_can_view_review_data_without_membership() {
        let submitter = caller("s", UserRole::Submitter);
        assert!(can_view_review_data(&sub_facts("o", "s", None), &submitter).is_ok());
    }

    #[test]
    fn review_requires_reviewer_role_and_project_access() {
        // Reviewer who is neither owner nor member: denied
        let reviewer = caller("r", UserRole::Reviewer);
        assert!(can_review(&sub_facts("o", "s", None), &reviewer).is_err());

        // Reviewer member: allowed
        assert!(can_review(&sub_facts("o", "s", Some(MemberRole::Reviewer)), &reviewer).is_ok());

        // Member without the platform role: denied
        let member = caller("m", UserRole::Submitter);
        assert!(can_review(&sub_facts("o", "s", Some(MemberRole::Reviewer)), &member).is_err());
    }

    #[test]
    fn comment_mutation_rules() {
        let author = caller("a", UserRole::Reviewer);
        let owner = caller("o", UserRole::Submitter);
        let outsider = caller("x", UserRole::Reviewer);
        let comment = CommentFacts {
            author_id: "a".to_string(),
            project_id: "p1".to_string(),
            project: facts("o", None),
        };

        assert!(can_update_comment(&comment, &author).is_ok());
        assert!(can_update_comment(&comment, &owner).is_err());

        assert!(can_delete_comment(&comment, &author).is_ok());
        assert!(can_delete_comment(&comment, &owner).is_ok());
        assert!(can_delete_comment(&comment, &outsider).is_err());
    }

    #[test]
    fn member_management_requires_owner_or_admin() {
        let owner = caller("o", UserRole::Submitter);
        let admin = caller("a", UserRole::Submitter);
        let member = caller("m", UserRole::Reviewer);

        assert!(can_manage_members(&facts("o", None), &owner).is_ok());
        assert!(can_manage_members(&facts("o", Some(MemberRole::Admin)), &admin).is_ok());
        assert!(can_manage_members(&facts("o", Some(MemberRole::Reviewer)), &member).is_err());
    }

    #[test]
    fn notifications_are_strictly_private() {
        let user = caller("u", UserRole::Reviewer);
        assert!(can_view_notifications("u", &user).is_ok());
        // Reviewer exception does not apply here
        assert!(can_view_notifications("other", &user).is_err());
    }

    #[test]
    fn profile_view_allows_reviewer_exception() {
        let reviewer = caller("r", UserRole::Reviewer);
        let submitter = caller("s", UserRole::Submitter);
        assert!(can_view_profile("other", &reviewer).is_ok());
        assert!(can_view_profile("other", &submitter).is_err());
        assert!(can_view_profile("s", &submitter).is_ok());
    }
}
