//! Approver resolution.
//!
//! Given a workflow step's approver spec and the project the request is
//! scoped to, produce the set of users allowed to act, or test a single
//! user. Membership and role lookups go through [`MembershipProvider`] so
//! the dispatch is testable without a running database; the production
//! implementation is [`crate::directory::MongoDirectory`].

use mongodb::bson::oid::ObjectId;

use crate::error::Result;
use crate::models::approval_workflow::ApproverSpec;
use crate::models::user::DefaultRole;

pub trait MembershipProvider {
    /// Whether the user exists and is not soft-deleted.
    async fn is_active_user(&self, user_id: &ObjectId) -> Result<bool>;

    /// The subset of `ids` that exist and are not soft-deleted.
    async fn active_users(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>>;

    /// Active members of the project.
    async fn project_members(&self, project_id: &ObjectId) -> Result<Vec<ObjectId>>;

    async fn is_project_member(&self, project_id: &ObjectId, user_id: &ObjectId) -> Result<bool>;

    /// Active project members whose default role is exactly `role`.
    async fn members_with_role(
        &self,
        project_id: &ObjectId,
        role: DefaultRole,
    ) -> Result<Vec<ObjectId>>;

    async fn member_has_role(
        &self,
        project_id: &ObjectId,
        user_id: &ObjectId,
        role: DefaultRole,
    ) -> Result<bool>;

    /// Active users holding the custom role, where the assignment is
    /// either global or scoped to exactly this project.
    async fn users_with_custom_role(
        &self,
        custom_role_id: &ObjectId,
        project_id: &ObjectId,
    ) -> Result<Vec<ObjectId>>;

    async fn user_has_custom_role(
        &self,
        user_id: &ObjectId,
        custom_role_id: &ObjectId,
        project_id: &ObjectId,
    ) -> Result<bool>;
}

/// Enumerate every user permitted to approve a step.
pub async fn resolve_approvers(
    spec: &ApproverSpec,
    project_id: &ObjectId,
    provider: &impl MembershipProvider,
) -> Result<Vec<ObjectId>> {
    match spec {
        ApproverSpec::Users { ids } => provider.active_users(ids).await,
        ApproverSpec::Role { role } => provider.members_with_role(project_id, *role).await,
        ApproverSpec::CustomRole { custom_role_id } => {
            provider.users_with_custom_role(custom_role_id, project_id).await
        }
        ApproverSpec::Any => provider.project_members(project_id).await,
    }
}

/// Membership-test form of [`resolve_approvers`]. Must agree with the
/// enumeration for every `(spec, project, user)` triple.
pub async fn can_approve_step(
    spec: &ApproverSpec,
    project_id: &ObjectId,
    user_id: &ObjectId,
    provider: &impl MembershipProvider,
) -> Result<bool> {
    match spec {
        ApproverSpec::Users { ids } => {
            Ok(ids.contains(user_id) && provider.is_active_user(user_id).await?)
        }
        ApproverSpec::Role { role } => provider.member_has_role(project_id, user_id, *role).await,
        ApproverSpec::CustomRole { custom_role_id } => {
            provider.user_has_custom_role(user_id, custom_role_id, project_id).await
        }
        ApproverSpec::Any => provider.is_project_member(project_id, user_id).await,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct TestUser {
        role: DefaultRole,
        deleted: bool,
    }

    /// In-memory directory used to exercise the dispatch without MongoDB.
    #[derive(Default)]
    struct InMemoryDirectory {
        users: HashMap<ObjectId, TestUser>,
        members: HashMap<ObjectId, Vec<ObjectId>>,
        // (user, custom role, optional project scope)
        custom: Vec<(ObjectId, ObjectId, Option<ObjectId>)>,
    }

    impl InMemoryDirectory {
        fn add_user(&mut self, role: DefaultRole, deleted: bool) -> ObjectId {
            let id = ObjectId::new();
            self.users.insert(id, TestUser { role, deleted });
            id
        }

        fn add_member(&mut self, project_id: ObjectId, user_id: ObjectId) {
            self.members.entry(project_id).or_default().push(user_id);
        }

        fn active(&self, user_id: &ObjectId) -> bool {
            self.users.get(user_id).map(|u| !u.deleted).unwrap_or(false)
        }
    }

    impl MembershipProvider for InMemoryDirectory {
        async fn is_active_user(&self, user_id: &ObjectId) -> Result<bool> {
            Ok(self.active(user_id))
        }

        async fn active_users(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>> {
            Ok(ids.iter().copied().filter(|id| self.active(id)).collect())
        }

        async fn project_members(&self, project_id: &ObjectId) -> Result<Vec<ObjectId>> {
            Ok(self
                .members
                .get(project_id)
                .map(|m| m.iter().copied().filter(|id| self.active(id)).collect())
                .unwrap_or_default())
        }

        async fn is_project_member(
            &self,
            project_id: &ObjectId,
            user_id: &ObjectId,
        ) -> Result<bool> {
            Ok(self.project_members(project_id).await?.contains(user_id))
        }

        async fn members_with_role(
            &self,
            project_id: &ObjectId,
            role: DefaultRole,
        ) -> Result<Vec<ObjectId>> {
            Ok(self
                .project_members(project_id)
                .await?
                .into_iter()
                .filter(|id| self.users.get(id).map(|u| u.role == role).unwrap_or(false))
                .collect())
        }

        async fn member_has_role(
            &self,
            project_id: &ObjectId,
            user_id: &ObjectId,
            role: DefaultRole,
        ) -> Result<bool> {
            Ok(self.members_with_role(project_id, role).await?.contains(user_id))
        }

        async fn users_with_custom_role(
            &self,
            custom_role_id: &ObjectId,
            project_id: &ObjectId,
        ) -> Result<Vec<ObjectId>> {
            let mut users: Vec<ObjectId> = Vec::new();
            for (user_id, role_id, scope) in &self.custom {
                let in_scope = scope.is_none() || scope.as_ref() == Some(project_id);
                if role_id == custom_role_id
                    && in_scope
                    && self.active(user_id)
                    && !users.contains(user_id)
                {
                    users.push(*user_id);
                }
            }
            Ok(users)
        }

        async fn user_has_custom_role(
            &self,
            user_id: &ObjectId,
            custom_role_id: &ObjectId,
            project_id: &ObjectId,
        ) -> Result<bool> {
            Ok(self
                .users_with_custom_role(custom_role_id, project_id)
                .await?
                .contains(user_id))
        }
    }

    #[actix_web::test]
    async fn direct_user_list_excludes_soft_deleted() {
        let mut dir = InMemoryDirectory::default();
        let alive = dir.add_user(DefaultRole::Worker, false);
        let gone = dir.add_user(DefaultRole::Worker, true);
        let project = ObjectId::new();

        let spec = ApproverSpec::Users {
            ids: vec![alive, gone],
        };
        let resolved = resolve_approvers(&spec, &project, &dir).await.unwrap();
        assert_eq!(resolved, vec![alive]);
        assert!(can_approve_step(&spec, &project, &alive, &dir).await.unwrap());
        assert!(!can_approve_step(&spec, &project, &gone, &dir).await.unwrap());
    }

    #[actix_web::test]
    async fn role_resolution_is_role_match_intersect_membership() {
        let mut dir = InMemoryDirectory::default();
        let project = ObjectId::new();
        let member_foreman = dir.add_user(DefaultRole::Foreman, false);
        let member_worker = dir.add_user(DefaultRole::Worker, false);
        let outside_foreman = dir.add_user(DefaultRole::Foreman, false);
        dir.add_member(project, member_foreman);
        dir.add_member(project, member_worker);

        let spec = ApproverSpec::Role {
            role: DefaultRole::Foreman,
        };
        let resolved = resolve_approvers(&spec, &project, &dir).await.unwrap();
        assert_eq!(resolved, vec![member_foreman]);

        let members = dir.project_members(&project).await.unwrap();
        for id in &resolved {
            assert!(members.contains(id));
        }
        assert!(!resolved.contains(&outside_foreman));
    }

    #[actix_web::test]
    async fn role_match_is_exact_with_no_hierarchy() {
        let mut dir = InMemoryDirectory::default();
        let project = ObjectId::new();
        let owner = dir.add_user(DefaultRole::Owner, false);
        dir.add_member(project, owner);

        let spec = ApproverSpec::Role {
            role: DefaultRole::Foreman,
        };
        assert!(resolve_approvers(&spec, &project, &dir).await.unwrap().is_empty());
        assert!(!can_approve_step(&spec, &project, &owner, &dir).await.unwrap());
    }

    #[actix_web::test]
    async fn custom_role_accepts_global_and_exact_project_scope() {
        let mut dir = InMemoryDirectory::default();
        let project = ObjectId::new();
        let other_project = ObjectId::new();
        let role_id = ObjectId::new();
        let global = dir.add_user(DefaultRole::Worker, false);
        let scoped = dir.add_user(DefaultRole::Worker, false);
        let elsewhere = dir.add_user(DefaultRole::Worker, false);
        dir.custom.push((global, role_id, None));
        dir.custom.push((scoped, role_id, Some(project)));
        dir.custom.push((elsewhere, role_id, Some(other_project)));

        let spec = ApproverSpec::CustomRole {
            custom_role_id: role_id,
        };
        let resolved = resolve_approvers(&spec, &project, &dir).await.unwrap();
        assert!(resolved.contains(&global));
        assert!(resolved.contains(&scoped));
        assert!(!resolved.contains(&elsewhere));
    }

    #[actix_web::test]
    async fn any_member_resolves_the_whole_project() {
        let mut dir = InMemoryDirectory::default();
        let project = ObjectId::new();
        let a = dir.add_user(DefaultRole::Worker, false);
        let b = dir.add_user(DefaultRole::Foreman, false);
        let stranger = dir.add_user(DefaultRole::Worker, false);
        dir.add_member(project, a);
        dir.add_member(project, b);

        let resolved = resolve_approvers(&ApproverSpec::Any, &project, &dir).await.unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(!can_approve_step(&ApproverSpec::Any, &project, &stranger, &dir)
            .await
            .unwrap());
    }

    #[actix_web::test]
    async fn membership_test_agrees_with_enumeration() {
        let mut dir = InMemoryDirectory::default();
        let project = ObjectId::new();
        let role_id = ObjectId::new();
        let foreman = dir.add_user(DefaultRole::Foreman, false);
        let worker = dir.add_user(DefaultRole::Worker, false);
        let deleted = dir.add_user(DefaultRole::Foreman, true);
        let outsider = dir.add_user(DefaultRole::Foreman, false);
        dir.add_member(project, foreman);
        dir.add_member(project, worker);
        dir.add_member(project, deleted);
        dir.custom.push((worker, role_id, Some(project)));
        dir.custom.push((outsider, role_id, None));

        let specs = [
            ApproverSpec::Users {
                ids: vec![foreman, deleted, outsider],
            },
            ApproverSpec::Role {
                role: DefaultRole::Foreman,
            },
            ApproverSpec::CustomRole {
                custom_role_id: role_id,
            },
            ApproverSpec::Any,
        ];
        let users = [foreman, worker, deleted, outsider];

        for spec in &specs {
            let resolved = resolve_approvers(spec, &project, &dir).await.unwrap();
            for user in &users {
                let allowed = can_approve_step(spec, &project, user, &dir).await.unwrap();
                assert_eq!(allowed, resolved.contains(user), "spec {spec:?} user {user}");
            }
        }
    }
}
