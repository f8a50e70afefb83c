//! Production membership lookups for approver resolution.

use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};

use crate::approval::resolver::MembershipProvider;
use crate::database::get_db;
use crate::error::{Error, Result};
use crate::models::custom_role::CustomRoleAssignment;
use crate::models::project::Project;
use crate::models::user::{DefaultRole, User};

pub struct MongoDirectory;

impl MongoDirectory {
    async fn project(&self, project_id: &ObjectId) -> Result<Project> {
        Project::find_by_id(project_id)
            .await?
            .ok_or(Error::NotFound("PROJECT_NOT_FOUND"))
    }
}

impl MembershipProvider for MongoDirectory {
    async fn is_active_user(&self, user_id: &ObjectId) -> Result<bool> {
        Ok(User::find_by_id(user_id)
            .await?
            .map(|user| !user.deleted)
            .unwrap_or(false))
    }

    async fn active_users(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = doc! { "_id": { "$in": ids.to_vec() }, "deleted": false };
        let mut cursor = get_db()
            .collection::<User>("users")
            .find(filter, None)
            .await
            .map_err(|_| Error::Database("USER_LOOKUP_FAILED"))?;

        let mut users: Vec<ObjectId> = Vec::new();
        while let Some(Ok(user)) = cursor.next().await {
            if let Some(_id) = user._id {
                users.push(_id);
            }
        }
        Ok(users)
    }

    async fn project_members(&self, project_id: &ObjectId) -> Result<Vec<ObjectId>> {
        let project = self.project(project_id).await?;
        self.active_users(&project.member_ids()).await
    }

    async fn is_project_member(&self, project_id: &ObjectId, user_id: &ObjectId) -> Result<bool> {
        let project = self.project(project_id).await?;
        Ok(project.member_ids().contains(user_id) && self.is_active_user(user_id).await?)
    }

    async fn members_with_role(
        &self,
        project_id: &ObjectId,
        role: DefaultRole,
    ) -> Result<Vec<ObjectId>> {
        let project = self.project(project_id).await?;
        let member_ids = project.member_ids();
        if member_ids.is_empty() {
            return Ok(Vec::new());
        }

        let role = to_bson(&role).map_err(|_| Error::Database("USER_LOOKUP_FAILED"))?;
        let filter = doc! {
            "_id": { "$in": member_ids },
            "default_role": role,
            "deleted": false,
        };
        let mut cursor = get_db()
            .collection::<User>("users")
            .find(filter, None)
            .await
            .map_err(|_| Error::Database("USER_LOOKUP_FAILED"))?;

        let mut users: Vec<ObjectId> = Vec::new();
        while let Some(Ok(user)) = cursor.next().await {
            if let Some(_id) = user._id {
                users.push(_id);
            }
        }
        Ok(users)
    }

    async fn member_has_role(
        &self,
        project_id: &ObjectId,
        user_id: &ObjectId,
        role: DefaultRole,
    ) -> Result<bool> {
        let project = self.project(project_id).await?;
        if !project.member_ids().contains(user_id) {
            return Ok(false);
        }
        Ok(User::find_by_id(user_id)
            .await?
            .map(|user| !user.deleted && user.default_role == role)
            .unwrap_or(false))
    }

    async fn users_with_custom_role(
        &self,
        custom_role_id: &ObjectId,
        project_id: &ObjectId,
    ) -> Result<Vec<ObjectId>> {
        let holders = CustomRoleAssignment::holders(custom_role_id, project_id).await?;
        self.active_users(&holders).await
    }

    async fn user_has_custom_role(
        &self,
        user_id: &ObjectId,
        custom_role_id: &ObjectId,
        project_id: &ObjectId,
    ) -> Result<bool> {
        let holders = CustomRoleAssignment::holders(custom_role_id, project_id).await?;
        Ok(holders.contains(user_id) && self.is_active_user(user_id).await?)
    }
}
