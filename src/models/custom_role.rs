use crate::database::get_db;
use crate::error::{Error, Result};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{company::Company, project::Project, user::User};

/// Company-defined permission grouping, distinct from the built-in
/// default roles. Workflow steps can route approvals to one.
#[derive(Debug, Deserialize, Serialize)]
pub struct CustomRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct CustomRoleRequest {
    pub company_id: ObjectId,
    pub name: String,
}
/// Grant of a custom role to a user, either globally (`project_id` is
/// None) or scoped to a single project.
#[derive(Debug, Deserialize, Serialize)]
pub struct CustomRoleAssignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub custom_role_id: ObjectId,
    pub user_id: ObjectId,
    pub project_id: Option<ObjectId>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct CustomRoleAssignmentRequest {
    pub user_id: ObjectId,
    pub project_id: Option<ObjectId>,
}

impl CustomRole {
    fn collection() -> Collection<CustomRole> {
        let db: Database = get_db();
        db.collection::<CustomRole>("custom-roles")
    }

    pub async fn save(&mut self) -> Result<ObjectId> {
        if Company::find_by_id(&self.company_id).await?.is_none() {
            return Err(Error::NotFound("COMPANY_NOT_FOUND"));
        }

        let _id = ObjectId::new();
        self._id = Some(_id);

        Self::collection()
            .insert_one(&*self, None)
            .await
            .map_err(|_| Error::Database("INSERTING_FAILED"))
            .map(|_| _id)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<CustomRole>> {
        Self::collection()
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| Error::Database("ROLE_LOOKUP_FAILED"))
    }
}

impl CustomRoleAssignment {
    fn collection() -> Collection<CustomRoleAssignment> {
        let db: Database = get_db();
        db.collection::<CustomRoleAssignment>("custom-role-assignments")
    }

    pub async fn save(&mut self) -> Result<ObjectId> {
        if CustomRole::find_by_id(&self.custom_role_id).await?.is_none() {
            return Err(Error::NotFound("ROLE_NOT_FOUND"));
        }
        match User::find_by_id(&self.user_id).await? {
            Some(user) if !user.deleted => {}
            _ => return Err(Error::NotFound("USER_NOT_FOUND")),
        }
        if let Some(project_id) = &self.project_id {
            if Project::find_by_id(project_id).await?.is_none() {
                return Err(Error::NotFound("PROJECT_NOT_FOUND"));
            }
        }

        let _id = ObjectId::new();
        self._id = Some(_id);

        Self::collection()
            .insert_one(&*self, None)
            .await
            .map_err(|_| Error::Database("INSERTING_FAILED"))
            .map(|_| _id)
    }
    /// Holders of the role whose assignment is global or scoped to
    /// exactly `project_id`. May contain soft-deleted users; callers
    /// filter through the user collection.
    pub async fn holders(custom_role_id: &ObjectId, project_id: &ObjectId) -> Result<Vec<ObjectId>> {
        let filter = doc! {
            "custom_role_id": custom_role_id,
            "$or": [ { "project_id": Bson::Null }, { "project_id": project_id } ],
        };
        let mut cursor = Self::collection()
            .find(filter, None)
            .await
            .map_err(|_| Error::Database("ROLE_LOOKUP_FAILED"))?;

        let mut holders: Vec<ObjectId> = Vec::new();
        while let Some(Ok(assignment)) = cursor.next().await {
            if !holders.contains(&assignment.user_id) {
                holders.push(assignment.user_id);
            }
        }
        Ok(holders)
    }
}
