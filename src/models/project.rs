use crate::database::get_db;
use crate::error::{Error, Result};
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{company::Company, user::User};

#[derive(Debug, Deserialize, Serialize)]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
    pub code: String,
    pub member: Vec<ProjectMember>,
}
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProjectMember {
    pub user_id: ObjectId,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectRequest {
    pub company_id: ObjectId,
    pub name: String,
    pub code: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectMemberRequest {
    pub user_id: Vec<ObjectId>,
}

impl Project {
    fn collection() -> Collection<Project> {
        let db: Database = get_db();
        db.collection::<Project>("projects")
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
    /// Add users to the membership roster. Unknown or soft-deleted users
    /// and existing members are skipped rather than rejected.
    pub async fn add_member(&mut self, user_ids: &[ObjectId]) -> Result<ObjectId> {
        let _id = self._id.ok_or(Error::NotFound("PROJECT_NOT_FOUND"))?;

        for user_id in user_ids {
            if self.member.iter().any(|member| member.user_id == *user_id) {
                continue;
            }
            if let Ok(Some(user)) = User::find_by_id(user_id).await {
                if !user.deleted {
                    self.member.push(ProjectMember { user_id: *user_id });
                }
            }
        }

        let member =
            to_bson::<Vec<ProjectMember>>(&self.member).map_err(|_| Error::Database("UPDATE_FAILED"))?;
        Self::collection()
            .update_one(doc! { "_id": _id }, doc! { "$set": { "member": member } }, None)
            .await
            .map_err(|_| Error::Database("UPDATE_FAILED"))
            .map(|_| _id)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<Project>> {
        Self::collection()
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| Error::Database("PROJECT_LOOKUP_FAILED"))
    }
    pub fn member_ids(&self) -> Vec<ObjectId> {
        self.member.iter().map(|member| member.user_id).collect()
    }
}
