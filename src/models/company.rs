use crate::database::get_db;
use crate::error::{Error, Result};
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

/// Tenant scope: incidents, hours-worked records, custom roles and
/// metrics snapshots all hang off a company.
#[derive(Debug, Deserialize, Serialize)]
pub struct Company {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub name: String,
    pub field: String,
    pub contact: CompanyContact,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct CompanyContact {
    pub address: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct CompanyRequest {
    pub name: String,
    pub field: String,
    pub contact: CompanyContact,
}

impl Company {
    fn collection() -> Collection<Company> {
        let db: Database = get_db();
        db.collection::<Company>("companies")
    }

    pub async fn save(&mut self) -> Result<ObjectId> {
        let _id = ObjectId::new();
        self._id = Some(_id);

        Self::collection()
            .insert_one(&*self, None)
            .await
            .map_err(|_| Error::Database("INSERTING_FAILED"))
            .map(|_| _id)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<Company>> {
        Self::collection()
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| Error::Database("COMPANY_LOOKUP_FAILED"))
    }
}
