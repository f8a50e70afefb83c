use crate::database::get_db;
use crate::error::{Error, Result};
use crate::models::user::DefaultRole;
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::company::Company;

pub const MAX_WORKFLOW_STEPS: usize = 10;

/// Who may approve a step. A tagged union: each workflow step carries
/// exactly one of these, so an unrecognized approver type fails at
/// deserialization instead of silently resolving like a user list.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApproverSpec {
    #[serde(rename = "user")]
    Users { ids: Vec<ObjectId> },
    Role { role: DefaultRole },
    CustomRole { custom_role_id: ObjectId },
    Any,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WorkflowStep {
    pub order: u32,
    pub approver: ApproverSpec,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApprovalWorkflow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ApprovalWorkflowRequest {
    pub company_id: ObjectId,
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

impl ApprovalWorkflow {
    fn collection() -> Collection<ApprovalWorkflow> {
        let db: Database = get_db();
        db.collection::<ApprovalWorkflow>("approval-workflows")
    }

    /// Steps must be 1..=MAX_WORKFLOW_STEPS, ordered 1, 2, 3, ... with
    /// no gaps, and a direct-user step must name at least one user.
    pub fn validate_steps(steps: &[WorkflowStep]) -> Result<()> {
        if steps.is_empty() || steps.len() > MAX_WORKFLOW_STEPS {
            return Err(Error::InvalidInput("WORKFLOW_MUST_HAVE_VALID_STEPS"));
        }
        for (index, step) in steps.iter().enumerate() {
            if step.order != index as u32 + 1 {
                return Err(Error::InvalidInput("WORKFLOW_STEPS_MUST_BE_ORDERED"));
            }
            if let ApproverSpec::Users { ids } = &step.approver {
                if ids.is_empty() {
                    return Err(Error::InvalidInput("STEP_MUST_HAVE_APPROVERS"));
                }
            }
        }
        Ok(())
    }

    pub fn step(&self, order: u32) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.order == order)
    }

    pub fn last_step(&self) -> u32 {
        self.steps.iter().map(|step| step.order).max().unwrap_or(0)
    }

    pub async fn save(&mut self) -> Result<ObjectId> {
        Self::validate_steps(&self.steps)?;
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
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<ApprovalWorkflow>> {
        Self::collection()
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| Error::Database("WORKFLOW_LOOKUP_FAILED"))
    }
    pub async fn find_many(company_id: &ObjectId) -> Result<Vec<ApprovalWorkflow>> {
        let mut cursor = Self::collection()
            .find(doc! { "company_id": company_id }, None)
            .await
            .map_err(|_| Error::Database("WORKFLOW_LOOKUP_FAILED"))?;

        let mut workflows: Vec<ApprovalWorkflow> = Vec::new();
        while let Some(Ok(workflow)) = cursor.next().await {
            workflows.push(workflow);
        }
        Ok(workflows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(order: u32) -> WorkflowStep {
        WorkflowStep {
            order,
            approver: ApproverSpec::Any,
        }
    }

    #[test]
    fn contiguous_steps_starting_at_one_validate() {
        assert!(ApprovalWorkflow::validate_steps(&[step(1), step(2), step(3)]).is_ok());
    }

    #[test]
    fn empty_and_oversized_workflows_are_rejected() {
        assert_eq!(
            ApprovalWorkflow::validate_steps(&[]),
            Err(Error::InvalidInput("WORKFLOW_MUST_HAVE_VALID_STEPS"))
        );
        let steps: Vec<WorkflowStep> = (1..=11).map(step).collect();
        assert_eq!(
            ApprovalWorkflow::validate_steps(&steps),
            Err(Error::InvalidInput("WORKFLOW_MUST_HAVE_VALID_STEPS"))
        );
    }

    #[test]
    fn gapped_or_misordered_steps_are_rejected() {
        assert!(ApprovalWorkflow::validate_steps(&[step(1), step(3)]).is_err());
        assert!(ApprovalWorkflow::validate_steps(&[step(2), step(1)]).is_err());
        assert!(ApprovalWorkflow::validate_steps(&[step(0), step(1)]).is_err());
    }

    #[test]
    fn direct_user_step_must_name_someone() {
        let steps = [WorkflowStep {
            order: 1,
            approver: ApproverSpec::Users { ids: vec![] },
        }];
        assert_eq!(
            ApprovalWorkflow::validate_steps(&steps),
            Err(Error::InvalidInput("STEP_MUST_HAVE_APPROVERS"))
        );
    }

    #[test]
    fn unknown_approver_type_fails_deserialization() {
        let raw = r#"{ "order": 1, "approver": { "type": "carrier_pigeon" } }"#;
        assert!(serde_json::from_str::<WorkflowStep>(raw).is_err());

        let known = r#"{ "order": 1, "approver": { "type": "role", "role": "foreman" } }"#;
        let parsed: WorkflowStep = serde_json::from_str(known).unwrap();
        assert_eq!(
            parsed.approver,
            ApproverSpec::Role {
                role: DefaultRole::Foreman
            }
        );
    }

    #[test]
    fn step_lookup_and_last_step() {
        let workflow = ApprovalWorkflow {
            _id: None,
            company_id: ObjectId::new(),
            name: "change orders".to_string(),
            steps: vec![step(1), step(2)],
        };
        assert_eq!(workflow.last_step(), 2);
        assert!(workflow.step(2).is_some());
        assert!(workflow.step(3).is_none());
    }
}
