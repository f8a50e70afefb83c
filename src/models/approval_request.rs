use crate::approval::resolver::{can_approve_step, resolve_approvers};
use crate::approval::transition::{next_state, ApprovalStatus, Decision, Transition};
use crate::database::get_db;
use crate::directory::MongoDirectory;
use crate::error::{Error, Result};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{approval_workflow::ApprovalWorkflow, project::Project};

/// A workflow executed against a subject (a change order, a submittal).
/// `status` and `current_step` are denormalized for reads; the action
/// log below is the audit trail.
#[derive(Debug, Deserialize, Serialize)]
pub struct ApprovalRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub workflow_id: ObjectId,
    pub project_id: ObjectId,
    pub title: String,
    pub current_step: u32,
    pub status: ApprovalStatus,
    pub initiated_by: ObjectId,
    pub created_at: DateTime,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ApprovalRequestPayload {
    pub workflow_id: ObjectId,
    pub project_id: ObjectId,
    pub title: String,
}
/// Append-only audit record. Never updated, never deleted.
#[derive(Debug, Deserialize, Serialize)]
pub struct ApprovalAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub request_id: ObjectId,
    pub step_order: u32,
    pub action: Decision,
    pub actor_id: ObjectId,
    pub time: DateTime,
    pub notes: Option<String>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ApprovalActionRequest {
    pub decision: Decision,
    pub notes: Option<String>,
}

impl ApprovalRequest {
    fn collection() -> Collection<ApprovalRequest> {
        let db: Database = get_db();
        db.collection::<ApprovalRequest>("approval-requests")
    }

    pub async fn save(&mut self) -> Result<ObjectId> {
        if ApprovalWorkflow::find_by_id(&self.workflow_id).await?.is_none() {
            return Err(Error::NotFound("WORKFLOW_NOT_FOUND"));
        }
        if Project::find_by_id(&self.project_id).await?.is_none() {
            return Err(Error::NotFound("PROJECT_NOT_FOUND"));
        }

        let _id = ObjectId::new();
        self._id = Some(_id);
        self.current_step = 1;
        self.status = ApprovalStatus::Pending;
        self.created_at = DateTime::now();

        Self::collection()
            .insert_one(&*self, None)
            .await
            .map_err(|_| Error::Database("INSERTING_FAILED"))
            .map(|_| _id)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<ApprovalRequest>> {
        Self::collection()
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| Error::Database("REQUEST_LOOKUP_FAILED"))
    }

    /// Enumerate the users allowed to act on the request's current step.
    pub async fn resolve_current_approvers(request_id: &ObjectId) -> Result<Vec<ObjectId>> {
        let request = Self::find_by_id(request_id)
            .await?
            .ok_or(Error::NotFound("REQUEST_NOT_FOUND"))?;
        let workflow = ApprovalWorkflow::find_by_id(&request.workflow_id)
            .await?
            .ok_or(Error::NotFound("WORKFLOW_NOT_FOUND"))?;
        let step = workflow
            .step(request.current_step)
            .ok_or(Error::NotFound("STEP_NOT_FOUND"))?;

        resolve_approvers(&step.approver, &request.project_id, &MongoDirectory).await
    }

    /// Whether `user_id` may approve the request right now. False for
    /// closed requests and missing steps; only a missing request is an
    /// error.
    pub async fn can_approve(request_id: &ObjectId, user_id: &ObjectId) -> Result<bool> {
        let request = Self::find_by_id(request_id)
            .await?
            .ok_or(Error::NotFound("REQUEST_NOT_FOUND"))?;
        if request.status != ApprovalStatus::Pending {
            return Ok(false);
        }
        let workflow = match ApprovalWorkflow::find_by_id(&request.workflow_id).await? {
            Some(workflow) => workflow,
            None => return Ok(false),
        };
        let step = match workflow.step(request.current_step) {
            Some(step) => step,
            None => return Ok(false),
        };

        can_approve_step(&step.approver, &request.project_id, user_id, &MongoDirectory).await
    }

    /// Record a decision and move the request.
    ///
    /// The action is written before the state change, so a failure
    /// between the two leaves the decision logged and the request where
    /// it was. The state change itself is a guarded update on
    /// `(status, current_step)`; losing a concurrent race yields
    /// `Conflict` and the caller decides whether to retry.
    pub async fn advance(
        request_id: &ObjectId,
        actor_id: &ObjectId,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<(ApprovalStatus, u32)> {
        let request = Self::find_by_id(request_id)
            .await?
            .ok_or(Error::NotFound("REQUEST_NOT_FOUND"))?;

        // Anyone may comment, on open or closed requests; comments never
        // advance state.
        if decision == Decision::Comment {
            ApprovalAction::append(request_id, request.current_step, decision, actor_id, notes)
                .await?;
            return Ok((request.status, request.current_step));
        }

        if request.status != ApprovalStatus::Pending {
            return Err(Error::Unauthorized);
        }
        let workflow = ApprovalWorkflow::find_by_id(&request.workflow_id)
            .await?
            .ok_or(Error::NotFound("WORKFLOW_NOT_FOUND"))?;
        let step = workflow
            .step(request.current_step)
            .ok_or(Error::NotFound("STEP_NOT_FOUND"))?;
        if !can_approve_step(&step.approver, &request.project_id, actor_id, &MongoDirectory).await? {
            return Err(Error::Unauthorized);
        }

        ApprovalAction::append(request_id, request.current_step, decision, actor_id, notes).await?;

        let next = next_state(request.current_step, workflow.last_step(), decision);
        let result = Self::collection()
            .update_one(
                doc! {
                    "_id": request_id,
                    "status": ApprovalStatus::Pending.as_str(),
                    "current_step": request.current_step,
                },
                doc! { "$set": {
                    "status": next.status.as_str(),
                    "current_step": next.step,
                } },
                None,
            )
            .await
            .map_err(|_| Error::Database("UPDATE_FAILED"))?;
        let outcome = confirm_transition(result.matched_count, next)?;

        tracing::info!(
            request = %request_id,
            actor = %actor_id,
            status = next.status.as_str(),
            step = next.step,
            "approval request advanced"
        );
        Ok(outcome)
    }
}

/// Settle a guarded transition update. The filter pins the state the
/// decision was taken against, so matching nothing means another actor
/// moved the request first: the appended action stands in the log, but
/// this transition loses.
fn confirm_transition(matched_count: u64, next: Transition) -> Result<(ApprovalStatus, u32)> {
    if matched_count == 0 {
        return Err(Error::Conflict);
    }
    Ok((next.status, next.step))
}

impl ApprovalAction {
    fn collection() -> Collection<ApprovalAction> {
        let db: Database = get_db();
        db.collection::<ApprovalAction>("approval-actions")
    }

    pub async fn append(
        request_id: &ObjectId,
        step_order: u32,
        action: Decision,
        actor_id: &ObjectId,
        notes: Option<String>,
    ) -> Result<ObjectId> {
        let record = ApprovalAction {
            _id: Some(ObjectId::new()),
            request_id: *request_id,
            step_order,
            action,
            actor_id: *actor_id,
            time: DateTime::now(),
            notes,
        };

        Self::collection()
            .insert_one(&record, None)
            .await
            .map_err(|_| Error::Database("INSERTING_FAILED"))
            .map(|_| record._id.unwrap_or_else(ObjectId::new))
    }
    pub async fn find_by_request(request_id: &ObjectId) -> Result<Vec<ApprovalAction>> {
        let options = FindOptions::builder().sort(doc! { "time": 1 }).build();
        let mut cursor = Self::collection()
            .find(doc! { "request_id": request_id }, options)
            .await
            .map_err(|_| Error::Database("ACTION_LOOKUP_FAILED"))?;

        let mut actions: Vec<ApprovalAction> = Vec::new();
        while let Some(Ok(action)) = cursor.next().await {
            actions.push(action);
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn losing_the_guarded_update_is_a_conflict() {
        let next = Transition {
            status: ApprovalStatus::Pending,
            step: 2,
        };
        assert_eq!(confirm_transition(0, next), Err(Error::Conflict));
    }

    #[test]
    fn matched_update_yields_the_new_state() {
        let next = Transition {
            status: ApprovalStatus::Approved,
            step: 3,
        };
        assert_eq!(
            confirm_transition(1, next),
            Ok((ApprovalStatus::Approved, 3))
        );
    }
}
