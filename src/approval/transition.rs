//! Step transition rules for approval requests.
//!
//! A request walks its workflow steps in order. Approval on the last step
//! closes the request as approved; rejection closes it immediately at any
//! step. Comments never move the request.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    Comment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub status: ApprovalStatus,
    pub step: u32,
}

/// Compute the state a pending request moves to when `decision` is taken
/// at `current_step` of a workflow whose final step is `last_step`.
pub fn next_state(current_step: u32, last_step: u32, decision: Decision) -> Transition {
    match decision {
        Decision::Approve => {
            if current_step >= last_step {
                Transition {
                    status: ApprovalStatus::Approved,
                    step: current_step,
                }
            } else {
                Transition {
                    status: ApprovalStatus::Pending,
                    step: current_step + 1,
                }
            }
        }
        Decision::Reject => Transition {
            status: ApprovalStatus::Rejected,
            step: current_step,
        },
        Decision::Comment => Transition {
            status: ApprovalStatus::Pending,
            step: current_step,
        },
    }
}
