pub mod approval_request;
pub mod approval_workflow;
pub mod company;
pub mod custom_role;
pub mod project;
pub mod safety_incident;
pub mod safety_metrics;
pub mod user;
