use std::sync::Arc;

use async_trait::async_trait;
use coursegate_core_types::RejectionKind;
use coursegate_policy_center::PolicyTables;
use tracing::debug;

use crate::errors::ChainError;
use crate::request::ValidationRequest;
use crate::stages::{Stage, StageReply};

/// Checks the subject's role against the roles allowed on the resource.
/// Unclassified resources are let through.
pub struct RoleStage {
    pub tables: Arc<PolicyTables>,
}

impl RoleStage {
    pub fn new(tables: Arc<PolicyTables>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl Stage for RoleStage {
    fn name(&self) -> &'static str {
        "role"
    }

    async fn handle(&self, request: ValidationRequest) -> Result<StageReply, ChainError> {
        let Some(allowed) = self.tables.allowed_roles(request.resource()) else {
            debug!(resource = request.resource(), "resource unclassified; allowing");
            return Ok(StageReply::proceed(request));
        };

        match request.subject_role() {
            Some(role) if allowed.contains(&role) => Ok(StageReply::proceed(request)),
            Some(role) => {
                let message = format!(
                    "role '{}' is not allowed on resource '{}'",
                    role,
                    request.resource()
                );
                Ok(StageReply::reject(
                    request,
                    RejectionKind::RoleNotAuthorized,
                    message,
                ))
            }
            None => {
                let message = format!("no role resolved for resource '{}'", request.resource());
                Ok(StageReply::reject(
                    request,
                    RejectionKind::RoleNotAuthorized,
                    message,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageOutcome;
    use coursegate_core_types::Role;
    use coursegate_policy_center::default_tables;

    fn stage() -> RoleStage {
        RoleStage::new(default_tables().freeze())
    }

    async fn outcome(role: Option<Role>, resource: &str) -> StageOutcome {
        let mut request = ValidationRequest::new("tok", resource, "view");
        if let Some(role) = role {
            request = request.with_role(role);
        }
        stage().handle(request).await.unwrap().outcome
    }

    #[tokio::test]
    async fn unclassified_resources_allow_every_role() {
        for role in Role::ALL {
            assert_eq!(
                outcome(Some(role), "forum.thread.view").await,
                StageOutcome::Continue
            );
        }
        assert_eq!(outcome(None, "forum.thread.view").await, StageOutcome::Continue);
    }

    #[tokio::test]
    async fn student_cannot_reach_course_creation() {
        match outcome(Some(Role::Student), "course.create").await {
            StageOutcome::Reject(rejection) => {
                assert_eq!(rejection.kind, RejectionKind::RoleNotAuthorized);
                assert!(rejection.message.contains("student"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn admin_has_no_bypass() {
        let mut tables = default_tables();
        tables.add_resource_roles("grade.self_assess", [Role::Student]);
        let stage = RoleStage::new(tables.freeze());
        let request =
            ValidationRequest::new("tok", "grade.self_assess", "grade").with_role(Role::Admin);
        let reply = stage.handle(request).await.unwrap();
        assert!(matches!(reply.outcome, StageOutcome::Reject(_)));
    }

    #[tokio::test]
    async fn missing_role_is_rejected_on_mapped_resource() {
        assert!(matches!(
            outcome(None, "course.delete").await,
            StageOutcome::Reject(_)
        ));
    }
}
