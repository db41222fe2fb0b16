use std::sync::Arc;

use async_trait::async_trait;
use coursegate_core_types::RejectionKind;
use coursegate_policy_center::PolicyTables;
use tracing::debug;

use crate::errors::ChainError;
use crate::request::ValidationRequest;
use crate::stages::{Stage, StageReply};

/// Maps the action to the permission it needs and checks the role holds it.
pub struct PermissionStage {
    pub tables: Arc<PolicyTables>,
}

impl PermissionStage {
    pub fn new(tables: Arc<PolicyTables>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl Stage for PermissionStage {
    fn name(&self) -> &'static str {
        "permission"
    }

    async fn handle(&self, request: ValidationRequest) -> Result<StageReply, ChainError> {
        let Some(role) = request.subject_role() else {
            let message = format!(
                "no role resolved for {} on '{}'",
                request.action(),
                request.resource()
            );
            return Ok(StageReply::reject(
                request,
                RejectionKind::PermissionDenied,
                message,
            ));
        };

        if self.tables.has_all_permission(role) {
            return Ok(StageReply::proceed(request));
        }

        let Some(required) = self.tables.required_permission(request.action()) else {
            debug!(action = request.action(), "action unmapped; allowing");
            return Ok(StageReply::proceed(request));
        };

        if self.tables.role_has_permission(role, required) {
            return Ok(StageReply::proceed(request));
        }

        let message = format!(
            "role '{}' may not {} on '{}': missing permission '{}'",
            role,
            request.action(),
            request.resource(),
            required
        );
        Ok(StageReply::reject(
            request,
            RejectionKind::PermissionDenied,
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageOutcome;
    use coursegate_core_types::Role;
    use coursegate_policy_center::default_tables;

    async fn outcome(role: Role, action: &str) -> StageOutcome {
        let stage = PermissionStage::new(default_tables().freeze());
        let request = ValidationRequest::new("tok", "course.any", action).with_role(role);
        stage.handle(request).await.unwrap().outcome
    }

    #[tokio::test]
    async fn all_permission_covers_every_action() {
        for action in ["delete", "create", "manage_users", "teleport"] {
            assert_eq!(outcome(Role::Admin, action).await, StageOutcome::Continue);
        }
    }

    #[tokio::test]
    async fn unmapped_action_is_allowed() {
        assert_eq!(outcome(Role::Student, "bookmark").await, StageOutcome::Continue);
    }

    #[tokio::test]
    async fn teacher_cannot_delete_courses() {
        match outcome(Role::Teacher, "delete").await {
            StageOutcome::Reject(rejection) => {
                assert_eq!(rejection.kind, RejectionKind::PermissionDenied);
                assert!(rejection.message.contains("teacher"));
                assert!(rejection.message.contains("course.any"));
                assert!(rejection.message.contains("delete_course"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn student_may_enroll_but_not_create() {
        assert_eq!(outcome(Role::Student, "enroll").await, StageOutcome::Continue);
        assert!(matches!(
            outcome(Role::Student, "create").await,
            StageOutcome::Reject(_)
        ));
    }
}
