use async_trait::async_trait;
use coursegate_core_types::{keys, RejectionKind, Role, ViewFilter};

use crate::errors::ChainError;
use crate::request::ValidationRequest;
use crate::stages::{Stage, StageReply};

/// One variant of the course-listing chain. A variant that matches the
/// subject's role writes the listing filter and approves; otherwise the
/// request moves on to the next variant.
#[derive(Clone, Copy, Debug)]
pub struct ViewFilterStage {
    role: Role,
    filter: ViewFilter,
}

impl ViewFilterStage {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            filter: ViewFilter::All,
        }
    }

    pub fn teacher() -> Self {
        Self {
            role: Role::Teacher,
            filter: ViewFilter::ByTeacher,
        }
    }

    pub fn student() -> Self {
        Self {
            role: Role::Student,
            filter: ViewFilter::ByStudent,
        }
    }
}

#[async_trait]
impl Stage for ViewFilterStage {
    fn name(&self) -> &'static str {
        match self.role {
            Role::Admin => "admin_view",
            Role::Teacher => "teacher_view",
            Role::Student => "student_view",
        }
    }

    async fn handle(&self, mut request: ValidationRequest) -> Result<StageReply, ChainError> {
        if request.subject_role() != Some(self.role) {
            return Ok(StageReply::proceed(request));
        }

        request.insert_meta(keys::VIEW_FILTER, self.filter.as_str());
        let subject = request.meta(keys::SUBJECT_ID).cloned();
        match (self.filter, subject) {
            (ViewFilter::ByTeacher, Some(id)) => request.insert_meta(keys::VIEW_OWNER_ID, id),
            (ViewFilter::ByStudent, Some(id)) => request.insert_meta(keys::VIEW_STUDENT_ID, id),
            _ => {}
        }
        Ok(StageReply::approve(request))
    }
}

/// Tail of the listing chain: reached only when no variant claimed the role.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenyUnmatchedStage;

#[async_trait]
impl Stage for DenyUnmatchedStage {
    fn name(&self) -> &'static str {
        "deny_unmatched"
    }

    async fn handle(&self, request: ValidationRequest) -> Result<StageReply, ChainError> {
        let message = match request.subject_role() {
            Some(role) => format!("no course listing is defined for role '{role}'"),
            None => "no role resolved; cannot list courses".to_string(),
        };
        Ok(StageReply::reject(
            request,
            RejectionKind::RoleNotAuthorized,
            message,
        ))
    }
}
