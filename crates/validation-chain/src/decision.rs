use coursegate_core_types::RejectionKind;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::request::ValidationRequest;

/// Caller-facing summary of a finished request: what a controller needs to
/// answer the client and to complete the write on approval.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Decision {
    pub request_id: String,
    pub approved: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub metadata: Map<String, Value>,
}

impl Decision {
    pub fn from_request(request: &ValidationRequest) -> Self {
        let rejection = request.error_reason();
        Self {
            request_id: request.request_id().to_string(),
            approved: request.is_approved(),
            status: rejection.map_or(200, |r| status_for(r.kind)),
            code: rejection.map(|r| r.kind.to_string()),
            message: rejection.map(|r| r.message.clone()),
            metadata: request.metadata().clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "request_id": self.request_id,
            "approved": self.approved,
            "status": self.status,
            "code": self.code,
            "message": self.message,
            "metadata": self.metadata,
        })
    }
}

/// HTTP-style status a caller should answer with for a rejection.
pub fn status_for(kind: RejectionKind) -> u16 {
    match kind {
        RejectionKind::InvalidToken => 401,
        RejectionKind::RoleNotAuthorized
        | RejectionKind::PermissionDenied
        | RejectionKind::CannotAssignOtherTeacher
        | RejectionKind::NotAuthorizedToAuthorCourses => 403,
        RejectionKind::CourseNotFound => 404,
        RejectionKind::CapacityExceeded | RejectionKind::EnrollmentClosed => 409,
        RejectionKind::InvalidPeriod(_)
        | RejectionKind::OwnerRequired
        | RejectionKind::InvalidOwnerId => 422,
    }
}
