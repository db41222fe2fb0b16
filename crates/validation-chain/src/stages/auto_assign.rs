use async_trait::async_trait;
use coursegate_core_types::{keys, RejectionKind, Role};

use crate::errors::ChainError;
use crate::request::{value_as_i64, ValidationRequest};
use crate::stages::{Stage, StageReply};

/// Resolves who will own an authored course.
///
/// Teachers always own what they author and may not name another owner.
/// Admins author on behalf of a teacher and must name one. Students never
/// author, even when earlier stages were configured to let them through.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoAssignOwnerStage;

impl AutoAssignOwnerStage {
    pub fn new() -> Self {
        Self
    }
}

enum Requested {
    Absent,
    Id(i64),
    Malformed,
}

fn requested_owner(request: &ValidationRequest) -> Requested {
    match request.meta(keys::OWNER_ID_REQUESTED) {
        None => Requested::Absent,
        Some(value) => value_as_i64(value).map_or(Requested::Malformed, Requested::Id),
    }
}

#[async_trait]
impl Stage for AutoAssignOwnerStage {
    fn name(&self) -> &'static str {
        "auto_assign_owner"
    }

    async fn handle(&self, mut request: ValidationRequest) -> Result<StageReply, ChainError> {
        if !request.action_in(&["create", "edit"]) {
            return Ok(StageReply::proceed(request));
        }

        let Some(role) = request.subject_role() else {
            return Ok(StageReply::reject(
                request,
                RejectionKind::NotAuthorizedToAuthorCourses,
                "no role resolved; only teachers and admins author courses",
            ));
        };

        match role {
            Role::Student => Ok(StageReply::reject(
                request,
                RejectionKind::NotAuthorizedToAuthorCourses,
                "students cannot author courses",
            )),
            Role::Teacher => {
                let Some(subject) = request.meta_i64(keys::SUBJECT_ID) else {
                    return Ok(StageReply::reject(
                        request,
                        RejectionKind::OwnerRequired,
                        "teacher identity is unknown; cannot assign ownership",
                    ));
                };
                match requested_owner(&request) {
                    Requested::Absent => {
                        request.insert_meta(keys::OWNER_ID_REQUESTED, subject);
                        request.insert_meta(keys::AUTO_ASSIGNED, true);
                        Ok(StageReply::proceed(request))
                    }
                    Requested::Id(owner) if owner == subject => {
                        request.insert_meta(keys::OWNER_ID_REQUESTED, owner);
                        request.insert_meta(keys::AUTO_ASSIGNED, false);
                        Ok(StageReply::proceed(request))
                    }
                    Requested::Id(owner) => Ok(StageReply::reject(
                        request,
                        RejectionKind::CannotAssignOtherTeacher,
                        format!("teacher {subject} cannot assign course ownership to {owner}"),
                    )),
                    Requested::Malformed => Ok(StageReply::reject(
                        request,
                        RejectionKind::InvalidOwnerId,
                        "ownerIdRequested is not a numeric id",
                    )),
                }
            }
            Role::Admin => match requested_owner(&request) {
                Requested::Absent => Ok(StageReply::reject(
                    request,
                    RejectionKind::OwnerRequired,
                    "admins must name the owning teacher",
                )),
                Requested::Id(owner) if owner > 0 => {
                    request.insert_meta(keys::OWNER_ID_REQUESTED, owner);
                    request.insert_meta(keys::AUTO_ASSIGNED, false);
                    Ok(StageReply::proceed(request))
                }
                Requested::Id(owner) => Ok(StageReply::reject(
                    request,
                    RejectionKind::InvalidOwnerId,
                    format!("owner id must be positive, got {owner}"),
                )),
                Requested::Malformed => Ok(StageReply::reject(
                    request,
                    RejectionKind::InvalidOwnerId,
                    "ownerIdRequested is not a numeric id",
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageOutcome;
    use serde_json::{json, Value};

    async fn author(role: Option<Role>, subject: Option<i64>, owner: Option<Value>) -> StageReply {
        let mut request = ValidationRequest::new("tok", "course.create", "create");
        if let Some(role) = role {
            request = request.with_role(role);
        }
        if let Some(subject) = subject {
            request = request.with_meta(keys::SUBJECT_ID, subject);
        }
        if let Some(owner) = owner {
            request = request.with_meta(keys::OWNER_ID_REQUESTED, owner);
        }
        AutoAssignOwnerStage::new().handle(request).await.unwrap()
    }

    fn kind(reply: &StageReply) -> Option<RejectionKind> {
        match &reply.outcome {
            StageOutcome::Reject(rejection) => Some(rejection.kind),
            _ => None,
        }
    }

    #[tokio::test]
    async fn teacher_is_assigned_automatically() {
        let reply = author(Some(Role::Teacher), Some(7), None).await;
        assert_eq!(reply.outcome, StageOutcome::Continue);
        assert_eq!(reply.request.meta_i64(keys::OWNER_ID_REQUESTED), Some(7));
        assert_eq!(reply.request.meta(keys::AUTO_ASSIGNED), Some(&json!(true)));
    }

    #[tokio::test]
    async fn teacher_may_name_only_themselves() {
        let own = author(Some(Role::Teacher), Some(7), Some(json!("7"))).await;
        assert_eq!(own.outcome, StageOutcome::Continue);
        assert_eq!(own.request.meta(keys::AUTO_ASSIGNED), Some(&json!(false)));

        let other = author(Some(Role::Teacher), Some(7), Some(json!(9))).await;
        assert_eq!(kind(&other), Some(RejectionKind::CannotAssignOtherTeacher));
    }

    #[tokio::test]
    async fn teacher_without_identity_needs_an_owner() {
        let reply = author(Some(Role::Teacher), None, None).await;
        assert_eq!(kind(&reply), Some(RejectionKind::OwnerRequired));
    }

    #[tokio::test]
    async fn admin_must_name_a_positive_owner() {
        let missing = author(Some(Role::Admin), Some(1), None).await;
        assert_eq!(kind(&missing), Some(RejectionKind::OwnerRequired));

        let zero = author(Some(Role::Admin), Some(1), Some(json!(0))).await;
        assert_eq!(kind(&zero), Some(RejectionKind::InvalidOwnerId));

        let garbage = author(Some(Role::Admin), Some(1), Some(json!("abc"))).await;
        assert_eq!(kind(&garbage), Some(RejectionKind::InvalidOwnerId));

        let named = author(Some(Role::Admin), Some(1), Some(json!(12))).await;
        assert_eq!(named.outcome, StageOutcome::Continue);
        assert_eq!(named.request.meta_i64(keys::OWNER_ID_REQUESTED), Some(12));
        assert_eq!(named.request.meta(keys::AUTO_ASSIGNED), Some(&json!(false)));
    }

    #[tokio::test]
    async fn students_and_anonymous_never_author() {
        for role in [Some(Role::Student), None] {
            let reply = author(role, Some(3), None).await;
            assert_eq!(
                kind(&reply),
                Some(RejectionKind::NotAuthorizedToAuthorCourses)
            );
        }
    }
}
