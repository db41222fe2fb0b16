use std::sync::Arc;

use async_trait::async_trait;
use coursegate_core_types::{keys, CourseModality, RejectionKind};
use coursegate_policy_center::{PolicyTables, UnresolvedCoursePolicy};
use tracing::{debug, warn};

use crate::collaborators::CourseReader;
use crate::errors::ChainError;
use crate::request::ValidationRequest;
use crate::stages::{resolve_course_id, Stage, StageReply};

/// Enforces the per-modality seat limit on enrollment.
pub struct SeatCapacityStage {
    pub tables: Arc<PolicyTables>,
    pub courses: Arc<dyn CourseReader>,
}

impl SeatCapacityStage {
    pub fn new(tables: Arc<PolicyTables>, courses: Arc<dyn CourseReader>) -> Self {
        Self { tables, courses }
    }

    fn unresolved(&self, request: ValidationRequest, detail: String) -> StageReply {
        match self.tables.capacity.unresolved_course {
            UnresolvedCoursePolicy::Allow => {
                debug!(detail = %detail, "course unresolved; capacity not checked");
                StageReply::proceed(request)
            }
            UnresolvedCoursePolicy::Reject => {
                StageReply::reject(request, RejectionKind::CourseNotFound, detail)
            }
        }
    }
}

#[async_trait]
impl Stage for SeatCapacityStage {
    fn name(&self) -> &'static str {
        "seat_capacity"
    }

    async fn handle(&self, mut request: ValidationRequest) -> Result<StageReply, ChainError> {
        if !request.action_is("enroll") {
            return Ok(StageReply::proceed(request));
        }

        let Some(course) = resolve_course_id(&request) else {
            let detail = format!("no course id in request for '{}'", request.resource());
            return Ok(self.unresolved(request, detail));
        };

        let modality = match self.courses.course_type(course).await {
            Ok(Some(raw)) => CourseModality::parse(&raw),
            Ok(None) => return Ok(self.unresolved(request, format!("course {course} not found"))),
            Err(err) => {
                warn!(stage = self.name(), %course, error = %err, "course type lookup failed");
                return Err(ChainError::collaborator(self.name(), err));
            }
        };
        let enrolled = self
            .courses
            .count_enrollments(course)
            .await
            .map_err(|err| {
                warn!(stage = self.name(), %course, error = %err, "enrollment count lookup failed");
                ChainError::collaborator(self.name(), err)
            })?;

        let limit = self.tables.seat_limit(&modality);
        request.insert_meta(keys::COURSE_TYPE, modality.canonical());
        request.insert_meta(keys::SEAT_LIMIT, limit);
        request.insert_meta(keys::ENROLLMENT_COUNT, enrolled);

        if enrolled >= limit {
            return Ok(StageReply::reject(
                request,
                RejectionKind::CapacityExceeded,
                format!("course {course} ({modality}) is full: {enrolled}/{limit} seats taken"),
            ));
        }

        request.insert_meta(keys::SEATS_AVAILABLE, limit - enrolled);
        Ok(StageReply::proceed(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CourseRecord, InMemoryCourses};
    use crate::errors::CollaboratorError;
    use crate::stages::StageOutcome;
    use coursegate_core_types::CourseId;
    use coursegate_policy_center::default_tables;

    fn courses() -> Arc<InMemoryCourses> {
        let courses = InMemoryCourses::new();
        courses.insert(CourseId(1), CourseRecord::new("presencial", 35));
        courses.insert(CourseId(2), CourseRecord::new("presencial", 34));
        courses.insert(CourseId(3), CourseRecord::new("Hybrid", 35));
        courses.insert(CourseId(4), CourseRecord::new("virtual", 44));
        courses.insert(CourseId(5), CourseRecord::new("bootcamp", 45));
        Arc::new(courses)
    }

    async fn enroll(tables: PolicyTables, request: ValidationRequest) -> StageReply {
        SeatCapacityStage::new(tables.freeze(), courses())
            .handle(request)
            .await
            .unwrap()
    }

    fn enroll_in(course: i64) -> ValidationRequest {
        ValidationRequest::new("tok", "course.enroll", "enroll").with_meta(keys::COURSE_ID, course)
    }

    #[tokio::test]
    async fn full_presencial_course_rejects() {
        let reply = enroll(default_tables(), enroll_in(1)).await;
        match reply.outcome {
            StageOutcome::Reject(rejection) => {
                assert_eq!(rejection.kind, RejectionKind::CapacityExceeded)
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(reply.request.meta(keys::SEATS_AVAILABLE).is_none());
    }

    #[tokio::test]
    async fn last_seat_is_reported() {
        let reply = enroll(default_tables(), enroll_in(2)).await;
        assert_eq!(reply.outcome, StageOutcome::Continue);
        assert_eq!(reply.request.meta_i64(keys::SEATS_AVAILABLE), Some(1));
        assert_eq!(reply.request.meta_i64(keys::SEAT_LIMIT), Some(35));
    }

    #[tokio::test]
    async fn hybrid_alias_and_default_limits() {
        assert!(matches!(
            enroll(default_tables(), enroll_in(3)).await.outcome,
            StageOutcome::Reject(_)
        ));
        let virtual_reply = enroll(default_tables(), enroll_in(4)).await;
        assert_eq!(virtual_reply.request.meta_i64(keys::SEATS_AVAILABLE), Some(1));
        assert!(matches!(
            enroll(default_tables(), enroll_in(5)).await.outcome,
            StageOutcome::Reject(_)
        ));
    }

    #[tokio::test]
    async fn course_id_is_read_from_resource_path() {
        let request = ValidationRequest::new("tok", "course/2/enroll", "enroll");
        let reply = enroll(default_tables(), request).await;
        assert_eq!(reply.request.meta_i64(keys::SEATS_AVAILABLE), Some(1));
    }

    #[tokio::test]
    async fn unresolved_course_follows_policy_flag() {
        let allowed = enroll(default_tables(), enroll_in(404)).await;
        assert_eq!(allowed.outcome, StageOutcome::Continue);

        let no_id = ValidationRequest::new("tok", "course.enroll", "enroll");
        assert_eq!(
            enroll(default_tables(), no_id).await.outcome,
            StageOutcome::Continue
        );

        let mut strict = default_tables();
        strict.set_unresolved_course(UnresolvedCoursePolicy::Reject);
        match enroll(strict, enroll_in(404)).await.outcome {
            StageOutcome::Reject(rejection) => {
                assert_eq!(rejection.kind, RejectionKind::CourseNotFound)
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    struct CountingDown;

    #[async_trait]
    impl CourseReader for CountingDown {
        async fn course_type(&self, _: CourseId) -> Result<Option<String>, CollaboratorError> {
            Ok(Some("virtual".into()))
        }

        async fn count_enrollments(&self, _: CourseId) -> Result<u32, CollaboratorError> {
            Err(CollaboratorError::Unavailable("enrollment store".into()))
        }

        async fn course_period(&self, _: CourseId) -> Result<Option<String>, CollaboratorError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn enrollment_count_failure_names_the_stage() {
        let stage = SeatCapacityStage::new(default_tables().freeze(), Arc::new(CountingDown));
        let err = stage.handle(enroll_in(1)).await.unwrap_err();
        assert!(err.is_retryable());
        match err {
            ChainError::Collaborator { stage: name, .. } => assert_eq!(name, stage.name()),
            other => panic!("expected collaborator error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_enroll_actions_skip() {
        let request = ValidationRequest::new("tok", "course.view", "view").with_meta(keys::COURSE_ID, 1);
        assert_eq!(
            enroll(default_tables(), request).await.outcome,
            StageOutcome::Continue
        );
    }
}
