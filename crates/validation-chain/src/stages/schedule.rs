use std::sync::Arc;

use async_trait::async_trait;
use coursegate_core_types::{keys, RejectionKind};
use tracing::{debug, warn};

use crate::calendar::{AcademicPeriod, Clock};
use crate::collaborators::CourseReader;
use crate::errors::ChainError;
use crate::request::ValidationRequest;
use crate::stages::{resolve_course_id, Stage, StageReply};

/// Refuses enrollment into a course whose term has already finished.
pub struct ScheduleStage {
    pub courses: Arc<dyn CourseReader>,
    pub clock: Arc<dyn Clock>,
}

impl ScheduleStage {
    pub fn new(courses: Arc<dyn CourseReader>, clock: Arc<dyn Clock>) -> Self {
        Self { courses, clock }
    }
}

#[async_trait]
impl Stage for ScheduleStage {
    fn name(&self) -> &'static str {
        "schedule"
    }

    async fn handle(&self, mut request: ValidationRequest) -> Result<StageReply, ChainError> {
        if !request.action_is("enroll") {
            return Ok(StageReply::proceed(request));
        }
        let Some(course) = resolve_course_id(&request) else {
            return Ok(StageReply::proceed(request));
        };

        let raw_period = match self.courses.course_period(course).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(StageReply::proceed(request)),
            Err(err) => {
                warn!(stage = self.name(), %course, error = %err, "course period lookup failed");
                return Err(ChainError::collaborator(self.name(), err));
            }
        };

        let period = match AcademicPeriod::parse(&raw_period) {
            Ok(period) => period,
            Err(err) => {
                debug!(%course, raw = %raw_period, error = %err, "course period unreadable; skipping");
                return Ok(StageReply::proceed(request));
            }
        };

        request.insert_meta(keys::COURSE_PERIOD, period.label());
        if period.has_ended(self.clock.today()) {
            return Ok(StageReply::reject(
                request,
                RejectionKind::EnrollmentClosed,
                format!("course {course} ran in {period}, which has already ended"),
            ));
        }
        Ok(StageReply::proceed(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;
    use crate::collaborators::{CourseRecord, InMemoryCourses};
    use crate::stages::StageOutcome;
    use chrono::NaiveDate;
    use coursegate_core_types::CourseId;

    fn stage() -> ScheduleStage {
        let courses = InMemoryCourses::new();
        courses.insert(
            CourseId(1),
            CourseRecord::new("virtual", 3).with_period("January-June 2025"),
        );
        courses.insert(
            CourseId(2),
            CourseRecord::new("virtual", 3).with_period("August-December 2025"),
        );
        courses.insert(CourseId(3), CourseRecord::new("virtual", 3));
        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        ScheduleStage::new(Arc::new(courses), Arc::new(FixedClock(today)))
    }

    async fn enroll(course: i64) -> StageReply {
        let request =
            ValidationRequest::new("tok", "course.enroll", "enroll").with_meta(keys::COURSE_ID, course);
        stage().handle(request).await.unwrap()
    }

    #[tokio::test]
    async fn finished_term_closes_enrollment() {
        let reply = enroll(1).await;
        match reply.outcome {
            StageOutcome::Reject(rejection) => {
                assert_eq!(rejection.kind, RejectionKind::EnrollmentClosed)
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(
            reply.request.meta_str(keys::COURSE_PERIOD),
            Some("January-June 2025")
        );
    }

    #[tokio::test]
    async fn running_term_and_unscheduled_courses_pass() {
        assert_eq!(enroll(2).await.outcome, StageOutcome::Continue);
        assert_eq!(enroll(3).await.outcome, StageOutcome::Continue);
        assert_eq!(enroll(99).await.outcome, StageOutcome::Continue);
    }

    #[tokio::test]
    async fn other_actions_are_ignored() {
        let request =
            ValidationRequest::new("tok", "course.view", "view").with_meta(keys::COURSE_ID, 1);
        let reply = stage().handle(request).await.unwrap();
        assert_eq!(reply.outcome, StageOutcome::Continue);
    }
}
