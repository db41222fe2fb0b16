pub use crate::calendar::{AcademicPeriod, Clock, FixedClock, SystemClock, Term};
pub use crate::collaborators::{
    CourseReader, CourseRecord, InMemoryCourses, InMemorySubjects, SubjectResolver,
};
pub use crate::decision::Decision;
pub use crate::errors::{ChainError, CollaboratorError};
pub use crate::request::ValidationRequest;
pub use crate::service::{PipelineKind, PolicyService};
pub use crate::stages::academic_period::AcademicPeriodStage;
pub use crate::stages::auto_assign::AutoAssignOwnerStage;
pub use crate::stages::permission::PermissionStage;
pub use crate::stages::role::RoleStage;
pub use crate::stages::schedule::ScheduleStage;
pub use crate::stages::seat_capacity::SeatCapacityStage;
pub use crate::stages::token::TokenStage;
pub use crate::stages::view_filter::{DenyUnmatchedStage, ViewFilterStage};
pub use crate::stages::{Pipeline, PipelineBuilder, Stage, StageOutcome, StageReply};
pub use coursegate_core_types::{
    keys, CourseId, PeriodIssue, Rejection, RejectionKind, Role, Subject, SubjectId, ViewFilter,
};
