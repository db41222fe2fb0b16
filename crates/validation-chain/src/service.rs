use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use coursegate_core_types::CoreError;
use coursegate_policy_center::PolicyTables;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::Clock;
use crate::collaborators::{CourseReader, SubjectResolver};
use crate::errors::ChainError;
use crate::observe;
use crate::request::ValidationRequest;
use crate::stages::academic_period::AcademicPeriodStage;
use crate::stages::auto_assign::AutoAssignOwnerStage;
use crate::stages::permission::PermissionStage;
use crate::stages::role::RoleStage;
use crate::stages::schedule::ScheduleStage;
use crate::stages::seat_capacity::SeatCapacityStage;
use crate::stages::token::TokenStage;
use crate::stages::view_filter::{DenyUnmatchedStage, ViewFilterStage};
use crate::stages::{Pipeline, PipelineBuilder, Stage};

/// The standing pipeline configurations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineKind {
    General,
    CourseAuthoring,
    CourseListing,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 3] = [
        PipelineKind::General,
        PipelineKind::CourseAuthoring,
        PipelineKind::CourseListing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::General => "general",
            PipelineKind::CourseAuthoring => "courseAuthoring",
            PipelineKind::CourseListing => "courseListing",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "general" => Ok(PipelineKind::General),
            "courseauthoring" => Ok(PipelineKind::CourseAuthoring),
            "courselisting" => Ok(PipelineKind::CourseListing),
            _ => Err(CoreError::new(format!(
                "unknown pipeline '{raw}' (expected general, courseAuthoring or courseListing)"
            ))),
        }
    }
}

/// Builds the standing pipelines once and runs requests through them.
pub struct PolicyService {
    tables: Arc<PolicyTables>,
    general: Pipeline,
    authoring: Pipeline,
    listing: Pipeline,
}

impl PolicyService {
    pub fn new(
        tables: Arc<PolicyTables>,
        subjects: Arc<dyn SubjectResolver>,
        courses: Arc<dyn CourseReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let token: Arc<dyn Stage> = Arc::new(TokenStage::new(subjects));
        let role: Arc<dyn Stage> = Arc::new(RoleStage::new(Arc::clone(&tables)));
        let permission: Arc<dyn Stage> = Arc::new(PermissionStage::new(Arc::clone(&tables)));

        let general = PipelineBuilder::new(PipelineKind::General.as_str(), Arc::clone(&token))
            .then(Arc::clone(&role))
            .then(Arc::clone(&permission))
            .then(Arc::new(ScheduleStage::new(
                Arc::clone(&courses),
                Arc::clone(&clock),
            )))
            .then(Arc::new(SeatCapacityStage::new(
                Arc::clone(&tables),
                courses,
            )))
            .build();

        let authoring =
            PipelineBuilder::new(PipelineKind::CourseAuthoring.as_str(), Arc::clone(&token))
                .then(role)
                .then(permission)
                .then(Arc::new(AcademicPeriodStage::new(clock)))
                .then(Arc::new(AutoAssignOwnerStage::new()))
                .build();

        let listing = PipelineBuilder::new(PipelineKind::CourseListing.as_str(), token)
            .then(Arc::new(ViewFilterStage::admin()))
            .then(Arc::new(ViewFilterStage::teacher()))
            .then(Arc::new(ViewFilterStage::student()))
            .then(Arc::new(DenyUnmatchedStage))
            .build();

        debug!(
            general = ?general.stage_names(),
            authoring = ?authoring.stage_names(),
            listing = ?listing.stage_names(),
            rev = tables.rev,
            "policy pipelines built"
        );

        Self {
            tables,
            general,
            authoring,
            listing,
        }
    }

    pub fn tables(&self) -> &Arc<PolicyTables> {
        &self.tables
    }

    pub fn pipeline(&self, kind: PipelineKind) -> &Pipeline {
        match kind {
            PipelineKind::General => &self.general,
            PipelineKind::CourseAuthoring => &self.authoring,
            PipelineKind::CourseListing => &self.listing,
        }
    }

    /// Run `request` through the pipeline for `kind` and return it decided.
    pub async fn evaluate(
        &self,
        kind: PipelineKind,
        request: ValidationRequest,
    ) -> Result<ValidationRequest, ChainError> {
        let request_id = request.request_id().to_string();
        match self.pipeline(kind).run(request).await {
            Ok(done) => {
                let labels = observe::labels(kind.as_str(), &done);
                info!(
                    request_id = %done.request_id(),
                    approved = done.is_approved(),
                    labels = ?labels,
                    "policy decision"
                );
                Ok(done)
            }
            Err(err) => {
                warn!(
                    pipeline = kind.as_str(),
                    %request_id,
                    retryable = err.is_retryable(),
                    error = %err,
                    "policy evaluation aborted"
                );
                Err(err)
            }
        }
    }
}
