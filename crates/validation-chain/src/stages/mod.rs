use std::sync::Arc;

use async_trait::async_trait;
use coursegate_core_types::{CourseId, Rejection, RejectionKind};
use tracing::{debug, debug_span, info, Instrument};

use crate::errors::ChainError;
use crate::request::ValidationRequest;

pub mod academic_period;
pub mod auto_assign;
pub mod permission;
pub mod role;
pub mod schedule;
pub mod seat_capacity;
pub mod token;
pub mod view_filter;

/// One link of policy logic. Stages hold no per-request state: they take the
/// request, possibly annotate it, and hand it back with an outcome.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, request: ValidationRequest) -> Result<StageReply, ChainError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    Continue,
    /// Stop here and approve without visiting later stages.
    Approve,
    Reject(Rejection),
}

#[derive(Debug)]
pub struct StageReply {
    pub request: ValidationRequest,
    pub outcome: StageOutcome,
}

impl StageReply {
    pub fn proceed(request: ValidationRequest) -> Self {
        Self {
            request,
            outcome: StageOutcome::Continue,
        }
    }

    pub fn approve(request: ValidationRequest) -> Self {
        Self {
            request,
            outcome: StageOutcome::Approve,
        }
    }

    pub fn reject(
        request: ValidationRequest,
        kind: RejectionKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request,
            outcome: StageOutcome::Reject(Rejection::new(kind, message)),
        }
    }
}

struct Link {
    stage: Arc<dyn Stage>,
    next: Option<Arc<Link>>,
}

/// A fixed chain of stages, identified by its entry link.
#[derive(Clone)]
pub struct Pipeline {
    name: &'static str,
    entry: Arc<Link>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

pub struct PipelineBuilder {
    name: &'static str,
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn new(name: &'static str, entry: Arc<dyn Stage>) -> Self {
        Self {
            name,
            stages: vec![entry],
        }
    }

    pub fn then(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Pipeline {
        let mut next: Option<Arc<Link>> = None;
        let mut stages = self.stages;
        let entry_stage = stages.remove(0);
        for stage in stages.into_iter().rev() {
            next = Some(Arc::new(Link { stage, next }));
        }
        Pipeline {
            name: self.name,
            entry: Arc::new(Link {
                stage: entry_stage,
                next,
            }),
        }
    }
}

impl Pipeline {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut cursor = Some(&self.entry);
        while let Some(link) = cursor {
            names.push(link.stage.name());
            cursor = link.next.as_ref();
        }
        names
    }

    /// Walk the chain until a stage rejects or approves, or the chain ends.
    pub async fn run(&self, request: ValidationRequest) -> Result<ValidationRequest, ChainError> {
        if request.is_decided() {
            return Err(ChainError::AlreadyDecided {
                request_id: request.request_id().to_string(),
            });
        }

        let mut request = request;
        let mut cursor = Some(Arc::clone(&self.entry));
        while let Some(link) = cursor {
            let stage = link.stage.name();
            let span = debug_span!(
                "stage",
                pipeline = self.name,
                stage,
                request_id = %request.request_id()
            );
            let reply = link.stage.handle(request).instrument(span).await?;
            request = reply.request;
            match reply.outcome {
                StageOutcome::Continue => {
                    cursor = link.next.clone();
                }
                StageOutcome::Approve => {
                    debug!(pipeline = self.name, stage, "approved by short-circuit");
                    request.approve();
                    return Ok(request);
                }
                StageOutcome::Reject(rejection) => {
                    info!(
                        pipeline = self.name,
                        stage,
                        request_id = %request.request_id(),
                        kind = %rejection.kind,
                        "request rejected: {}",
                        rejection.message
                    );
                    request.reject(rejection);
                    return Ok(request);
                }
            }
        }

        request.approve();
        Ok(request)
    }
}

/// Course targeted by the request: `courseId` metadata first, then the first
/// numeric segment of the resource path that fits an id.
///
/// A `courseId` that is present but not an integer leaves the course
/// unresolved; the path is only consulted when the key is absent.
pub(crate) fn resolve_course_id(request: &ValidationRequest) -> Option<CourseId> {
    if request.meta(coursegate_core_types::keys::COURSE_ID).is_some() {
        return request
            .meta_i64(coursegate_core_types::keys::COURSE_ID)
            .map(CourseId);
    }
    request
        .resource()
        .split(['/', '.', ':'])
        .filter(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
        .find_map(|segment| segment.parse().ok())
        .map(CourseId)
}
