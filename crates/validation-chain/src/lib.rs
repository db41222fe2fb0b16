pub mod calendar;
pub mod collaborators;
pub mod decision;
pub mod errors;
pub mod observe;
pub mod prelude;
pub mod request;
pub mod service;
pub mod stages;

pub use request::ValidationRequest;
pub use service::{PipelineKind, PolicyService};
pub use stages::{Pipeline, PipelineBuilder, Stage, StageOutcome, StageReply};
