use std::sync::Arc;

use async_trait::async_trait;
use coursegate_core_types::{keys, PeriodIssue, RejectionKind};

use crate::calendar::{assess, open_periods, AcademicPeriod, Clock};
use crate::errors::ChainError;
use crate::request::ValidationRequest;
use crate::stages::{Stage, StageReply};

/// Validates `periodRequested` on course authoring: only terms that have not
/// started yet may be targeted.
pub struct AcademicPeriodStage {
    pub clock: Arc<dyn Clock>,
}

impl AcademicPeriodStage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl Stage for AcademicPeriodStage {
    fn name(&self) -> &'static str {
        "academic_period"
    }

    async fn handle(&self, mut request: ValidationRequest) -> Result<StageReply, ChainError> {
        if !request.action_in(&["create", "edit"]) {
            return Ok(StageReply::proceed(request));
        }

        let requested = request
            .meta(keys::PERIOD_REQUESTED)
            .map(|value| value.as_str().map(str::to_string));
        let raw = match requested {
            Some(Some(raw)) => raw,
            Some(None) => {
                return Ok(reject_period(
                    request,
                    PeriodIssue::Unparsable,
                    "period must be a string such as 'January-June 2026'".into(),
                ));
            }
            // An edit that leaves the period alone has nothing to validate.
            None if request.action_is("edit") => return Ok(StageReply::proceed(request)),
            None => {
                return Ok(reject_period(
                    request,
                    PeriodIssue::Unparsable,
                    "an academic period is required to create a course".into(),
                ));
            }
        };

        let period = match AcademicPeriod::parse(&raw) {
            Ok(period) => period,
            Err(err) => {
                return Ok(reject_period(request, PeriodIssue::Unparsable, err.to_string()));
            }
        };

        let today = self.clock.today();
        if let Err(issue) = assess(period, today) {
            let message = match issue {
                PeriodIssue::AlreadyPassed => format!("{period} has already passed"),
                PeriodIssue::InProgress => format!("{period} is already in progress"),
                PeriodIssue::NotYetOpen => format!(
                    "{period} is not open for authoring yet; open terms: {}",
                    describe(&open_periods(today))
                ),
                PeriodIssue::Unparsable => format!("{period} could not be read"),
            };
            return Ok(reject_period(request, issue, message));
        }

        request.insert_meta(keys::VALIDATED_PERIOD, period.label());
        request.insert_meta(keys::PERIOD_YEAR, period.year);
        request.insert_meta(keys::PERIOD_TERM, period.term.code());
        Ok(StageReply::proceed(request))
    }
}

fn reject_period(request: ValidationRequest, issue: PeriodIssue, message: String) -> StageReply {
    StageReply::reject(request, RejectionKind::InvalidPeriod(issue), message)
}

fn describe(periods: &[AcademicPeriod]) -> String {
    periods
        .iter()
        .map(AcademicPeriod::label)
        .collect::<Vec<_>>()
        .join(", ")
}
