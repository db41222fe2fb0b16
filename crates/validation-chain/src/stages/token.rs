use std::sync::Arc;

use async_trait::async_trait;
use coursegate_core_types::{keys, RejectionKind};
use tracing::{debug, warn};

use crate::collaborators::SubjectResolver;
use crate::errors::ChainError;
use crate::request::ValidationRequest;
use crate::stages::{Stage, StageReply};

/// Resolves the subject token and records who is asking.
pub struct TokenStage {
    pub resolver: Arc<dyn SubjectResolver>,
}

impl TokenStage {
    pub fn new(resolver: Arc<dyn SubjectResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Stage for TokenStage {
    fn name(&self) -> &'static str {
        "token"
    }

    async fn handle(&self, mut request: ValidationRequest) -> Result<StageReply, ChainError> {
        let Some(token) = normalize_token(request.subject_token()) else {
            return Ok(StageReply::reject(
                request,
                RejectionKind::InvalidToken,
                "missing or malformed subject token",
            ));
        };

        let subject = match self.resolver.resolve(&token).await {
            Ok(Some(subject)) => subject,
            Ok(None) => {
                return Ok(StageReply::reject(
                    request,
                    RejectionKind::InvalidToken,
                    "token does not resolve to a known subject",
                ));
            }
            Err(err) => {
                warn!(stage = self.name(), error = %err, "subject lookup failed");
                return Err(ChainError::collaborator(self.name(), err));
            }
        };

        if !request.set_role_if_absent(subject.role) {
            debug!(
                preset = ?request.subject_role(),
                resolved = %subject.role,
                "keeping caller-provided role"
            );
        }
        request.insert_meta(keys::SUBJECT_ID, subject.id.0);
        request.insert_meta(keys::SUBJECT_NAME, subject.name);
        request.insert_meta(keys::SUBJECT_EMAIL, subject.email);
        Ok(StageReply::proceed(request))
    }
}

fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    // The auth scheme is case-insensitive; a bare scheme carries no token.
    let token = match trimmed.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        None if trimmed.eq_ignore_ascii_case("bearer") => "",
        _ => trimmed,
    };
    if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }
    Some(token.to_string())
}
