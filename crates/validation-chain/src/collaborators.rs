use std::collections::HashMap;

use async_trait::async_trait;
use coursegate_core_types::{CourseId, Subject};
use parking_lot::RwLock;

use crate::errors::CollaboratorError;

/// Resolves an opaque token to the subject it identifies.
#[async_trait]
pub trait SubjectResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<Subject>, CollaboratorError>;
}

/// Read side of the course store consulted by enrollment stages.
#[async_trait]
pub trait CourseReader: Send + Sync {
    /// Modality string of the course, `None` when the course is unknown.
    async fn course_type(&self, course: CourseId) -> Result<Option<String>, CollaboratorError>;

    async fn count_enrollments(&self, course: CourseId) -> Result<u32, CollaboratorError>;

    /// Academic period label the course runs in, when one is recorded.
    async fn course_period(&self, course: CourseId) -> Result<Option<String>, CollaboratorError>;
}

#[derive(Default)]
pub struct InMemorySubjects {
    by_token: RwLock<HashMap<String, Subject>>,
}

impl InMemorySubjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: impl Into<String>, subject: Subject) {
        self.by_token.write().insert(token.into(), subject);
    }
}

#[async_trait]
impl SubjectResolver for InMemorySubjects {
    async fn resolve(&self, token: &str) -> Result<Option<Subject>, CollaboratorError> {
        Ok(self.by_token.read().get(token).cloned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CourseRecord {
    pub modality: String,
    pub enrolled: u32,
    pub period: Option<String>,
}

impl CourseRecord {
    pub fn new(modality: impl Into<String>, enrolled: u32) -> Self {
        Self {
            modality: modality.into(),
            enrolled,
            period: None,
        }
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }
}

#[derive(Default)]
pub struct InMemoryCourses {
    courses: RwLock<HashMap<CourseId, CourseRecord>>,
}

impl InMemoryCourses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, course: CourseId, record: CourseRecord) {
        self.courses.write().insert(course, record);
    }
}

#[async_trait]
impl CourseReader for InMemoryCourses {
    async fn course_type(&self, course: CourseId) -> Result<Option<String>, CollaboratorError> {
        Ok(self
            .courses
            .read()
            .get(&course)
            .map(|record| record.modality.clone()))
    }

    async fn count_enrollments(&self, course: CourseId) -> Result<u32, CollaboratorError> {
        Ok(self
            .courses
            .read()
            .get(&course)
            .map(|record| record.enrolled)
            .unwrap_or(0))
    }

    async fn course_period(&self, course: CourseId) -> Result<Option<String>, CollaboratorError> {
        Ok(self
            .courses
            .read()
            .get(&course)
            .and_then(|record| record.period.clone()))
    }
}
