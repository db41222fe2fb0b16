//! YAML-backed stand-in for the subject directory and course store.
//!
//! ```yaml
//! subjects:
//!   - { token: tok-ana, id: 7, name: Ana, email: ana@campus.test, role: teacher }
//! courses:
//!   - { id: 10, modality: presencial, enrolled: 34, period: January-June 2026 }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use coursegate_core_types::{CourseId, Role, Subject, SubjectId};
use coursegate_validation_chain::collaborators::{CourseReader, SubjectResolver};
use coursegate_validation_chain::errors::CollaboratorError;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read directory file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid directory file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("subject '{token}' has unknown role '{role}'")]
    UnknownRole { token: String, role: String },
    #[error("duplicate {kind} '{key}'")]
    Duplicate { kind: &'static str, key: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectoryFile {
    #[serde(default)]
    subjects: Vec<SubjectEntry>,
    #[serde(default)]
    courses: Vec<CourseEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubjectEntry {
    token: String,
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    role: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CourseEntry {
    id: i64,
    modality: String,
    #[serde(default)]
    enrolled: u32,
    #[serde(default)]
    period: Option<String>,
}

#[derive(Debug, Clone)]
struct CourseRow {
    modality: String,
    enrolled: u32,
    period: Option<String>,
}

/// Subjects keyed by token and courses keyed by id, read once at startup.
#[derive(Debug, Default)]
pub struct FixtureDirectory {
    subjects: HashMap<String, Subject>,
    courses: HashMap<CourseId, CourseRow>,
}

impl FixtureDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_yaml(content: &str) -> Result<Self, FixtureError> {
        if content.trim().is_empty() {
            return Ok(Self::empty());
        }
        let file: DirectoryFile = serde_yaml::from_str(content)?;

        let mut subjects = HashMap::new();
        for entry in file.subjects {
            let role: Role = entry.role.parse().map_err(|_| FixtureError::UnknownRole {
                token: entry.token.clone(),
                role: entry.role.clone(),
            })?;
            let subject = Subject {
                id: SubjectId(entry.id),
                name: entry.name,
                email: entry.email,
                role,
            };
            if subjects.insert(entry.token.clone(), subject).is_some() {
                return Err(FixtureError::Duplicate {
                    kind: "subject token",
                    key: entry.token,
                });
            }
        }

        let mut courses = HashMap::new();
        for entry in file.courses {
            let row = CourseRow {
                modality: entry.modality,
                enrolled: entry.enrolled,
                period: entry.period,
            };
            if courses.insert(CourseId(entry.id), row).is_some() {
                return Err(FixtureError::Duplicate {
                    kind: "course id",
                    key: entry.id.to_string(),
                });
            }
        }

        Ok(Self { subjects, courses })
    }

    pub async fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FixtureError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let directory = Self::from_yaml(&content)?;
        debug!(
            path = %path.display(),
            subjects = directory.subjects.len(),
            courses = directory.courses.len(),
            "directory loaded"
        );
        Ok(directory)
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }
}

#[async_trait]
impl SubjectResolver for FixtureDirectory {
    async fn resolve(&self, token: &str) -> Result<Option<Subject>, CollaboratorError> {
        Ok(self.subjects.get(token).cloned())
    }
}

#[async_trait]
impl CourseReader for FixtureDirectory {
    async fn course_type(&self, course: CourseId) -> Result<Option<String>, CollaboratorError> {
        Ok(self.courses.get(&course).map(|row| row.modality.clone()))
    }

    async fn count_enrollments(&self, course: CourseId) -> Result<u32, CollaboratorError> {
        Ok(self.courses.get(&course).map_or(0, |row| row.enrolled))
    }

    async fn course_period(&self, course: CourseId) -> Result<Option<String>, CollaboratorError> {
        Ok(self.courses.get(&course).and_then(|row| row.period.clone()))
    }
}
