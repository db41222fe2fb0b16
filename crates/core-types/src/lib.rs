//! Shared vocabulary for the coursegate crates: subjects, roles, course
//! modalities, rejection kinds and the metadata keys stages agree on.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Shared error type for parsing the core vocabulary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{message}")]
    Message { message: String },
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SubjectId(pub i64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CourseId(pub i64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of subject roles.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" | "professor" => Ok(Role::Teacher),
            "admin" | "administrator" => Ok(Role::Admin),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

/// Identity returned by the subject resolver.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Delivery modality of a course. Unknown modalities are kept verbatim so
/// the capacity table can fall back to its default limit.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum CourseModality {
    Presencial,
    Hibrido,
    Virtual,
    Other(String),
}

impl CourseModality {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "presencial" => CourseModality::Presencial,
            "hibrido" | "híbrido" | "hybrid" => CourseModality::Hibrido,
            "virtual" => CourseModality::Virtual,
            _ => CourseModality::Other(normalized),
        }
    }

    /// Key used by the capacity table.
    pub fn canonical(&self) -> &str {
        match self {
            CourseModality::Presencial => "presencial",
            CourseModality::Hibrido => "hibrido",
            CourseModality::Virtual => "virtual",
            CourseModality::Other(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for CourseModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Scope of the course listing granted to a subject.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewFilter {
    All,
    ByTeacher,
    ByStudent,
}

impl ViewFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewFilter::All => "ALL",
            ViewFilter::ByTeacher => "BY_TEACHER",
            ViewFilter::ByStudent => "BY_STUDENT",
        }
    }
}

impl fmt::Display for ViewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a requested academic period was refused.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PeriodIssue {
    AlreadyPassed,
    InProgress,
    NotYetOpen,
    Unparsable,
}

impl PeriodIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodIssue::AlreadyPassed => "already_passed",
            PeriodIssue::InProgress => "in_progress",
            PeriodIssue::NotYetOpen => "not_yet_open",
            PeriodIssue::Unparsable => "unparsable",
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RejectionKind {
    InvalidToken,
    RoleNotAuthorized,
    PermissionDenied,
    CapacityExceeded,
    CourseNotFound,
    EnrollmentClosed,
    InvalidPeriod(PeriodIssue),
    CannotAssignOtherTeacher,
    OwnerRequired,
    InvalidOwnerId,
    NotAuthorizedToAuthorCourses,
}

impl RejectionKind {
    /// Stable code used in logs and caller responses.
    pub fn code(&self) -> &'static str {
        match self {
            RejectionKind::InvalidToken => "invalid_token",
            RejectionKind::RoleNotAuthorized => "role_not_authorized",
            RejectionKind::PermissionDenied => "permission_denied",
            RejectionKind::CapacityExceeded => "capacity_exceeded",
            RejectionKind::CourseNotFound => "course_not_found",
            RejectionKind::EnrollmentClosed => "enrollment_closed",
            RejectionKind::InvalidPeriod(_) => "invalid_period",
            RejectionKind::CannotAssignOtherTeacher => "cannot_assign_other_teacher",
            RejectionKind::OwnerRequired => "owner_required",
            RejectionKind::InvalidOwnerId => "invalid_owner_id",
            RejectionKind::NotAuthorizedToAuthorCourses => "not_authorized_to_author_courses",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::InvalidPeriod(issue) => write!(f, "invalid_period/{}", issue.as_str()),
            other => f.write_str(other.code()),
        }
    }
}

/// Rejection recorded on a request by the stage that refused it.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Metadata keys shared between callers and stages.
pub mod keys {
    pub const SUBJECT_ID: &str = "subjectId";
    pub const SUBJECT_NAME: &str = "subjectName";
    pub const SUBJECT_EMAIL: &str = "subjectEmail";

    pub const COURSE_ID: &str = "courseId";
    pub const COURSE_TYPE: &str = "courseType";
    pub const COURSE_PERIOD: &str = "coursePeriod";
    pub const SEAT_LIMIT: &str = "seatLimit";
    pub const ENROLLMENT_COUNT: &str = "enrollmentCount";
    pub const SEATS_AVAILABLE: &str = "seatsAvailable";

    pub const PERIOD_REQUESTED: &str = "periodRequested";
    pub const VALIDATED_PERIOD: &str = "validatedPeriod";
    pub const PERIOD_YEAR: &str = "periodYear";
    pub const PERIOD_TERM: &str = "periodTerm";

    pub const OWNER_ID_REQUESTED: &str = "ownerIdRequested";
    pub const AUTO_ASSIGNED: &str = "autoAssigned";

    pub const VIEW_FILTER: &str = "viewFilter";
    pub const VIEW_OWNER_ID: &str = "viewOwnerId";
    pub const VIEW_STUDENT_ID: &str = "viewStudentId";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_accepts_aliases() {
        assert_eq!("Professor".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!(" administrator ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert!(matches!(
            "janitor".parse::<Role>(),
            Err(CoreError::UnknownRole(_))
        ));
    }

    #[test]
    fn modality_aliases_share_capacity_key() {
        assert_eq!(CourseModality::parse("Hybrid").canonical(), "hibrido");
        assert_eq!(CourseModality::parse("híbrido").canonical(), "hibrido");
        assert_eq!(
            CourseModality::parse("Bootcamp"),
            CourseModality::Other("bootcamp".into())
        );
    }

    #[test]
    fn period_rejection_displays_issue() {
        let kind = RejectionKind::InvalidPeriod(PeriodIssue::InProgress);
        assert_eq!(kind.code(), "invalid_period");
        assert_eq!(kind.to_string(), "invalid_period/in_progress");
    }
}
