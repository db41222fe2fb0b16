use coursegate_core_types::{Rejection, Role};
use serde::Serialize;
use serde_json::{Map, Value};

/// Mutable context carried through a pipeline for one policy decision.
///
/// The decision fields are private: a request moves from undecided to
/// either approved or rejected exactly once, and only the pipeline runner
/// performs that transition.
#[derive(Clone, Debug, Serialize)]
pub struct ValidationRequest {
    request_id: String,
    #[serde(skip_serializing)]
    subject_token: String,
    subject_role: Option<Role>,
    resource: String,
    action: String,
    metadata: Map<String, Value>,
    approved: bool,
    error_reason: Option<Rejection>,
}

impl ValidationRequest {
    pub fn new(
        subject_token: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            subject_token: subject_token.into(),
            subject_role: None,
            resource: resource.into(),
            action: action.into(),
            metadata: Map::new(),
            approved: false,
            error_reason: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.subject_role = Some(role);
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert_meta(key, value);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn subject_token(&self) -> &str {
        &self.subject_token
    }

    pub fn subject_role(&self) -> Option<Role> {
        self.subject_role
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn action_is(&self, verb: &str) -> bool {
        self.action.trim().eq_ignore_ascii_case(verb)
    }

    pub fn action_in(&self, verbs: &[&str]) -> bool {
        verbs.iter().any(|verb| self.action_is(verb))
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key).filter(|value| !value.is_null())
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta(key).and_then(Value::as_str)
    }

    /// Integer metadata, accepting JSON numbers and numeric strings.
    pub fn meta_i64(&self, key: &str) -> Option<i64> {
        self.meta(key).and_then(value_as_i64)
    }

    pub fn insert_meta(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Returns `true` when the role was written.
    pub fn set_role_if_absent(&mut self, role: Role) -> bool {
        if self.subject_role.is_some() {
            return false;
        }
        self.subject_role = Some(role);
        true
    }

    pub fn is_approved(&self) -> bool {
        self.approved
    }

    pub fn error_reason(&self) -> Option<&Rejection> {
        self.error_reason.as_ref()
    }

    pub fn is_decided(&self) -> bool {
        self.approved || self.error_reason.is_some()
    }

    pub(crate) fn approve(&mut self) {
        if !self.is_decided() {
            self.approved = true;
        }
    }

    pub(crate) fn reject(&mut self, rejection: Rejection) {
        if !self.is_decided() {
            self.error_reason = Some(rejection);
        }
    }
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursegate_core_types::RejectionKind;
    use serde_json::json;

    #[test]
    fn decision_is_recorded_once() {
        let mut request = ValidationRequest::new("tok", "course.create", "create");
        request.reject(Rejection::new(RejectionKind::OwnerRequired, "first"));
        request.reject(Rejection::new(RejectionKind::InvalidOwnerId, "second"));
        request.approve();

        assert!(!request.is_approved());
        assert_eq!(
            request.error_reason().map(|r| r.kind),
            Some(RejectionKind::OwnerRequired)
        );
    }

    #[test]
    fn metadata_ids_accept_numeric_strings() {
        let request = ValidationRequest::new("tok", "course.enroll", "enroll")
            .with_meta("courseId", "42")
            .with_meta("ownerIdRequested", json!(7))
            .with_meta("periodRequested", Value::Null);

        assert_eq!(request.meta_i64("courseId"), Some(42));
        assert_eq!(request.meta_i64("ownerIdRequested"), Some(7));
        assert!(request.meta("periodRequested").is_none());
    }

    #[test]
    fn requests_are_not_deserializable() {
        // Resolves only while no `DeserializeOwned` impl exists; a second
        // impl makes the inferred parameter ambiguous and the test stops
        // compiling.
        trait AmbiguousIfDeserialize<A> {
            fn check() {}
        }
        impl<T: ?Sized> AmbiguousIfDeserialize<()> for T {}
        struct Deserializable;
        impl<T: ?Sized + serde::de::DeserializeOwned> AmbiguousIfDeserialize<Deserializable> for T {}

        <ValidationRequest as AmbiguousIfDeserialize<_>>::check();
    }

    #[test]
    fn serialized_decision_is_exclusive() {
        let mut request = ValidationRequest::new("tok", "course.create", "create");
        request.reject(Rejection::new(RejectionKind::OwnerRequired, "no owner"));
        request.approve();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["approved"], false);
        assert_eq!(body["error_reason"]["message"], "no owner");
    }

    #[test]
    fn serialized_request_omits_token() {
        let request = ValidationRequest::new("secret-token", "course.list", "list");
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("subject_token").is_none());
        assert_eq!(body["resource"], "course.list");
    }
}
