use std::collections::BTreeMap;

use crate::request::ValidationRequest;

/// Structured labels attached to decision events.
pub fn labels(pipeline: &str, request: &ValidationRequest) -> BTreeMap<&'static str, String> {
    let mut map = BTreeMap::new();
    map.insert("pipeline", pipeline.to_string());
    map.insert("resource", request.resource().to_string());
    map.insert("action", request.action().to_string());
    if let Some(role) = request.subject_role() {
        map.insert("role", role.to_string());
    }
    match request.error_reason() {
        Some(rejection) => {
            map.insert("code", rejection.kind.to_string());
        }
        None if request.is_approved() => {
            map.insert("code", "approved".to_string());
        }
        None => {}
    }
    map
}
