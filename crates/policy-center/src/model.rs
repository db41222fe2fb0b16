use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use coursegate_core_types::{CourseModality, Role};
use serde::{Deserialize, Serialize};

/// Sentinel permission granting every action.
pub const ALL_PERMISSION: &str = "all";

/// Lookup tables consulted by the role, permission and seat-capacity stages.
///
/// Mutation goes through the `add_*`/`set_*` methods, which are meant to run
/// while the process is bootstrapping. Once [`PolicyTables::freeze`] hands the
/// tables to the service they are shared read-only.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PolicyTables {
    pub rev: u64,
    pub resource_roles: BTreeMap<String, BTreeSet<Role>>,
    pub role_permissions: BTreeMap<Role, BTreeSet<String>>,
    pub action_permissions: BTreeMap<String, String>,
    pub capacity: CapacityPolicy,
    #[serde(default)]
    pub provenance: BTreeMap<String, PolicyProvenance>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CapacityPolicy {
    pub limits: BTreeMap<String, u32>,
    pub default_limit: u32,
    pub unresolved_course: UnresolvedCoursePolicy,
}

/// What the seat-capacity check does when the target course cannot be found.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedCoursePolicy {
    #[default]
    Allow,
    Reject,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyProvenance {
    pub path: String,
    pub source: PolicySource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PolicySource {
    Builtin,
    File,
    Env,
    Admin,
}

impl PolicyTables {
    /// Roles allowed on `resource`, or `None` when the resource is unclassified.
    pub fn allowed_roles(&self, resource: &str) -> Option<&BTreeSet<Role>> {
        self.resource_roles.get(resource.trim())
    }

    pub fn permissions_for(&self, role: Role) -> Option<&BTreeSet<String>> {
        self.role_permissions.get(&role)
    }

    pub fn has_all_permission(&self, role: Role) -> bool {
        self.permissions_for(role)
            .map(|perms| perms.contains(ALL_PERMISSION))
            .unwrap_or(false)
    }

    pub fn role_has_permission(&self, role: Role, permission: &str) -> bool {
        self.permissions_for(role)
            .map(|perms| perms.contains(permission))
            .unwrap_or(false)
    }

    /// Permission an action requires, or `None` when the action is unmapped.
    pub fn required_permission(&self, action: &str) -> Option<&str> {
        self.action_permissions
            .get(&normalize_action(action))
            .map(String::as_str)
    }

    pub fn seat_limit(&self, modality: &CourseModality) -> u32 {
        self.capacity
            .limits
            .get(modality.canonical())
            .copied()
            .unwrap_or(self.capacity.default_limit)
    }

    pub fn add_resource_roles<I>(&mut self, resource: &str, roles: I)
    where
        I: IntoIterator<Item = Role>,
    {
        let resource = resource.trim().to_string();
        self.resource_roles
            .entry(resource.clone())
            .or_default()
            .extend(roles);
        self.touch(&format!("resource_roles.{resource}"), PolicySource::Admin);
    }

    pub fn grant_permissions<I, S>(&mut self, role: Role, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role_permissions
            .entry(role)
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self.touch(&format!("role_permissions.{role}"), PolicySource::Admin);
    }

    pub fn map_action(&mut self, action: &str, permission: impl Into<String>) {
        let action = normalize_action(action);
        self.action_permissions
            .insert(action.clone(), permission.into());
        self.touch(&format!("action_permissions.{action}"), PolicySource::Admin);
    }

    pub fn set_seat_limit(&mut self, modality: &CourseModality, limit: u32) {
        let key = modality.canonical().to_string();
        self.capacity.limits.insert(key.clone(), limit);
        self.touch(&format!("capacity.limits.{key}"), PolicySource::Admin);
    }

    pub fn set_unresolved_course(&mut self, policy: UnresolvedCoursePolicy) {
        self.capacity.unresolved_course = policy;
        self.touch("capacity.unresolved_course", PolicySource::Admin);
    }

    pub fn set_provenance(&mut self, path: &str, source: PolicySource) {
        self.provenance.insert(
            path.to_string(),
            PolicyProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    /// Hand the tables over for shared read-only use.
    pub fn freeze(self) -> Arc<PolicyTables> {
        Arc::new(self)
    }

    fn touch(&mut self, path: &str, source: PolicySource) {
        self.rev = self.rev.saturating_add(1);
        self.set_provenance(path, source);
    }
}

pub(crate) fn normalize_action(action: &str) -> String {
    action.trim().to_ascii_lowercase()
}
