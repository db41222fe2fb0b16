use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use coursegate_core_types::{CourseModality, Role};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::defaults::default_tables;
use crate::errors::PolicyError;
use crate::model::{normalize_action, PolicySource, PolicyTables, UnresolvedCoursePolicy};

const ENV_PREFIX: &str = "COURSEGATE_POLICY__";
const ENV_JSON: &str = "COURSEGATE_POLICY_OVERRIDE_JSON";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

pub fn load_tables(path: Option<&Path>) -> Result<PolicyTables, PolicyError> {
    let mut options = LoadOptions {
        include_env: true,
        ..LoadOptions::default()
    };
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    load_tables_with_options(&options)
}

/// Builtin defaults, then each existing file in order, then environment.
pub fn load_tables_with_options(options: &LoadOptions) -> Result<PolicyTables, PolicyError> {
    let mut tables = default_tables();
    bootstrap_builtin_provenance(&mut tables);

    for path in &options.paths {
        if path.exists() {
            if let Some(overlay) = overlay_from_file(path)? {
                apply_overlay(&mut tables, overlay, PolicySource::File)?;
                info!(path = %path.display(), rev = tables.rev, "Loaded policy tables");
            }
        }
    }

    if options.include_env {
        for (path, value) in scalar_overrides_from_env() {
            apply_override_to_tables(&mut tables, &path, &value, PolicySource::Env)?;
        }
        if let Some(overlay) = overlay_from_env_json()? {
            apply_overlay(&mut tables, overlay, PolicySource::Env)?;
        }
    }

    Ok(tables)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TablesOverlay {
    #[serde(default)]
    resource_roles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    role_permissions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    action_permissions: BTreeMap<String, String>,
    #[serde(default)]
    capacity: Option<CapacityOverlay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CapacityOverlay {
    #[serde(default)]
    limits: BTreeMap<String, u32>,
    #[serde(default)]
    default_limit: Option<u32>,
    #[serde(default)]
    unresolved_course: Option<UnresolvedCoursePolicy>,
}

fn overlay_from_file(path: &Path) -> Result<Option<TablesOverlay>, PolicyError> {
    let content = fs::read_to_string(path).map_err(|err| PolicyError::Io(format!("{}", err)))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    // YAML is a superset of JSON, so one parser covers both file flavours.
    let overlay: TablesOverlay =
        serde_yaml::from_str(&content).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    Ok(Some(overlay))
}

fn overlay_from_env_json() -> Result<Option<TablesOverlay>, PolicyError> {
    let Ok(raw_json) = env::var(ENV_JSON) else {
        return Ok(None);
    };
    if raw_json.trim().is_empty() {
        return Ok(None);
    }
    let overlay: TablesOverlay = serde_json::from_str(&raw_json)
        .map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    Ok(Some(overlay))
}

fn scalar_overrides_from_env() -> Vec<(String, Value)> {
    let mut overrides = Vec::new();
    for (key, raw) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                continue;
            }
            overrides.push((path, parse_env_value(&raw)));
        }
    }
    overrides.sort_by(|a, b| a.0.cmp(&b.0));
    overrides
}

fn apply_overlay(
    tables: &mut PolicyTables,
    overlay: TablesOverlay,
    source: PolicySource,
) -> Result<(), PolicyError> {
    for (resource, roles) in overlay.resource_roles {
        let resource = resource.trim().to_string();
        let roles = parse_roles(&roles)?;
        tables.resource_roles.insert(resource.clone(), roles);
        record_change(tables, &format!("resource_roles.{resource}"), source);
    }

    for (role, permissions) in overlay.role_permissions {
        let role: Role = role
            .parse()
            .map_err(|err| PolicyError::InvalidValue(format!("{err}")))?;
        let permissions = permissions
            .into_iter()
            .map(|perm| perm.trim().to_string())
            .collect::<BTreeSet<_>>();
        tables.role_permissions.insert(role, permissions);
        record_change(tables, &format!("role_permissions.{role}"), source);
    }

    for (action, permission) in overlay.action_permissions {
        let action = normalize_action(&action);
        tables
            .action_permissions
            .insert(action.clone(), permission.trim().to_string());
        record_change(tables, &format!("action_permissions.{action}"), source);
    }

    if let Some(capacity) = overlay.capacity {
        for (modality, limit) in capacity.limits {
            let path = format!("capacity.limits.{modality}");
            apply_override_to_tables(tables, &path, &Value::from(limit), source)?;
        }
        if let Some(limit) = capacity.default_limit {
            apply_override_to_tables(
                tables,
                "capacity.default_limit",
                &Value::from(limit),
                source,
            )?;
        }
        if let Some(policy) = capacity.unresolved_course {
            let raw = match policy {
                UnresolvedCoursePolicy::Allow => "allow",
                UnresolvedCoursePolicy::Reject => "reject",
            };
            apply_override_to_tables(
                tables,
                "capacity.unresolved_course",
                &Value::from(raw),
                source,
            )?;
        }
    }

    Ok(())
}

pub(crate) fn apply_override_to_tables(
    tables: &mut PolicyTables,
    path: &str,
    value: &Value,
    source: PolicySource,
) -> Result<(), PolicyError> {
    let recorded_path = match path {
        "capacity.default_limit" => {
            tables.capacity.default_limit = to_u32(value)?;
            path.to_string()
        }
        "capacity.unresolved_course" => {
            tables.capacity.unresolved_course = to_unresolved_policy(value)?;
            path.to_string()
        }
        other => match other.strip_prefix("capacity.limits.") {
            Some(modality) if !modality.is_empty() => {
                let key = CourseModality::parse(modality).canonical().to_string();
                tables.capacity.limits.insert(key.clone(), to_u32(value)?);
                format!("capacity.limits.{key}")
            }
            _ => return Err(PolicyError::UnsupportedPath(other.to_string())),
        },
    };
    record_change(tables, &recorded_path, source);
    Ok(())
}

fn record_change(tables: &mut PolicyTables, path: &str, source: PolicySource) {
    tables.rev = tables.rev.saturating_add(1);
    tables.set_provenance(path, source);
}

fn parse_roles(raw: &[String]) -> Result<BTreeSet<Role>, PolicyError> {
    raw.iter()
        .map(|role| {
            role.parse::<Role>()
                .map_err(|err| PolicyError::InvalidValue(format!("{err}")))
        })
        .collect()
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return Value::Bool(boolean);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return Value::Number(int_val.into());
    }
    Value::String(raw.to_string())
}

fn to_u32(value: &Value) -> Result<u32, PolicyError> {
    value
        .as_u64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected integer, got {value}")))
        .and_then(|v| {
            u32::try_from(v).map_err(|_| PolicyError::InvalidValue(format!("value {v} exceeds u32")))
        })
}

fn to_unresolved_policy(value: &Value) -> Result<UnresolvedCoursePolicy, PolicyError> {
    match value.as_str().map(|raw| raw.trim().to_ascii_lowercase()) {
        Some(raw) if raw == "allow" => Ok(UnresolvedCoursePolicy::Allow),
        Some(raw) if raw == "reject" => Ok(UnresolvedCoursePolicy::Reject),
        _ => Err(PolicyError::InvalidValue(format!(
            "expected \"allow\" or \"reject\", got {value}"
        ))),
    }
}

fn bootstrap_builtin_provenance(tables: &mut PolicyTables) {
    let mut paths = Vec::new();
    paths.extend(
        tables
            .resource_roles
            .keys()
            .map(|resource| format!("resource_roles.{resource}")),
    );
    paths.extend(
        tables
            .role_permissions
            .keys()
            .map(|role| format!("role_permissions.{role}")),
    );
    paths.extend(
        tables
            .action_permissions
            .keys()
            .map(|action| format!("action_permissions.{action}")),
    );
    paths.extend(
        tables
            .capacity
            .limits
            .keys()
            .map(|modality| format!("capacity.limits.{modality}")),
    );
    paths.push("capacity.default_limit".into());
    paths.push("capacity.unresolved_course".into());

    for path in paths {
        tables.set_provenance(&path, PolicySource::Builtin);
    }
}
