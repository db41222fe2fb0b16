use crate::defaults::default_tables;
use crate::loader::{load_tables, load_tables_with_options, LoadOptions};
use crate::model::{PolicySource, UnresolvedCoursePolicy};
use crate::PolicyError;
use coursegate_core_types::{CourseModality, Role};
use std::env;
use std::sync::{Mutex, OnceLock};

#[test]
fn default_tables_carry_modality_limits() {
    let tables = default_tables();
    assert_eq!(tables.seat_limit(&CourseModality::Presencial), 35);
    assert_eq!(tables.seat_limit(&CourseModality::parse("hybrid")), 35);
    assert_eq!(tables.seat_limit(&CourseModality::Virtual), 45);
    assert_eq!(tables.seat_limit(&CourseModality::parse("bootcamp")), 45);
    assert_eq!(
        tables.capacity.unresolved_course,
        UnresolvedCoursePolicy::Allow
    );
}

#[test]
fn admin_holds_all_and_students_cannot_author() {
    let tables = default_tables();
    assert!(tables.has_all_permission(Role::Admin));
    assert!(!tables.has_all_permission(Role::Teacher));
    assert_eq!(tables.required_permission(" Create "), Some("create_course"));
    assert!(!tables.role_has_permission(Role::Student, "create_course"));
    let authors = tables.allowed_roles("course.create").expect("mapped");
    assert!(!authors.contains(&Role::Student));
    assert!(tables.allowed_roles("course.unknown").is_none());
}

#[test]
fn add_mapping_bumps_revision_and_records_admin_source() {
    let mut tables = default_tables();
    let rev = tables.rev;
    tables.add_resource_roles("syllabus.publish", [Role::Teacher]);
    tables.map_action("publish", "publish_syllabus");
    tables.grant_permissions(Role::Teacher, ["publish_syllabus"]);
    tables.set_seat_limit(&CourseModality::parse("lab"), 20);

    assert_eq!(tables.rev, rev + 4);
    assert_eq!(tables.required_permission("publish"), Some("publish_syllabus"));
    assert!(tables.role_has_permission(Role::Teacher, "publish_syllabus"));
    assert_eq!(tables.seat_limit(&CourseModality::parse("LAB")), 20);
    assert_eq!(
        tables
            .provenance
            .get("resource_roles.syllabus.publish")
            .expect("provenance")
            .source,
        PolicySource::Admin
    );

    let frozen = tables.freeze();
    assert!(frozen.allowed_roles("syllabus.publish").is_some());
}

#[test]
fn file_overlay_replaces_entries() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("policy.yaml");
    std::fs::write(
        &file_path,
        r#"resource_roles:
  course.delete: [admin, professor]
action_permissions:
  archive: archive_course
capacity:
  limits:
    virtual: 60
  unresolved_course: reject
"#,
    )
    .unwrap();

    let tables = load_tables(Some(&file_path)).unwrap();
    let roles = tables.allowed_roles("course.delete").unwrap();
    assert!(roles.contains(&Role::Teacher));
    assert_eq!(tables.required_permission("archive"), Some("archive_course"));
    assert_eq!(tables.seat_limit(&CourseModality::Virtual), 60);
    assert_eq!(
        tables.capacity.unresolved_course,
        UnresolvedCoursePolicy::Reject
    );
    assert_eq!(
        tables
            .provenance
            .get("capacity.limits.virtual")
            .unwrap()
            .source,
        PolicySource::File
    );
    assert_eq!(
        tables
            .provenance
            .get("capacity.limits.presencial")
            .unwrap()
            .source,
        PolicySource::Builtin
    );
}

#[test]
fn unknown_role_in_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("policy.yaml");
    std::fs::write(&file_path, "resource_roles:\n  course.delete: [janitor]\n").unwrap();

    let options = LoadOptions {
        paths: vec![file_path],
        include_env: false,
    };
    let err = load_tables_with_options(&options).unwrap_err();
    assert!(matches!(err, PolicyError::InvalidValue(_)));
}

#[test]
fn env_overrides_capacity_and_record_provenance() {
    let _guard = env_guard().lock().unwrap();
    env::set_var("COURSEGATE_POLICY__CAPACITY__LIMITS__HYBRID", "30");
    env::set_var("COURSEGATE_POLICY__CAPACITY__DEFAULT_LIMIT", "50");
    let tables = load_tables(None).expect("load tables");
    env::remove_var("COURSEGATE_POLICY__CAPACITY__LIMITS__HYBRID");
    env::remove_var("COURSEGATE_POLICY__CAPACITY__DEFAULT_LIMIT");

    assert_eq!(tables.seat_limit(&CourseModality::Hibrido), 30);
    assert_eq!(tables.capacity.default_limit, 50);
    assert_eq!(
        tables
            .provenance
            .get("capacity.limits.hibrido")
            .expect("provenance")
            .source,
        PolicySource::Env
    );
}

#[test]
fn env_json_overlay_applies_after_scalars() {
    let _guard = env_guard().lock().unwrap();
    env::set_var(
        "COURSEGATE_POLICY_OVERRIDE_JSON",
        r#"{"role_permissions": {"student": ["list_courses"]}}"#,
    );
    let tables = load_tables(None).expect("load tables with json");
    env::remove_var("COURSEGATE_POLICY_OVERRIDE_JSON");

    assert!(!tables.role_has_permission(Role::Student, "enroll"));
    assert!(tables.role_has_permission(Role::Student, "list_courses"));
}

#[test]
fn unsupported_env_path_fails() {
    let _guard = env_guard().lock().unwrap();
    env::set_var("COURSEGATE_POLICY__CALENDAR__GAP_MONTH", "8");
    let result = load_tables(None);
    env::remove_var("COURSEGATE_POLICY__CALENDAR__GAP_MONTH");
    assert!(matches!(result, Err(PolicyError::UnsupportedPath(_))));
}

fn env_guard() -> &'static Mutex<()> {
    static ENV_GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_GUARD.get_or_init(|| Mutex::new(()))
}
