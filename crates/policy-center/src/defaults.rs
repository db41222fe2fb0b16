use std::collections::{BTreeMap, BTreeSet};

use coursegate_core_types::Role;

use crate::model::{CapacityPolicy, PolicyTables, UnresolvedCoursePolicy, ALL_PERMISSION};

pub fn default_tables() -> PolicyTables {
    PolicyTables {
        rev: 1,
        resource_roles: resource_roles(),
        role_permissions: role_permissions(),
        action_permissions: action_permissions(),
        capacity: CapacityPolicy {
            limits: BTreeMap::from([
                ("presencial".to_string(), 35),
                ("hibrido".to_string(), 35),
                ("virtual".to_string(), 45),
            ]),
            default_limit: 45,
            unresolved_course: UnresolvedCoursePolicy::Allow,
        },
        provenance: Default::default(),
    }
}

fn resource_roles() -> BTreeMap<String, BTreeSet<Role>> {
    use Role::{Admin, Student, Teacher};

    [
        ("course.list", vec![Student, Teacher, Admin]),
        ("course.view", vec![Student, Teacher, Admin]),
        ("course.create", vec![Teacher, Admin]),
        ("course.edit", vec![Teacher, Admin]),
        ("course.clone", vec![Teacher, Admin]),
        ("course.delete", vec![Admin]),
        ("course.enroll", vec![Student, Admin]),
        ("material.upload", vec![Teacher, Admin]),
        ("material.view", vec![Student, Teacher, Admin]),
        ("grade.submit", vec![Teacher, Admin]),
        ("report.generate", vec![Teacher, Admin]),
        ("user.manage", vec![Admin]),
    ]
    .into_iter()
    .map(|(resource, roles)| (resource.to_string(), roles.into_iter().collect()))
    .collect()
}

fn role_permissions() -> BTreeMap<Role, BTreeSet<String>> {
    let student = [
        "list_courses",
        "view_course",
        "enroll",
        "view_material",
    ];
    let teacher = [
        "list_courses",
        "view_course",
        "create_course",
        "edit_course",
        "clone_course",
        "upload_material",
        "view_material",
        "grade",
        "generate_report",
    ];

    BTreeMap::from([
        (Role::Student, to_set(&student)),
        (Role::Teacher, to_set(&teacher)),
        (Role::Admin, to_set(&[ALL_PERMISSION])),
    ])
}

fn action_permissions() -> BTreeMap<String, String> {
    [
        ("list", "list_courses"),
        ("view", "view_course"),
        ("create", "create_course"),
        ("edit", "edit_course"),
        ("clone", "clone_course"),
        ("delete", "delete_course"),
        ("enroll", "enroll"),
        ("upload", "upload_material"),
        ("grade", "grade"),
        ("report", "generate_report"),
        ("manage_users", "manage_users"),
    ]
    .into_iter()
    .map(|(action, permission)| (action.to_string(), permission.to_string()))
    .collect()
}

fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}
