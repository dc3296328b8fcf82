#![allow(dead_code)]

use massguard::api::MassGuard;
use massguard::attributes::{AttrValue, WhitelistSpec};
use massguard::policy::PolicyRegistry;
use massguard::report::CollectingReporter;
use massguard::schema::memory::InMemorySchema;
use massguard::schema::EntityTypeDescriptor;

pub type SchoolGuard = MassGuard<InMemorySchema, CollectingReporter>;

pub fn json(value: serde_json::Value) -> AttrValue {
    AttrValue::from(value)
}

pub fn spec(value: serde_json::Value) -> WhitelistSpec {
    WhitelistSpec::from_value(&AttrValue::from(value)).unwrap()
}

/// Student with grades (to-many) and a profile (to-one).
pub fn school_schema() -> InMemorySchema {
    InMemorySchema::new()
        .with_type(EntityTypeDescriptor::new("Student").with_attributes(["full_name", "preferred_name"]))
        .with_type(
            EntityTypeDescriptor::new("Grade")
                .with_attributes(["letter_grade", "class_id", "override_letter_grade"])
                .with_accessible(["class_id"]),
        )
        .with_type(EntityTypeDescriptor::new("Profile").with_attributes(["favorite_sport", "hometown"]))
        .with_association("Student", "grades", "Grade")
        .with_association("Student", "profile", "Profile")
}

/// Fieldsets of the school: administrators fix grades, students edit their
/// own profile, instructors may touch grades through the Grade fieldset.
pub fn school_registry() -> PolicyRegistry {
    let mut registry = PolicyRegistry::new();
    registry
        .register(
            "Student",
            "administrator",
            spec(serde_json::json!(["full_name", {"grades_attributes": ["override_letter_grade"]}])),
        )
        .unwrap();
    registry
        .register(
            "Student",
            "student",
            spec(serde_json::json!(["preferred_name", {"profile_attributes": "all"}])),
        )
        .unwrap();
    registry
        .register("Student", "instructor", spec(serde_json::json!(["grades_attributes"])))
        .unwrap();
    registry
}

pub fn school_guard() -> SchoolGuard {
    MassGuard::new(school_registry(), school_schema(), CollectingReporter::new())
}
