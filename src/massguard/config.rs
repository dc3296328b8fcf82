use crate::attributes::WhitelistSpec;
use crate::error::{GuardError, Result};
use crate::filter::{FilterOptions, DEFAULT_MAX_DEPTH};
use crate::policy::PolicyRegistry;
use crate::schema::memory::InMemorySchema;
use crate::schema::{EntityTypeDescriptor, PRIMARY_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Filter options as written in a policy file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuardOptions {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Never-mass-assignable names for entity types that don't list their own.
    #[serde(default = "default_protected")]
    pub protected_attributes: Vec<String>,

    #[serde(default)]
    pub strict_collections: bool,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_protected() -> Vec<String> {
    vec![PRIMARY_KEY.to_string()]
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            protected_attributes: default_protected(),
            strict_collections: false,
        }
    }
}

impl GuardOptions {
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions::default()
            .max_depth(self.max_depth)
            .strict_collections(self.strict_collections)
    }
}

/// One entity type: its schema and its fieldsets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityDecl {
    #[serde(default)]
    pub attributes: Vec<String>,

    /// Names every fieldset admits.
    #[serde(default)]
    pub accessible: Vec<String>,

    /// Overrides `options.protected_attributes` for this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<Vec<String>>,

    /// Association name -> target entity type.
    #[serde(default)]
    pub associations: BTreeMap<String, String>,

    #[serde(default)]
    pub fieldsets: BTreeMap<String, WhitelistSpec>,
}

/// A complete policy: options plus every entity type, loaded from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyFile {
    #[serde(default)]
    pub options: GuardOptions,

    #[serde(default)]
    pub entities: BTreeMap<String, EntityDecl>,
}

impl PolicyFile {
    /// Load a policy from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(GuardError::Io)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let policy: PolicyFile =
            serde_json::from_str(content).map_err(GuardError::Serialization)?;
        Ok(policy)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(GuardError::Serialization)
    }

    /// Check that every name is non-empty and every association points at a
    /// declared entity type.
    pub fn validate(&self) -> Result<()> {
        for (name, decl) in &self.entities {
            if name.is_empty() {
                return Err(GuardError::InvalidSpec("empty entity type name".into()));
            }
            for (association, target) in &decl.associations {
                if association.is_empty() {
                    return Err(GuardError::InvalidSpec(format!(
                        "empty association name on {}",
                        name
                    )));
                }
                if !self.entities.contains_key(target) {
                    return Err(GuardError::InvalidSpec(format!(
                        "association '{}' on {} points at undeclared type '{}'",
                        association, name, target
                    )));
                }
            }
            if decl.fieldsets.keys().any(String::is_empty) {
                return Err(GuardError::InvalidSpec(format!(
                    "empty fieldset name on {}",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn build_schema(&self) -> InMemorySchema {
        let mut schema = InMemorySchema::new();
        for (name, decl) in &self.entities {
            let protected = decl
                .protected
                .as_ref()
                .unwrap_or(&self.options.protected_attributes);
            schema.declare(
                EntityTypeDescriptor::new(name.as_str())
                    .with_attributes(decl.attributes.iter().cloned())
                    .with_accessible(decl.accessible.iter().cloned())
                    .with_protected(protected.iter().cloned()),
            );
            for (association, target) in &decl.associations {
                schema.associate(name.as_str(), association.as_str(), target.as_str());
            }
        }
        schema
    }

    pub fn build_registry(&self) -> Result<PolicyRegistry> {
        let mut registry = PolicyRegistry::new();
        for (name, decl) in &self.entities {
            for (fieldset, spec) in &decl.fieldsets {
                registry.register(name.as_str(), fieldset.as_str(), spec.clone())?;
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::WhitelistEntry;
    use crate::schema::SchemaProvider;
    use std::io::Write;

    const SCHOOL: &str = r#"{
        "entities": {
            "Student": {
                "attributes": ["full_name", "preferred_name"],
                "associations": {"grades": "Grade", "profile": "Profile"},
                "fieldsets": {
                    "administrator": ["full_name", {"grades_attributes": ["override_letter_grade"]}],
                    "student": ["preferred_name", {"profile_attributes": "all"}]
                }
            },
            "Grade": {
                "attributes": ["letter_grade", "class_id", "override_letter_grade"],
                "accessible": ["class_id"]
            },
            "Profile": {"attributes": ["favorite_sport"]}
        }
    }"#;

    #[test]
    fn test_default_options() {
        let policy = PolicyFile::from_json_str(SCHOOL).unwrap();
        assert_eq!(policy.options, GuardOptions::default());
        assert_eq!(policy.options.filter_options(), FilterOptions::default());
    }

    #[test]
    fn test_options_override() {
        let policy = PolicyFile::from_json_str(
            r#"{"options": {"max_depth": 3, "strict_collections": true}}"#,
        )
        .unwrap();
        let options = policy.options.filter_options();
        assert_eq!(options.max_depth, 3);
        assert!(options.strict_collections);
        assert_eq!(policy.options.protected_attributes, vec!["id"]);
    }

    #[test]
    fn test_builds_registry() {
        let policy = PolicyFile::from_json_str(SCHOOL).unwrap();
        let registry = policy.build_registry().unwrap();

        assert_eq!(registry.fieldsets("Student"), vec!["administrator", "student"]);
        let student = registry.resolve("Student", "student").unwrap();
        assert_eq!(
            student.get("profile_attributes"),
            Some(&WhitelistEntry::AllowAll)
        );
    }

    #[test]
    fn test_builds_schema() {
        let policy = PolicyFile::from_json_str(SCHOOL).unwrap();
        let schema = policy.build_schema();

        let student = schema.descriptor("Student").unwrap();
        assert!(student.is_protected("id"));
        let grade = schema.resolve(student, "grades").unwrap();
        assert!(grade.accessible().contains("class_id"));
    }

    #[test]
    fn test_per_entity_protected_override() {
        let policy = PolicyFile::from_json_str(
            r#"{"entities": {"Tag": {"attributes": ["id", "label"], "protected": []}}}"#,
        )
        .unwrap();
        let schema = policy.build_schema();
        assert!(!schema.descriptor("Tag").unwrap().is_protected("id"));
    }

    #[test]
    fn test_validate_undeclared_target() {
        let policy = PolicyFile::from_json_str(
            r#"{"entities": {"Student": {"associations": {"lockers": "Locker"}}}}"#,
        )
        .unwrap();
        let err = policy.validate().unwrap_err();
        assert!(matches!(err, GuardError::InvalidSpec(msg) if msg.contains("Locker")));
    }

    #[test]
    fn test_validate_ok() {
        PolicyFile::from_json_str(SCHOOL).unwrap().validate().unwrap();
    }

    #[test]
    fn test_invalid_spec_is_a_parse_error() {
        let err = PolicyFile::from_json_str(
            r#"{"entities": {"Student": {"fieldsets": {"student": [""]}}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GuardError::Serialization(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCHOOL.as_bytes()).unwrap();

        let policy = PolicyFile::load(file.path()).unwrap();
        assert_eq!(policy.entities.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PolicyFile::load("/nonexistent/massguard/policy.json").unwrap_err();
        assert!(matches!(err, GuardError::Io(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let policy = PolicyFile::from_json_str(SCHOOL).unwrap();
        let again = PolicyFile::from_json_str(&policy.to_json_string().unwrap()).unwrap();
        assert_eq!(policy, again);
    }
}
