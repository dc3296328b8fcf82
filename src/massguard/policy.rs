//! Named fieldsets per entity type.
//!
//! The registry is filled once at startup through `&mut self` and then only
//! read, so it can be shared by reference across any number of threads.

use crate::attributes::WhitelistSpec;
use crate::error::{GuardError, Result};
use std::collections::BTreeMap;

/// Fieldsets keyed by entity type, then by fieldset name.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    fieldsets: BTreeMap<String, BTreeMap<String, WhitelistSpec>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `spec` under `fieldset` for `entity_type`.
    ///
    /// Re-registering a name replaces the previous spec.
    pub fn register(
        &mut self,
        entity_type: impl Into<String>,
        fieldset: impl Into<String>,
        spec: WhitelistSpec,
    ) -> Result<()> {
        let entity_type = entity_type.into();
        let fieldset = fieldset.into();
        if entity_type.is_empty() {
            return Err(GuardError::InvalidSpec("empty entity type name".into()));
        }
        if fieldset.is_empty() {
            return Err(GuardError::InvalidSpec(format!(
                "empty fieldset name for {}",
                entity_type
            )));
        }
        self.fieldsets
            .entry(entity_type)
            .or_default()
            .insert(fieldset, spec);
        Ok(())
    }

    /// Look up a fieldset. Names match exactly.
    pub fn resolve(&self, entity_type: &str, fieldset: &str) -> Option<&WhitelistSpec> {
        self.fieldsets.get(entity_type)?.get(fieldset)
    }

    /// Registered fieldset names for an entity type, sorted.
    pub fn fieldsets(&self, entity_type: &str) -> Vec<&str> {
        self.fieldsets
            .get(entity_type)
            .map(|sets| sets.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Entity types with at least one fieldset, sorted.
    pub fn entity_types(&self) -> Vec<&str> {
        self.fieldsets.keys().map(String::as_str).collect()
    }
}

/// How the caller names the whitelist for a filter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldsetSelector {
    /// A fieldset registered for the entity type. Its name is also used to
    /// pick fieldsets on associated types reached through a bare grant.
    Named(String),

    /// An ad hoc spec supplied with the call.
    Literal(WhitelistSpec),
}

impl FieldsetSelector {
    pub fn named(name: impl Into<String>) -> Self {
        FieldsetSelector::Named(name.into())
    }
}

impl From<&str> for FieldsetSelector {
    fn from(name: &str) -> Self {
        FieldsetSelector::Named(name.to_string())
    }
}

impl From<String> for FieldsetSelector {
    fn from(name: String) -> Self {
        FieldsetSelector::Named(name)
    }
}

impl From<WhitelistSpec> for FieldsetSelector {
    fn from(spec: WhitelistSpec) -> Self {
        FieldsetSelector::Literal(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PolicyRegistry {
        let mut registry = PolicyRegistry::new();
        registry
            .register("Student", "student", WhitelistSpec::from_names(["preferred_name"]))
            .unwrap();
        registry
            .register("Student", "administrator", WhitelistSpec::from_names(["full_name"]))
            .unwrap();
        registry
    }

    #[test]
    fn resolve_registered_fieldset() {
        let registry = registry();
        let spec = registry.resolve("Student", "student").unwrap();
        assert!(spec.contains("preferred_name"));
    }

    #[test]
    fn resolve_unknown_returns_none() {
        let registry = registry();
        assert!(registry.resolve("Student", "janitor").is_none());
        assert!(registry.resolve("Grade", "student").is_none());
    }

    #[test]
    fn names_are_exact() {
        let registry = registry();
        assert!(registry.resolve("Student", "Student").is_none());
        assert!(registry.resolve("student", "student").is_none());
    }

    #[test]
    fn reregistering_overwrites() {
        let mut registry = registry();
        registry
            .register("Student", "student", WhitelistSpec::from_names(["nickname"]))
            .unwrap();

        let spec = registry.resolve("Student", "student").unwrap();
        assert!(spec.contains("nickname"));
        assert!(!spec.contains("preferred_name"));
    }

    #[test]
    fn lists_fieldsets_and_types() {
        let registry = registry();
        assert_eq!(registry.fieldsets("Student"), vec!["administrator", "student"]);
        assert!(registry.fieldsets("Grade").is_empty());
        assert_eq!(registry.entity_types(), vec!["Student"]);
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut registry = PolicyRegistry::new();
        assert!(registry.register("", "student", WhitelistSpec::new()).is_err());
        assert!(registry.register("Student", "", WhitelistSpec::new()).is_err());
    }

    #[test]
    fn selector_conversions() {
        assert_eq!(
            FieldsetSelector::from("student"),
            FieldsetSelector::Named("student".into())
        );
        let spec = WhitelistSpec::from_names(["a"]);
        assert_eq!(
            FieldsetSelector::from(spec.clone()),
            FieldsetSelector::Literal(spec)
        );
    }
}
