use super::{EntityTypeDescriptor, SchemaProvider};
use std::collections::BTreeMap;

/// Schema built from plain declarations.
///
/// Associations are explicit edges `(owner type, association name) -> target
/// type`; an edge to a type that was never declared resolves to `None`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchema {
    types: BTreeMap<String, EntityTypeDescriptor>,
    associations: BTreeMap<String, BTreeMap<String, String>>,
}

impl InMemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) an entity type.
    pub fn declare(&mut self, descriptor: EntityTypeDescriptor) {
        self.types.insert(descriptor.name().to_string(), descriptor);
    }

    pub fn with_type(mut self, descriptor: EntityTypeDescriptor) -> Self {
        self.declare(descriptor);
        self
    }

    /// Declare that `owner.association` points at `target`.
    pub fn associate(
        &mut self,
        owner: impl Into<String>,
        association: impl Into<String>,
        target: impl Into<String>,
    ) {
        self.associations
            .entry(owner.into())
            .or_default()
            .insert(association.into(), target.into());
    }

    pub fn with_association(
        mut self,
        owner: impl Into<String>,
        association: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.associate(owner, association, target);
        self
    }

    pub fn descriptor(&self, name: &str) -> Option<&EntityTypeDescriptor> {
        self.types.get(name)
    }

    /// Declared type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Association edges of a type as `(association, target)`, sorted.
    pub fn associations_of(&self, owner: &str) -> Vec<(&str, &str)> {
        self.associations
            .get(owner)
            .map(|edges| {
                edges
                    .iter()
                    .map(|(name, target)| (name.as_str(), target.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl SchemaProvider for InMemorySchema {
    fn resolve(
        &self,
        entity: &EntityTypeDescriptor,
        association: &str,
    ) -> Option<&EntityTypeDescriptor> {
        let target = self.associations.get(entity.name())?.get(association)?;
        self.types.get(target)
    }

    fn entity_type(&self, name: &str) -> Option<&EntityTypeDescriptor> {
        self.descriptor(name)
    }
}

// --- Test Fixtures ---
