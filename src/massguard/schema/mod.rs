//! # Schema Layer
//!
//! The filter never touches real entities. It only asks what an entity type
//! declares: its attribute names, which of them are always accessible, which
//! are never mass-assignable, and which type an association points at.
//!
//! That question is behind the [`SchemaProvider`] trait so hosts can answer it
//! from their own model layer. [`memory::InMemorySchema`] answers it from
//! plain declarations and backs the policy file loader and the tests.

use std::collections::BTreeSet;

pub mod memory;

/// Attribute that is never mass-assignable unless listed otherwise.
pub const PRIMARY_KEY: &str = "id";

/// What one entity type declares about its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeDescriptor {
    name: String,
    attributes: BTreeSet<String>,
    accessible: BTreeSet<String>,
    protected: BTreeSet<String>,
}

impl EntityTypeDescriptor {
    /// A type with no attributes whose primary key is protected.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeSet::new(),
            accessible: BTreeSet::new(),
            protected: BTreeSet::from([PRIMARY_KEY.to_string()]),
        }
    }

    /// Full attribute set, realized by wildcard grants.
    pub fn with_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Names every fieldset admits for this type.
    pub fn with_accessible<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accessible.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replace the never-mass-assignable set.
    pub fn with_protected<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    pub fn accessible(&self) -> &BTreeSet<String> {
        &self.accessible
    }

    pub fn protected(&self) -> &BTreeSet<String> {
        &self.protected
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected.contains(name)
    }
}

/// Resolves association names to the descriptor of the target type.
///
/// Implementations must be pure lookups. `None` means the association does
/// not exist on `entity`; it is never an error.
pub trait SchemaProvider {
    /// Target type of `association` (the `<name>` in `<name>_attributes`).
    fn resolve(
        &self,
        entity: &EntityTypeDescriptor,
        association: &str,
    ) -> Option<&EntityTypeDescriptor>;

    /// Descriptor of a root entity type by name.
    ///
    /// `MassGuard::filter_for` looks the root type up here and fails with
    /// `UnknownEntity` on `None`.
    fn entity_type(&self, name: &str) -> Option<&EntityTypeDescriptor>;
}

impl<S: SchemaProvider + ?Sized> SchemaProvider for &S {
    fn resolve(
        &self,
        entity: &EntityTypeDescriptor,
        association: &str,
    ) -> Option<&EntityTypeDescriptor> {
        (**self).resolve(entity, association)
    }

    fn entity_type(&self, name: &str) -> Option<&EntityTypeDescriptor> {
        (**self).entity_type(name)
    }
}
