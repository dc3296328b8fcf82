//! # API Facade
//!
//! [`MassGuard`] bundles a [`PolicyRegistry`], a [`SchemaProvider`] and a
//! [`RemovalReporter`] so callers only name the entity type, the fieldset and
//! the payload. It owns no logic of its own: every call builds an
//! [`AttributeFilter`] over shared references and runs it.
//!
//! ## Generic Over SchemaProvider
//!
//! `MassGuard<S, R>` is generic over the schema and the reporter:
//! - Hosts with their own model layer: `MassGuard<MyModels, MyReporter>`
//! - Policy files and tests: `MassGuard<InMemorySchema, TracingReporter>`
//!
//! A populated guard is read-only, so it can be shared across threads behind
//! an `Arc` or a plain reference.

use crate::attributes::AttrValue;
use crate::config::PolicyFile;
use crate::error::{GuardError, Result};
use crate::filter::{AttributeFilter, FilterOptions, Filtered};
use crate::policy::{FieldsetSelector, PolicyRegistry};
use crate::report::{RemovalReporter, TracingReporter};
use crate::schema::memory::InMemorySchema;
use crate::schema::{EntityTypeDescriptor, SchemaProvider};

pub struct MassGuard<S, R = TracingReporter> {
    registry: PolicyRegistry,
    schema: S,
    reporter: R,
    options: FilterOptions,
}

impl<S: SchemaProvider, R: RemovalReporter> MassGuard<S, R> {
    pub fn new(registry: PolicyRegistry, schema: S, reporter: R) -> Self {
        Self {
            registry,
            schema,
            reporter,
            options: FilterOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FilterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn options(&self) -> FilterOptions {
        self.options
    }

    /// Filter a payload for an entity descriptor the caller already holds.
    pub fn filter(
        &self,
        entity: &EntityTypeDescriptor,
        fieldset: impl Into<FieldsetSelector>,
        payload: &AttrValue,
    ) -> Result<Filtered> {
        AttributeFilter::new(&self.registry, &self.schema, &self.reporter)
            .with_options(self.options)
            .filter(payload, &fieldset.into(), entity)
    }

    /// Filter a payload for the entity type registered under `entity_type`.
    ///
    /// This is what a create or update path calls before handing the result
    /// to the persistence layer.
    pub fn filter_for(
        &self,
        entity_type: &str,
        fieldset: impl Into<FieldsetSelector>,
        payload: &AttrValue,
    ) -> Result<Filtered> {
        let entity = self
            .schema
            .entity_type(entity_type)
            .ok_or_else(|| GuardError::UnknownEntity(entity_type.to_string()))?;
        self.filter(entity, fieldset, payload)
    }
}

impl MassGuard<InMemorySchema, TracingReporter> {
    /// Build a guard from a validated policy file.
    pub fn from_policy_file(policy: &PolicyFile) -> Result<Self> {
        policy.validate()?;
        let guard = MassGuard::new(
            policy.build_registry()?,
            policy.build_schema(),
            TracingReporter,
        )
        .with_options(policy.options.filter_options());
        Ok(guard)
    }
}
