//! # Massguard Architecture
//!
//! Massguard protects entity updates from **mass assignment**: a client submits
//! a nested tree of attributes, and only the parts the caller's role may set
//! survive. It is a library first; the `massguard` binary is a thin client for
//! trying policies out from the shell.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (main.rs, args.rs)                               │
//! │  - Parses arguments, reads payloads, prints JSON            │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs, config.rs)                              │
//! │  - MassGuard facade: entity name + fieldset + payload       │
//! │  - Policy files build registry and schema                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Filter Layer (filter.rs, report.rs)                        │
//! │  - Recursive whitelist filter, pure and re-entrant          │
//! │  - Rejections and warnings go to a RemovalReporter          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Model Layer (attributes/, policy.rs, schema/)              │
//! │  - Attribute trees and whitelist specs                      │
//! │  - Named fieldsets per entity type                          │
//! │  - SchemaProvider trait, InMemorySchema                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fieldsets
//!
//! A fieldset is a named whitelist for one entity type, e.g. `administrator` or
//! `student`. Filtering a `Student` payload under `student` uses the
//! `student` fieldset of `Student`; a bare grant on `grades_attributes` then
//! looks up the `student` fieldset of `Grade`. Permission is never inherited
//! downward, so a type that registers nothing under that name only admits its
//! always-accessible names.
//!
//! ## Key Principle: Never Fail Open
//!
//! Every gap in configuration (unknown fieldset, unresolved association,
//! unknown key) drops data rather than letting it through. The only fatal
//! condition during filtering is a payload nested deeper than the configured
//! cap, and it returns an error with no partial result.
//!
//! ## Example
//!
//! ```
//! use massguard::api::MassGuard;
//! use massguard::attributes::{AttrValue, WhitelistSpec};
//! use massguard::policy::PolicyRegistry;
//! use massguard::report::NullReporter;
//! use massguard::schema::memory::InMemorySchema;
//! use massguard::schema::EntityTypeDescriptor;
//! use serde_json::json;
//!
//! let schema = InMemorySchema::new()
//!     .with_type(EntityTypeDescriptor::new("Student").with_attributes(["full_name"]));
//! let mut registry = PolicyRegistry::new();
//! registry
//!     .register("Student", "administrator", WhitelistSpec::from_names(["full_name"]))
//!     .unwrap();
//!
//! let guard = MassGuard::new(registry, schema, NullReporter);
//! let payload = AttrValue::from(json!({"full_name": "Ada", "id": "7"}));
//! let filtered = guard.filter_for("Student", "administrator", &payload).unwrap();
//!
//! assert_eq!(filtered.into_value(), AttrValue::from(json!({"full_name": "Ada"})));
//! ```

pub mod api;
pub mod attributes;
pub mod config;
pub mod error;
pub mod filter;
pub mod policy;
pub mod report;
pub mod schema;
