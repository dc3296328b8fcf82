//! Observability sink for filtering.
//!
//! Reporters see which keys were dropped and which configuration gaps were
//! hit along the way. They never influence the filtered result and must not
//! block or fail.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Non-fatal condition absorbed during a filter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterWarning {
    /// The named fieldset is not registered for the entity type; the root
    /// level was filtered against an empty whitelist.
    UnknownFieldset { entity_type: String, fieldset: String },

    /// An `<name>_attributes` key names no association of the entity type;
    /// everything below it was dropped.
    AssociationUnresolved {
        entity_type: String,
        association: String,
    },

    /// A collection element was neither a map nor a scalar.
    MalformedCollectionElement {
        entity_type: String,
        key: String,
        index: usize,
        passed_through: bool,
    },
}

impl fmt::Display for FilterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterWarning::UnknownFieldset {
                entity_type,
                fieldset,
            } => write!(
                f,
                "No fieldset found with name '{}' for {}",
                fieldset, entity_type
            ),
            FilterWarning::AssociationUnresolved {
                entity_type,
                association,
            } => write!(
                f,
                "Association '{}' does not resolve on {}; nested attributes dropped",
                association, entity_type
            ),
            FilterWarning::MalformedCollectionElement {
                entity_type,
                key,
                index,
                passed_through,
            } => write!(
                f,
                "Element {} of '{}' on {} is neither a map nor a scalar ({})",
                index,
                key,
                entity_type,
                if *passed_through {
                    "passed through"
                } else {
                    "dropped"
                }
            ),
        }
    }
}

/// Receives rejected keys and warnings from the filter.
pub trait RemovalReporter {
    /// Keys dropped at one level of one entity type.
    fn report_rejected(&self, entity_type: &str, rejected: &BTreeSet<String>);

    fn report_warning(&self, warning: &FilterWarning) {
        tracing::warn!("{}", warning);
    }
}

impl<R: RemovalReporter + ?Sized> RemovalReporter for &R {
    fn report_rejected(&self, entity_type: &str, rejected: &BTreeSet<String>) {
        (**self).report_rejected(entity_type, rejected)
    }

    fn report_warning(&self, warning: &FilterWarning) {
        (**self).report_warning(warning)
    }
}

impl<R: RemovalReporter + ?Sized> RemovalReporter for Arc<R> {
    fn report_rejected(&self, entity_type: &str, rejected: &BTreeSet<String>) {
        (**self).report_rejected(entity_type, rejected)
    }

    fn report_warning(&self, warning: &FilterWarning) {
        (**self).report_warning(warning)
    }
}

/// Writes everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl RemovalReporter for TracingReporter {
    fn report_rejected(&self, entity_type: &str, rejected: &BTreeSet<String>) {
        tracing::info!(
            entity_type,
            removed = ?rejected,
            "removed protected attributes from mass assignment"
        );
    }
}

/// Discards rejections. Warnings still go to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl RemovalReporter for NullReporter {
    fn report_rejected(&self, _entity_type: &str, _rejected: &BTreeSet<String>) {}
}

/// Keeps everything it is told, for inspection by hosts and tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    rejected: Mutex<Vec<(String, BTreeSet<String>)>>,
    warnings: Mutex<Vec<FilterWarning>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(entity type, keys)` per reported level, in report order.
    pub fn rejected(&self) -> Vec<(String, BTreeSet<String>)> {
        self.rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every rejected key across all levels, flattened.
    pub fn rejected_keys(&self) -> BTreeSet<String> {
        self.rejected()
            .into_iter()
            .flat_map(|(_, keys)| keys)
            .collect()
    }

    pub fn warnings(&self) -> Vec<FilterWarning> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl RemovalReporter for CollectingReporter {
    fn report_rejected(&self, entity_type: &str, rejected: &BTreeSet<String>) {
        self.rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((entity_type.to_string(), rejected.clone()));
    }

    fn report_warning(&self, warning: &FilterWarning) {
        tracing::warn!("{}", warning);
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning.clone());
    }
}
