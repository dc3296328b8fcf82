//! # Attribute Filter
//!
//! Computes the largest subset of a submitted attribute tree that the caller
//! may assign, given a fieldset for the root entity type.
//!
//! ## Per-key decision
//!
//! At every level the whitelist in force is the explicit spec for that level
//! merged with the entity type's always-accessible names (or, below a `"all"`
//! grant, every own attribute of the type plus `_delete`). For each submitted
//! key:
//!
//! 1. A parenthesized suffix (`born_on(1i)`) is ignored for the lookup but kept
//!    in the output key.
//! 2. The key is admitted when it is whitelisted or is a numeric row index, and
//!    is not in the type's protected set. Below the root, `id` is always
//!    admitted so existing rows can be addressed.
//! 3. Scalars are kept as-is. Maps and lists recurse:
//!
//! | Key / grant | Nested payload filtered with |
//! |-------------|------------------------------|
//! | association + `AllowAll` | every own attribute of the target type |
//! | association + `Allowed` | the target type's fieldset of the same name, else nothing |
//! | `id` | kept verbatim |
//! | numeric index | the same spec and type as the current level |
//! | association + nested spec | that spec, against the target type |
//! | unresolved association | dropped entirely (warning reported) |
//! | plain key | the nested spec if any, else nothing, against the same type |
//!
//! Nesting is capped by [`FilterOptions::max_depth`]; exceeding it fails the
//! whole call with [`GuardError::DepthExceeded`] and no partial result.

use crate::attributes::{AttrMap, AttrValue, EffectiveWhitelist, WhitelistEntry, WhitelistSpec};
use crate::error::{GuardError, Result};
use crate::policy::{FieldsetSelector, PolicyRegistry};
use crate::report::{FilterWarning, RemovalReporter};
use crate::schema::{EntityTypeDescriptor, SchemaProvider, PRIMARY_KEY};
use std::collections::BTreeSet;
use tracing::{debug, debug_span};

/// Default cap on nested levels below the root payload.
pub const DEFAULT_MAX_DEPTH: usize = 20;

const ASSOCIATION_SUFFIX: &str = "_attributes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Deepest nest level a payload may reach (the root is level 0).
    pub max_depth: usize,

    /// Drop collection elements that are neither maps nor scalars instead of
    /// passing them through.
    pub strict_collections: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_collections: false,
        }
    }
}

impl FilterOptions {
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn strict_collections(mut self, strict: bool) -> Self {
        self.strict_collections = strict;
        self
    }
}

/// A key that was dropped, addressed by its dotted path from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub entity_type: String,
    pub path: String,
}

/// Result of a filter call.
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    /// The safe payload, in submitted order.
    pub attributes: AttrMap,
    /// Everything that was dropped, in encounter order.
    pub rejected: Vec<Rejection>,
}

impl Filtered {
    pub fn rejected_paths(&self) -> Vec<&str> {
        self.rejected.iter().map(|r| r.path.as_str()).collect()
    }

    /// Whether nothing was dropped.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn into_value(self) -> AttrValue {
        AttrValue::Map(self.attributes)
    }
}

/// The recursive filter, bound to a registry, a schema and a reporter.
///
/// Holds only shared references, so one filter (or many) can run on any
/// number of threads once the registry and schema are populated.
pub struct AttributeFilter<'a, S: ?Sized, R: ?Sized> {
    registry: &'a PolicyRegistry,
    schema: &'a S,
    reporter: &'a R,
    options: FilterOptions,
}

impl<'a, S, R> AttributeFilter<'a, S, R>
where
    S: SchemaProvider + ?Sized,
    R: RemovalReporter + ?Sized,
{
    pub fn new(registry: &'a PolicyRegistry, schema: &'a S, reporter: &'a R) -> Self {
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

    pub fn options(&self) -> FilterOptions {
        self.options
    }

    /// Filter `payload` for `entity` under `fieldset`.
    ///
    /// An unknown fieldset name filters against an empty whitelist and is
    /// reported as a warning. Warnings and rejected keys reach the reporter
    /// only when the call succeeds, warnings first; a failed call reports
    /// nothing.
    pub fn filter(
        &self,
        payload: &AttrValue,
        fieldset: &FieldsetSelector,
        entity: &EntityTypeDescriptor,
    ) -> Result<Filtered> {
        let AttrValue::Map(submitted) = payload else {
            return Err(GuardError::MalformedPayload(format!(
                "expected a map of attributes, got {}",
                payload.kind()
            )));
        };

        let _span = debug_span!("filter", entity_type = entity.name()).entered();

        let mut warnings = Vec::new();
        let (spec, active_fieldset) = match fieldset {
            FieldsetSelector::Named(name) => match self.registry.resolve(entity.name(), name) {
                Some(spec) => (spec, Some(name.as_str())),
                None => {
                    warnings.push(FilterWarning::UnknownFieldset {
                        entity_type: entity.name().to_string(),
                        fieldset: name.clone(),
                    });
                    (WhitelistSpec::empty(), None)
                }
            },
            FieldsetSelector::Literal(spec) => (spec, None),
        };

        let mut walk = Walk {
            registry: self.registry,
            schema: self.schema,
            options: self.options,
            fieldset: active_fieldset,
            rejected: Vec::new(),
            reports: Vec::new(),
            warnings,
        };
        let root = Level {
            spec: LevelSpec::Explicit(spec),
            entity,
            depth: 0,
        };
        let attributes = walk.filter_map(submitted, root, "")?;

        for warning in &walk.warnings {
            self.reporter.report_warning(warning);
        }
        for (entity_type, keys) in &walk.reports {
            self.reporter.report_rejected(entity_type, keys);
        }

        Ok(Filtered {
            attributes,
            rejected: walk.rejected,
        })
    }
}

/// The explicit spec in force at a level.
#[derive(Debug, Clone, Copy)]
enum LevelSpec<'w> {
    Explicit(&'w WhitelistSpec),
    /// Inside an `"all"` grant.
    AllAttributes,
}

#[derive(Debug, Clone, Copy)]
struct Level<'w> {
    spec: LevelSpec<'w>,
    entity: &'w EntityTypeDescriptor,
    depth: usize,
}

impl<'w> Level<'w> {
    fn descend(self, spec: LevelSpec<'w>, entity: &'w EntityTypeDescriptor) -> Self {
        Level {
            spec,
            entity,
            depth: self.depth + 1,
        }
    }
}

/// An admitted key whose value needs recursion.
struct Slot<'s, 'w> {
    key: &'s str,
    name: &'s str,
    entry: Option<&'w WhitelistEntry>,
    level: Level<'w>,
}

/// State of one filter call.
struct Walk<'w, S: ?Sized> {
    registry: &'w PolicyRegistry,
    schema: &'w S,
    options: FilterOptions,
    /// Fieldset name threaded down to bare association grants.
    fieldset: Option<&'w str>,
    rejected: Vec<Rejection>,
    reports: Vec<(&'w str, BTreeSet<String>)>,
    warnings: Vec<FilterWarning>,
}

impl<'w, S> Walk<'w, S>
where
    S: SchemaProvider + ?Sized,
{
    /// Buffer a warning; an identical one is only kept once per call, so an
    /// unresolved association in the array form warns once, not per row.
    fn warn(&mut self, warning: FilterWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    fn filter_map(&mut self, submitted: &AttrMap, level: Level<'w>, path: &str) -> Result<AttrMap> {
        if level.depth > self.options.max_depth {
            return Err(GuardError::DepthExceeded {
                max: self.options.max_depth,
                actual: level.depth,
            });
        }

        let entity = level.entity;
        let whitelist = match level.spec {
            LevelSpec::Explicit(spec) => EffectiveWhitelist::merged(spec, entity.accessible()),
            LevelSpec::AllAttributes => EffectiveWhitelist::all_attributes(entity.attributes()),
        };

        let mut kept = AttrMap::with_capacity(submitted.len());
        let mut rejected = BTreeSet::new();

        for (key, value) in submitted {
            let name = authorization_name(key);
            let entry = whitelist.get(name);
            let key_path = join_path(path, key);

            let admitted = ((entry.is_some() || is_index_key(key)) && !entity.is_protected(name))
                || (level.depth > 0 && key == PRIMARY_KEY);
            if !admitted {
                debug!(
                    entity_type = entity.name(),
                    key = %key,
                    allowed = ?whitelist.names(),
                    "not updating attribute; not in allowed set"
                );
                self.rejected.push(Rejection {
                    entity_type: entity.name().to_string(),
                    path: key_path,
                });
                rejected.insert(key.clone());
                continue;
            }

            let slot = Slot {
                key,
                name,
                entry,
                level,
            };
            let filtered = match value {
                AttrValue::Map(map) => self.filter_nested(&slot, map, &key_path)?,
                AttrValue::List(items) => self.filter_collection(&slot, items, &key_path)?,
                leaf => leaf.clone(),
            };
            kept.insert(key.as_str(), filtered);
        }

        if !rejected.is_empty() {
            self.reports.push((entity.name(), rejected));
        }
        Ok(kept)
    }

    fn filter_nested(&mut self, slot: &Slot<'_, 'w>, map: &AttrMap, path: &str) -> Result<AttrValue> {
        let schema = self.schema;
        let registry = self.registry;
        let level = slot.level;
        let association = association_name(slot.name);
        let target = association.and_then(|name| schema.resolve(level.entity, name));

        let next = match (slot.entry, target) {
            (Some(WhitelistEntry::AllowAll), Some(target)) => {
                level.descend(LevelSpec::AllAttributes, target)
            }
            (Some(WhitelistEntry::Allowed), Some(target)) => {
                // Nested permission is not inherited: the target type must
                // opt in with a fieldset of the same name.
                let spec = self
                    .fieldset
                    .and_then(|fieldset| registry.resolve(target.name(), fieldset))
                    .unwrap_or(WhitelistSpec::empty());
                level.descend(LevelSpec::Explicit(spec), target)
            }
            _ if slot.key == PRIMARY_KEY => return Ok(AttrValue::Map(map.clone())),
            _ if is_index_key(slot.key) => level.descend(level.spec, level.entity),
            (entry, Some(target)) => level.descend(nested_or_empty(entry), target),
            (entry, None) => match association {
                Some(association) => {
                    self.warn(FilterWarning::AssociationUnresolved {
                        entity_type: level.entity.name().to_string(),
                        association: association.to_string(),
                    });
                    self.drop_all(level.entity, map, path);
                    return Ok(AttrValue::Map(AttrMap::new()));
                }
                None => level.descend(nested_or_empty(entry), level.entity),
            },
        };

        self.filter_map(map, next, path).map(AttrValue::Map)
    }

    fn drop_all(&mut self, entity: &'w EntityTypeDescriptor, map: &AttrMap, path: &str) {
        let mut dropped = BTreeSet::new();
        for key in map.keys() {
            self.rejected.push(Rejection {
                entity_type: entity.name().to_string(),
                path: join_path(path, key),
            });
            dropped.insert(key.to_string());
        }
        if !dropped.is_empty() {
            self.reports.push((entity.name(), dropped));
        }
    }

    fn filter_collection(
        &mut self,
        slot: &Slot<'_, 'w>,
        items: &[AttrValue],
        path: &str,
    ) -> Result<AttrValue> {
        let mut kept = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                AttrValue::Map(map) => {
                    let item_path = join_path(path, &index.to_string());
                    kept.push(self.filter_nested(slot, map, &item_path)?);
                }
                AttrValue::List(_) => {
                    let passed_through = !self.options.strict_collections;
                    self.warn(FilterWarning::MalformedCollectionElement {
                        entity_type: slot.level.entity.name().to_string(),
                        key: slot.key.to_string(),
                        index,
                        passed_through,
                    });
                    if passed_through {
                        kept.push(item.clone());
                    } else {
                        self.rejected.push(Rejection {
                            entity_type: slot.level.entity.name().to_string(),
                            path: join_path(path, &index.to_string()),
                        });
                    }
                }
                leaf => kept.push(leaf.clone()),
            }
        }
        Ok(AttrValue::List(kept))
    }
}

fn nested_or_empty(entry: Option<&WhitelistEntry>) -> LevelSpec<'_> {
    LevelSpec::Explicit(
        entry
            .and_then(WhitelistEntry::nested_spec)
            .unwrap_or(WhitelistSpec::empty()),
    )
}

/// Key name used for whitelist lookup: everything from the first `(` is
/// dropped when something follows it (`born_on(1i)` -> `born_on`).
pub fn authorization_name(key: &str) -> &str {
    match key.find('(') {
        Some(open) if open + 1 < key.len() => &key[..open],
        _ => key,
    }
}

/// Association addressed by a `<name>_attributes` key.
pub fn association_name(name: &str) -> Option<&str> {
    name.strip_suffix(ASSOCIATION_SUFFIX)
        .filter(|association| !association.is_empty())
}

/// Numeric keys index sibling rows of a to-many collection form.
pub fn is_index_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
