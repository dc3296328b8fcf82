//! Whitelist literals and the grants they parse into.
//!
//! A whitelist spec says which keys of a payload may be assigned at one level
//! and, for association keys, how the nested payload is filtered in turn.
//! Specs are usually written as literals (`["full_name", {"grades_attributes":
//! ["override_letter_grade"]}]`) and normalized here into a keyed form.

use super::AttrValue;
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Literal marking a wildcard grant in a spec.
pub const ALLOW_ALL_LITERAL: &str = "all";

/// Literal marking a bare grant in a spec.
pub const ALLOWED_LITERAL: &str = "true";

/// Synthetic key that marks a nested collection row for deletion.
pub const DELETE_MARKER: &str = "_delete";

static EMPTY_SPEC: WhitelistSpec = WhitelistSpec {
    entries: BTreeMap::new(),
};

static ALLOWED: WhitelistEntry = WhitelistEntry::Allowed;

/// Permission granted to a single key.
///
/// A key that is absent from a spec is denied; there is no explicit variant
/// for it. Variants are ordered by permissiveness: `Allowed < Nested < AllowAll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhitelistEntry {
    /// Bare inclusion. On an association key the nested payload is filtered
    /// with the target type's fieldset of the same name.
    Allowed,

    /// Explicit nested whitelist for an association or nested map.
    Nested(WhitelistSpec),

    /// Every own attribute of the association's target type, but none of its
    /// further associations.
    AllowAll,
}

impl WhitelistEntry {
    fn rank(&self) -> u8 {
        match self {
            WhitelistEntry::Allowed => 0,
            WhitelistEntry::Nested(_) => 1,
            WhitelistEntry::AllowAll => 2,
        }
    }

    /// Combine two grants for the same key, keeping the more permissive one.
    /// Two nested specs are unioned.
    pub fn merge(self, other: WhitelistEntry) -> WhitelistEntry {
        match (self, other) {
            (WhitelistEntry::Nested(left), WhitelistEntry::Nested(right)) => {
                WhitelistEntry::Nested(left.union(right))
            }
            (left, right) => {
                if right.rank() > left.rank() {
                    right
                } else {
                    left
                }
            }
        }
    }

    /// The nested spec, if this entry carries one.
    pub fn nested_spec(&self) -> Option<&WhitelistSpec> {
        match self {
            WhitelistEntry::Nested(spec) => Some(spec),
            _ => None,
        }
    }

    fn from_value(name: &str, value: &AttrValue) -> Result<Self> {
        match value {
            AttrValue::Scalar(s) if s == ALLOW_ALL_LITERAL => Ok(WhitelistEntry::AllowAll),
            AttrValue::Scalar(s) if s == ALLOWED_LITERAL => Ok(WhitelistEntry::Allowed),
            AttrValue::Null => Ok(WhitelistEntry::Nested(WhitelistSpec::new())),
            other => WhitelistSpec::from_value(other)
                .map(WhitelistEntry::Nested)
                .map_err(|e| GuardError::InvalidSpec(format!("under '{}': {}", name, e))),
        }
    }

    fn to_value(&self) -> AttrValue {
        match self {
            WhitelistEntry::Allowed => AttrValue::scalar(ALLOWED_LITERAL),
            WhitelistEntry::AllowAll => AttrValue::scalar(ALLOW_ALL_LITERAL),
            WhitelistEntry::Nested(spec) => AttrValue::from(spec.clone()),
        }
    }
}

/// A normalized whitelist: key name to grant.
///
/// Inserting a key twice merges the grants (see [`WhitelistEntry::merge`]),
/// so building a spec from overlapping literals never loses a permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AttrValue", into = "AttrValue")]
pub struct WhitelistSpec {
    entries: BTreeMap<String, WhitelistEntry>,
}

impl WhitelistSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared empty spec (deny everything).
    pub fn empty() -> &'static WhitelistSpec {
        &EMPTY_SPEC
    }

    /// Build a flat spec from attribute names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(Self::new(), |spec, name| spec.allow(name))
    }

    /// Grant a bare key.
    pub fn allow(mut self, name: impl Into<String>) -> Self {
        self.insert(name, WhitelistEntry::Allowed);
        self
    }

    /// Grant every own attribute of an association.
    pub fn allow_all(mut self, name: impl Into<String>) -> Self {
        self.insert(name, WhitelistEntry::AllowAll);
        self
    }

    /// Grant a key with an explicit nested whitelist.
    pub fn nested(mut self, name: impl Into<String>, spec: WhitelistSpec) -> Self {
        self.insert(name, WhitelistEntry::Nested(spec));
        self
    }

    /// Add a grant, merging with any existing grant for the same key.
    pub fn insert(&mut self, name: impl Into<String>, entry: WhitelistEntry) {
        let name = name.into();
        let merged = match self.entries.remove(&name) {
            Some(existing) => existing.merge(entry),
            None => entry,
        };
        self.entries.insert(name, merged);
    }

    pub fn get(&self, name: &str) -> Option<&WhitelistEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WhitelistEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of two specs. Conflicting grants collapse to the more permissive.
    pub fn union(mut self, other: WhitelistSpec) -> WhitelistSpec {
        for (name, entry) in other.entries {
            self.insert(name, entry);
        }
        self
    }

    /// Normalize a spec literal.
    ///
    /// Accepted shapes:
    /// - a bare name: `"grades_attributes"`
    /// - a list of names and/or maps (nested lists are flattened)
    /// - a map of `name -> "all" | "true" | name | list | map`
    ///
    /// A nested scalar other than `"all"` or `"true"` is a one-name nested spec.
    pub fn from_value(value: &AttrValue) -> Result<Self> {
        let mut spec = WhitelistSpec::new();
        spec.absorb(value)?;
        Ok(spec)
    }

    fn absorb(&mut self, value: &AttrValue) -> Result<()> {
        match value {
            AttrValue::Null => {}
            AttrValue::Scalar(name) => {
                if name.is_empty() {
                    return Err(GuardError::InvalidSpec("empty attribute name".into()));
                }
                self.insert(name.as_str(), WhitelistEntry::Allowed);
            }
            AttrValue::List(items) => {
                for item in items {
                    self.absorb(item)?;
                }
            }
            AttrValue::Map(map) => {
                for (name, nested) in map {
                    if name.is_empty() {
                        return Err(GuardError::InvalidSpec("empty attribute name".into()));
                    }
                    let entry = WhitelistEntry::from_value(name, nested)?;
                    self.insert(name.as_str(), entry);
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<AttrValue> for WhitelistSpec {
    type Error = GuardError;

    fn try_from(value: AttrValue) -> Result<Self> {
        WhitelistSpec::from_value(&value)
    }
}

impl From<WhitelistSpec> for AttrValue {
    /// Render back to the literal form: bare names first, then one map holding
    /// every nested or wildcard grant.
    fn from(spec: WhitelistSpec) -> Self {
        let mut items = Vec::new();
        let mut grants = super::AttrMap::new();
        for (name, entry) in &spec.entries {
            match entry {
                WhitelistEntry::Allowed => items.push(AttrValue::scalar(name.as_str())),
                other => {
                    grants.insert(name.as_str(), other.to_value());
                }
            }
        }
        if !grants.is_empty() {
            items.push(AttrValue::Map(grants));
        }
        AttrValue::List(items)
    }
}

/// The whitelist in force at one recursion level.
///
/// Either the explicit spec merged with the entity type's always-accessible
/// names, or (inside a wildcard grant) every own attribute of the type plus
/// the [`DELETE_MARKER`].
#[derive(Debug, Clone, Copy)]
pub enum EffectiveWhitelist<'a> {
    Merged {
        explicit: &'a WhitelistSpec,
        accessible: &'a BTreeSet<String>,
    },
    AllAttributes {
        attributes: &'a BTreeSet<String>,
    },
}

impl<'a> EffectiveWhitelist<'a> {
    pub fn merged(explicit: &'a WhitelistSpec, accessible: &'a BTreeSet<String>) -> Self {
        EffectiveWhitelist::Merged {
            explicit,
            accessible,
        }
    }

    pub fn all_attributes(attributes: &'a BTreeSet<String>) -> Self {
        EffectiveWhitelist::AllAttributes { attributes }
    }

    /// Look up the grant for a key. `None` means denied.
    ///
    /// An always-accessible name only ever adds a bare grant, so an explicit
    /// entry for the same key is always at least as permissive and wins.
    pub fn get(&self, name: &str) -> Option<&'a WhitelistEntry> {
        match *self {
            EffectiveWhitelist::Merged {
                explicit,
                accessible,
            } => explicit
                .get(name)
                .or_else(|| accessible.contains(name).then_some(&ALLOWED)),
            EffectiveWhitelist::AllAttributes { attributes } => {
                (attributes.contains(name) || name == DELETE_MARKER).then_some(&ALLOWED)
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every key this whitelist admits, sorted.
    pub fn names(&self) -> Vec<&'a str> {
        let names: BTreeSet<&str> = match *self {
            EffectiveWhitelist::Merged {
                explicit,
                accessible,
            } => explicit
                .names()
                .chain(accessible.iter().map(String::as_str))
                .collect(),
            EffectiveWhitelist::AllAttributes { attributes } => attributes
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(DELETE_MARKER))
                .collect(),
        };
        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> WhitelistSpec {
        WhitelistSpec::from_value(&AttrValue::from(value)).unwrap()
    }

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_name_is_single_grant() {
        let parsed = spec(json!("grades_attributes"));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("grades_attributes"), Some(&WhitelistEntry::Allowed));
    }

    #[test]
    fn list_with_nested_map() {
        let parsed = spec(json!(["full_name", {"grades_attributes": ["override_letter_grade"]}]));

        assert_eq!(parsed.get("full_name"), Some(&WhitelistEntry::Allowed));
        let nested = parsed
            .get("grades_attributes")
            .and_then(WhitelistEntry::nested_spec)
            .unwrap();
        assert!(nested.contains("override_letter_grade"));
        assert_eq!(nested.len(), 1);
    }

    #[test]
    fn all_and_true_literals() {
        let parsed = spec(json!({"profile_attributes": "all", "notes_attributes": true}));
        assert_eq!(parsed.get("profile_attributes"), Some(&WhitelistEntry::AllowAll));
        assert_eq!(parsed.get("notes_attributes"), Some(&WhitelistEntry::Allowed));
    }

    #[test]
    fn nested_scalar_name_is_one_name_spec() {
        let parsed = spec(json!({"grades_attributes": "override_letter_grade"}));
        let nested = parsed.get("grades_attributes").unwrap().nested_spec().unwrap();
        assert_eq!(nested.names().collect::<Vec<_>>(), vec!["override_letter_grade"]);
    }

    #[test]
    fn nested_lists_are_flattened() {
        let parsed = spec(json!([["a", ["b"]], "c"]));
        assert_eq!(parsed.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = WhitelistSpec::from_value(&AttrValue::from(json!(["ok", ""]))).unwrap_err();
        assert!(matches!(err, GuardError::InvalidSpec(_)));
    }

    #[test]
    fn duplicate_keys_collapse_to_most_permissive() {
        let parsed = spec(json!(["profile_attributes", {"profile_attributes": "all"}]));
        assert_eq!(parsed.get("profile_attributes"), Some(&WhitelistEntry::AllowAll));

        let parsed = spec(json!([{"grades_attributes": ["a"]}, "grades_attributes"]));
        assert!(matches!(
            parsed.get("grades_attributes"),
            Some(WhitelistEntry::Nested(_))
        ));
    }

    #[test]
    fn duplicate_nested_specs_are_unioned() {
        let parsed = spec(json!([{"grades_attributes": ["a"]}, {"grades_attributes": ["b"]}]));
        let nested = parsed.get("grades_attributes").unwrap().nested_spec().unwrap();
        assert_eq!(nested.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn builder_matches_literal() {
        let built = WhitelistSpec::new()
            .allow("full_name")
            .nested(
                "grades_attributes",
                WhitelistSpec::from_names(["override_letter_grade"]),
            )
            .allow_all("profile_attributes");
        let literal = spec(json!([
            "full_name",
            {"grades_attributes": ["override_letter_grade"], "profile_attributes": "all"}
        ]));
        assert_eq!(built, literal);
    }

    #[test]
    fn serde_roundtrip_keeps_grants() {
        let original = spec(json!(["a", {"b": "all", "c": ["d"]}]));
        let text = serde_json::to_string(&original).unwrap();
        let parsed: WhitelistSpec = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn merged_whitelist_adds_accessible_names() {
        let explicit = WhitelistSpec::from_names(["full_name"]);
        let accessible = names(&["class_id"]);
        let whitelist = EffectiveWhitelist::merged(&explicit, &accessible);

        assert!(whitelist.contains("full_name"));
        assert!(whitelist.contains("class_id"));
        assert!(!whitelist.contains("letter_grade"));
        assert_eq!(whitelist.names(), vec!["class_id", "full_name"]);
    }

    #[test]
    fn explicit_entry_wins_over_accessible() {
        let explicit = WhitelistSpec::new().allow_all("profile_attributes");
        let accessible = names(&["profile_attributes"]);
        let whitelist = EffectiveWhitelist::merged(&explicit, &accessible);
        assert_eq!(
            whitelist.get("profile_attributes"),
            Some(&WhitelistEntry::AllowAll)
        );
    }

    #[test]
    fn all_attributes_admits_delete_marker() {
        let attributes = names(&["favorite_sport"]);
        let whitelist = EffectiveWhitelist::all_attributes(&attributes);

        assert!(whitelist.contains("favorite_sport"));
        assert!(whitelist.contains(DELETE_MARKER));
        assert!(!whitelist.contains("id"));
        assert_eq!(whitelist.names(), vec!["_delete", "favorite_sport"]);
    }
}
