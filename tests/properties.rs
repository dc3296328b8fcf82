//! Property tests for the filter.
//!
//! Payloads are generated from a pool of keys that mixes whitelisted names,
//! association keys, row indexes and junk, so every branch of the per-key
//! decision gets exercised.

mod common;

use common::{school_registry, school_schema, spec};
use massguard::api::MassGuard;
use massguard::attributes::AttrValue;
use massguard::error::GuardError;
use massguard::filter::FilterOptions;
use massguard::report::NullReporter;
use massguard::schema::memory::InMemorySchema;
use proptest::prelude::*;
use serde_json::json;

const KEYS: &[&str] = &[
    "id",
    "full_name",
    "preferred_name",
    "letter_grade",
    "override_letter_grade",
    "class_id",
    "favorite_sport",
    "_delete",
    "grades_attributes",
    "profile_attributes",
    "lockers_attributes",
    "1",
    "2",
    "full_name(1s)",
    "owner",
];

const FIELDSETS: &[&str] = &["administrator", "student", "instructor", "janitor"];

fn guard() -> MassGuard<InMemorySchema, NullReporter> {
    MassGuard::new(school_registry(), school_schema(), NullReporter)
}

fn key() -> impl Strategy<Value = &'static str> {
    prop::sample::select(KEYS)
}

fn attr_value() -> impl Strategy<Value = AttrValue> {
    let leaf = prop_oneof![
        Just(AttrValue::Null),
        "[a-z0-9]{0,6}".prop_map(AttrValue::Scalar),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(AttrValue::List),
            prop::collection::vec((key(), inner), 0..6)
                .prop_map(|entries| AttrValue::Map(entries.into_iter().collect())),
        ]
    })
}

fn payload() -> impl Strategy<Value = AttrValue> {
    prop::collection::vec((key(), attr_value()), 0..8)
        .prop_map(|entries| AttrValue::Map(entries.into_iter().collect()))
}

/// Every key of `output` exists in `input` at the same path, with an equal leaf.
fn is_subset(output: &AttrValue, input: &AttrValue) -> bool {
    match (output, input) {
        (AttrValue::Map(out), AttrValue::Map(submitted)) => out.iter().all(|(key, value)| {
            submitted
                .get(key)
                .is_some_and(|original| is_subset(value, original))
        }),
        (AttrValue::List(out), AttrValue::List(submitted)) => {
            out.len() <= submitted.len()
                && out
                    .iter()
                    .zip(submitted)
                    .all(|(value, original)| is_subset(value, original))
        }
        (value, original) => value == original,
    }
}

fn nested_chain(levels: usize) -> (AttrValue, serde_json::Value) {
    let mut payload = json!({"city": "x"});
    let mut literal = json!(["city"]);
    for _ in 0..levels {
        payload = json!({ "address": payload });
        literal = json!({ "address": literal });
    }
    (AttrValue::from(payload), literal)
}

proptest! {
    /// Filtering only ever removes keys
    #[test]
    fn output_is_subset_of_input(input in payload(), fieldset in prop::sample::select(FIELDSETS)) {
        let filtered = guard().filter_for("Student", fieldset, &input).unwrap();
        prop_assert!(is_subset(&filtered.into_value(), &input));
    }

    /// Filtering twice changes nothing
    #[test]
    fn filtering_is_idempotent(input in payload(), fieldset in prop::sample::select(FIELDSETS)) {
        let guard = guard();
        let once = guard.filter_for("Student", fieldset, &input).unwrap().into_value();
        let twice = guard.filter_for("Student", fieldset, &once).unwrap();

        prop_assert!(twice.is_clean());
        prop_assert_eq!(twice.into_value(), once);
    }

    /// The root primary key never survives
    #[test]
    fn root_id_never_survives(input in payload(), fieldset in prop::sample::select(FIELDSETS)) {
        let filtered = guard().filter_for("Student", fieldset, &input).unwrap();
        prop_assert!(!filtered.attributes.contains_key("id"));
    }

    /// Kept plus rejected covers every submitted root key
    #[test]
    fn root_keys_are_kept_or_rejected(input in payload(), fieldset in prop::sample::select(FIELDSETS)) {
        let filtered = guard().filter_for("Student", fieldset, &input).unwrap();
        let submitted = input.as_map().unwrap();
        let rejected = filtered.rejected_paths();

        for key in submitted.keys() {
            let kept = filtered.attributes.contains_key(key);
            prop_assert!(kept != rejected.contains(&key));
        }
    }

    /// Payloads deeper than the cap fail; anything within it succeeds
    #[test]
    fn depth_cap_is_exact(levels in 0usize..16, max_depth in 0usize..12) {
        let (input, literal) = nested_chain(levels);
        let guard = guard().with_options(FilterOptions::default().max_depth(max_depth));

        let result = guard.filter_for("Student", spec(literal), &input);
        if levels > max_depth {
            let is_depth_error = matches!(result, Err(GuardError::DepthExceeded { .. }));
            prop_assert!(is_depth_error);
        } else {
            prop_assert!(result.is_ok());
        }
    }
}
