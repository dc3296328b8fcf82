//! # Attribute Model
//!
//! This module provides the data shapes the filter works on:
//!
//! - **Values**: [`AttrValue`] and [`AttrMap`], the tagged tree used for submitted
//!   payloads, whitelist literals and filtered output alike
//! - **Whitelists**: [`WhitelistSpec`] (a normalized spec literal), its per-key
//!   [`WhitelistEntry`] grants, and the per-level [`EffectiveWhitelist`]
//!
//! ## Grant Kinds
//!
//! | Literal | Entry | Meaning |
//! |---------|-------|---------|
//! | absent | (none) | Denied |
//! | `"name"` / `true` | `Allowed` | Bare inclusion |
//! | `"all"` | `AllowAll` | Every own attribute of the association target |
//! | list / map | `Nested` | Explicit nested whitelist |
//!
//! ## Usage
//!
//! ```
//! use massguard::attributes::{AttrValue, WhitelistEntry, WhitelistSpec};
//! use serde_json::json;
//!
//! let literal = AttrValue::from(json!(["full_name", {"profile_attributes": "all"}]));
//! let spec = WhitelistSpec::from_value(&literal).unwrap();
//! assert_eq!(spec.get("profile_attributes"), Some(&WhitelistEntry::AllowAll));
//! ```

mod spec;
mod value;

pub use spec::{
    EffectiveWhitelist, WhitelistEntry, WhitelistSpec, ALLOWED_LITERAL, ALLOW_ALL_LITERAL,
    DELETE_MARKER,
};
pub use value::{AttrMap, AttrValue};
