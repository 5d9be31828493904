//! Canonical JSON rendering.
//!
//! `serde_json` backs its object maps with a `BTreeMap` (the default,
//! non-`preserve_order` configuration), so a [`Value`] tree always emits its
//! object keys in sorted order. Routing serialization through [`Value`]
//! therefore yields a canonical string: structurally equal inputs produce
//! identical output regardless of field or insertion order.

use serde::Serialize;
use serde_json::Value;

/// Converts `value` into a [`Value`] tree with sorted object keys.
pub fn stable_value<T: Serialize>(value: &T) -> serde_json::Result<Value> {
    serde_json::to_value(value)
}

/// Renders `value` as canonical JSON.
pub fn stable_string<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(&stable_value(value)?)
}

/// Compares two serializable values by their canonical JSON form.
///
/// Values that fail to serialize compare unequal.
pub fn deep_equal<A: Serialize, B: Serialize>(a: &A, b: &B) -> bool {
    match (stable_value(a), stable_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
