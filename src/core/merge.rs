//! core::merge
//!
//! Pure deep-merge of JSON values with source precedence.
//!
//! # Merge rule
//!
//! For every key in the source object:
//!
//! - if the key exists in the target and *both* values are JSON objects,
//!   the values are merged recursively;
//! - otherwise the target's value is overwritten with the source's value.
//!
//! Arrays and scalars are leaves: they replace, never combine. A type
//! mismatch (object vs. scalar in either direction) also replaces. Keys
//! present only in the target survive untouched.
//!
//! Replaying origin history oldest to newest therefore accumulates state
//! monotonically: each newer revision's leaves override older ones while
//! untouched keys persist.
//!
//! Note: arrays overwrite wholesale rather than merging element-wise. That
//! is the contract, surprising as it may read; see the tests pinning it.

use serde_json::Value;

/// Deep-merge `source` onto `target`, mutating `target` in place.
///
/// `source` is taken by value; subtrees that end up in `target` are moved,
/// not cloned, so merging freshly parsed content never aliases the cache.
///
/// A non-object `source` (or a non-object `target`) is treated as a leaf
/// and replaces the target wholesale.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use jsonrelay::core::merge::merge_onto;
///
/// let mut target = json!({"a": {"x": 1}, "b": 2});
/// merge_onto(json!({"a": {"y": 2}}), &mut target);
/// assert_eq!(target, json!({"a": {"x": 1, "y": 2}, "b": 2}));
/// ```
pub fn merge_onto(source: Value, target: &mut Value) {
    match (source, target) {
        (Value::Object(source), Value::Object(target)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_onto(value, existing);
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (source, target) => *target = source,
    }
}
