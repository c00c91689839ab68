//! # Canonical Serialization — JCS-Compatible Byte Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes used in
//! digest computation across the registry.
//!
//! ## Why this exists
//!
//! A credential's anchored digest is recomputed at verification time from
//! the relational record and compared against the ledger commitment. If
//! issuance and verification ever serialized the same record differently —
//! different key order, different number formatting, a stray sub-second on
//! a date — every credential would verify as tampered. The `CanonicalBytes`
//! newtype has a private inner field; the only way to construct one is
//! through `CanonicalBytes::new()`, which applies the coercion pipeline
//! before JCS serialization. Any function computing a digest must accept
//! `&CanonicalBytes`, so a non-canonical digest path cannot be written.
//!
//! ## Coercion rules
//!
//! 1. **Reject floats** — numeric trust fields (program scores) must be
//!    strings or integers. Floats have non-deterministic JCS serialization
//!    edge cases.
//! 2. **Pass through** null, bool, string, integer.
//! 3. **Recurse** into objects and arrays.
//!
//! Datetime normalization happens at the type level: [`crate::Timestamp`]
//! and `chrono::NaiveDate` serialize to fixed-format ISO 8601 strings.
//!
//! After coercion, serialization uses `serde_jcs` for RFC 8785 (JSON
//! Canonicalization Scheme) output: sorted keys, compact separators,
//! deterministic byte sequence.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS-compatible canonicalization.
///
/// # Invariants
///
/// - The only constructors are [`CanonicalBytes::new()`] and
///   [`CanonicalBytes::from_value()`].
/// - All numeric values are integers or strings, never floats.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
///
/// The inner `Vec<u8>` is private, so downstream code cannot smuggle
/// non-canonical bytes into a digest computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::FloatRejected`] if the value
    /// contains float numbers, or
    /// [`CanonicalizationError::SerializationFailed`] if JCS serialization
    /// fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value.
    ///
    /// Used where a caller needs to strip fields (e.g. a credential's
    /// volatile bookkeeping columns) before canonicalization.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let coerced = coerce_json_value(value)?;
        let bytes = serialize_canonical(&coerced)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively coerce JSON values according to the canonicalization rules.
///
/// Null, bool, string, and integer pass through unchanged; non-integer
/// floats are rejected; objects and arrays are recursed.
fn coerce_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            // Reject pure floats (not representable as i64/u64).
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut coerced = serde_json::Map::new();
            for (k, v) in map {
                coerced.insert(k, coerce_json_value(v)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr.into_iter().map(coerce_json_value).collect();
            Ok(Value::Array(coerced?))
        }
    }
}

/// Serialize a JSON value in JCS-canonical form (RFC 8785): sorted keys,
/// compact separators, UTF-8 output.
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_object_sorted_and_compact() {
        let data = serde_json::json!({"b": 2, "a": 1, "c": "hello"});
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn nested_objects_sorted() {
        let data = serde_json::json!({
            "outer": {"b": 2, "a": 1},
            "list": [3, 2, 1]
        });
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn float_rejected() {
        let data = serde_json::json!({"score": 87.5});
        let result = CanonicalBytes::new(&data);
        match result.unwrap_err() {
            CanonicalizationError::FloatRejected(f) => assert_eq!(f, 87.5),
            other => panic!("expected FloatRejected, got: {other}"),
        }
    }

    #[test]
    fn deeply_nested_float_rejected() {
        let data = serde_json::json!({"a": {"b": [{"c": 3.14}]}});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn integer_accepted() {
        let data = serde_json::json!({"block_height": 912_118});
        let cb = CanonicalBytes::new(&data).expect("integers should be accepted");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"block_height":912118}"#);
    }

    #[test]
    fn score_as_string_accepted() {
        // Program scores travel as decimal strings in canonical payloads.
        let data = serde_json::json!({"final_score": "87.5"});
        let cb = CanonicalBytes::new(&data).expect("string scores should pass");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"final_score":"87.5"}"#);
    }

    #[test]
    fn null_and_bool_passthrough() {
        let data = serde_json::json!({"student_number": null, "honors": true});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"honors":true,"student_number":null}"#);
    }

    #[test]
    fn empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
    }

    #[test]
    fn from_value_strips_nothing_by_itself() {
        let value = serde_json::json!({"z": 1, "a": 2});
        let cb = CanonicalBytes::from_value(value).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"a":2,"z":1}"#);
    }

    #[test]
    fn unicode_passthrough() {
        let data = serde_json::json!({"name": "N\u{00fc}ria \u{00c9}lodie"});
        let cb = CanonicalBytes::new(&data).expect("unicode should pass through");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert!(s.contains('\u{00fc}'));
    }

    #[test]
    fn len_and_is_empty() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        assert!(!cb.is_empty());
        assert!(cb.len() > 0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for generating JSON-compatible values without floats.
    fn json_value_no_floats() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,50}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,10}", inner, 0..8).prop_map(|m| {
                    let map: serde_json::Map<String, Value> = m.into_iter().collect();
                    Value::Object(map)
                }),
            ]
        })
    }

    proptest! {
        /// Canonicalization never panics for float-free values.
        #[test]
        fn never_panics(value in json_value_no_floats()) {
            let result = CanonicalBytes::new(&value);
            prop_assert!(result.is_ok(), "canonicalization failed: {:?}", result.err());
        }

        /// Same input always produces the same bytes.
        #[test]
        fn deterministic(value in json_value_no_floats()) {
            let a = CanonicalBytes::new(&value).unwrap();
            let b = CanonicalBytes::new(&value).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        /// Canonical bytes are valid UTF-8 JSON.
        #[test]
        fn valid_json(value in json_value_no_floats()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            let parsed: Result<Value, _> = serde_json::from_slice(cb.as_bytes());
            prop_assert!(parsed.is_ok());
        }

        /// Object keys are sorted lexicographically in canonical output.
        #[test]
        fn sorted_keys(keys in prop::collection::btree_set("[a-z]{1,8}", 2..6)) {
            let map: serde_json::Map<String, Value> = keys.iter()
                .enumerate()
                .map(|(i, k)| (k.clone(), serde_json::json!(i)))
                .collect();
            let cb = CanonicalBytes::from_value(Value::Object(map)).unwrap();
            let s = std::str::from_utf8(cb.as_bytes()).unwrap();

            let parsed: serde_json::Map<String, Value> = serde_json::from_str(s).unwrap();
            let output_keys: Vec<&String> = parsed.keys().collect();
            let mut sorted = output_keys.clone();
            sorted.sort();
            prop_assert_eq!(output_keys, sorted);
        }

        /// Any value containing a non-integer float is rejected.
        #[test]
        fn float_always_rejected(f in any::<f64>().prop_filter("not integer", |f| {
            f.fract() != 0.0 && f.is_finite()
        })) {
            let data = serde_json::json!({"val": f});
            prop_assert!(CanonicalBytes::new(&data).is_err());
        }
    }
}
