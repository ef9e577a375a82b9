//! Canonical JSON serialization for deterministic content hashing.
//!
//! Job configurations are arbitrary caller-supplied documents, and retries of
//! the same task must hash an identical configuration to identical bytes
//! regardless of key insertion order. Canonical JSON has:
//!
//! - Object keys sorted lexicographically (UTF-8 byte order)
//! - No whitespace
//! - UTF-8 output
//!
//! Numbers are written through `serde_json`'s own formatter. Floating-point
//! rendering is the shortest round-trippable form, which is stable for a
//! given bit pattern, so float-bearing configurations still hash
//! deterministically.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors that can occur during canonical JSON serialization.
#[derive(Debug, Error)]
pub enum CanonicalJsonError {
    /// Serde JSON conversion failed.
    #[error("serde_json error: {0}")]
    Serde(#[from] serde_json::Error),

    /// IO error during writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 encoding error (should never happen with valid JSON).
    #[error("UTF-8 encoding error")]
    Utf8Error,
}

/// Serialize `value` into canonical JSON bytes.
///
/// # Errors
///
/// Returns `CanonicalJsonError::Serde` if serialization fails.
#[must_use = "canonical bytes should be used for hashing"]
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonicalJsonError> {
    let v = serde_json::to_value(value)?;
    let mut out = Vec::<u8>::new();
    write_value(&v, &mut out)?;
    Ok(out)
}

/// Same as `to_canonical_bytes`, but returns a UTF-8 String.
///
/// # Errors
///
/// Returns `CanonicalJsonError::Serde` if serialization fails, or
/// `CanonicalJsonError::Utf8Error` if UTF-8 conversion fails.
#[must_use = "canonical string should be used for hashing"]
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, CanonicalJsonError> {
    let bytes = to_canonical_bytes(value)?;
    String::from_utf8(bytes).map_err(|_| CanonicalJsonError::Utf8Error)
}

fn write_value(v: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalJsonError> {
    match v {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => {
            // Writes JSON string with quotes + escaping, no whitespace.
            serde_json::to_writer(&mut *out, s)?;
        }
        Value::Array(arr) => {
            out.push(b'[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => write_object(map, out)?,
    }
    Ok(())
}

fn write_object(map: &Map<String, Value>, out: &mut Vec<u8>) -> Result<(), CanonicalJsonError> {
    out.push(b'{');

    // Collect keys and sort deterministically by UTF-8 byte order.
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    for (i, k) in keys.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }

        // Key (JSON string)
        serde_json::to_writer(&mut *out, *k)?;
        out.push(b':');

        // Value - key is guaranteed to exist since we got it from map.keys()
        if let Some(val) = map.get(*k) {
            write_value(val, out)?;
        }
    }

    out.push(b'}');
    Ok(())
}

fn write_number(n: &Number, out: &mut Vec<u8>) -> Result<(), CanonicalJsonError> {
    use std::io::Write;

    if let Some(i) = n.as_i64() {
        write!(out, "{i}")?;
        return Ok(());
    }
    if let Some(u) = n.as_u64() {
        write!(out, "{u}")?;
        return Ok(());
    }

    // Float: serde_json renders the shortest round-trippable form.
    serde_json::to_writer(&mut *out, n)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys_and_has_no_whitespace() {
        // Insertion order: query then labels
        let v = json!({"query":"SELECT 1","labels":{}});
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, r#"{"labels":{},"query":"SELECT 1"}"#);
    }

    #[test]
    fn sorts_nested_objects_recursively() {
        let v = json!({
            "b": { "d": 2, "c": 1 },
            "a": 0
        });
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, r#"{"a":0,"b":{"c":1,"d":2}}"#);
    }

    #[test]
    fn preserves_array_order() {
        let v = json!([3, 2, 1]);
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, "[3,2,1]");
    }

    #[test]
    fn writes_floats_in_shortest_form() {
        let v = json!({"x": 1.25, "y": 0.1});
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, r#"{"x":1.25,"y":0.1}"#);
    }

    #[test]
    fn float_rendering_is_repeatable() {
        let v = json!({"ratio": 0.30000000000000004});
        let first = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        let second = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(first, second);
    }

    #[test]
    fn allows_integers() {
        let v = json!({"x": 125, "y": -42});
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, r#"{"x":125,"y":-42}"#);
    }

    #[test]
    fn string_escaping_is_stable() {
        let v = json!({"s": "a\"b\nc"});
        // Exact escaping is deterministic; serde_json escapes quotes and newlines.
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, r#"{"s":"a\"b\nc"}"#);
    }

    #[test]
    fn handles_empty_object() {
        let v = json!({});
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, "{}");
    }

    #[test]
    fn handles_empty_array() {
        let v = json!([]);
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, "[]");
    }

    #[test]
    fn handles_null() {
        let v = json!(null);
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, "null");
    }

    #[test]
    fn handles_booleans() {
        let v = json!({"a": true, "b": false});
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, r#"{"a":true,"b":false}"#);
    }

    #[test]
    fn handles_large_integers() {
        let v = json!({"big": 9_223_372_036_854_775_807_i64});
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, r#"{"big":9223372036854775807}"#);
    }

    #[test]
    fn deeply_nested_structure() {
        let v = json!({
            "z": {
                "y": {
                    "x": [1, 2, {"w": 3, "v": 4}]
                }
            },
            "a": "first"
        });
        let s = to_canonical_string(&v).unwrap_or_else(|e| panic!("canonicalize failed: {e}"));
        assert_eq!(s, r#"{"a":"first","z":{"y":{"x":[1,2,{"v":4,"w":3}]}}}"#);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::{BTreeMap, HashMap};

        proptest! {
            #[test]
            fn insertion_order_does_not_affect_canonical_output(
                pairs in prop::collection::vec(
                    ("[a-z]{1,8}", "[a-z0-9]{1,16}"),
                    1..10
                )
            ) {
                // Build a HashMap (random iteration order)
                let hashmap: HashMap<String, String> = pairs.iter().cloned().collect();

                // Build a BTreeMap (sorted iteration order)
                let btreemap: BTreeMap<String, String> = pairs.iter().cloned().collect();

                // Both should produce identical canonical JSON
                let from_hash = to_canonical_string(&hashmap)
                    .unwrap_or_else(|e| panic!("failed to canonicalize hashmap: {e}"));
                let from_btree = to_canonical_string(&btreemap)
                    .unwrap_or_else(|e| panic!("failed to canonicalize btreemap: {e}"));

                prop_assert_eq!(from_hash, from_btree);
            }

            #[test]
            fn same_content_same_canonical_bytes(
                pairs in prop::collection::vec(
                    ("[a-z]{1,5}", -1000i64..1000i64),
                    1..5
                )
            ) {
                let map1: BTreeMap<String, i64> = pairs.iter().cloned().collect();
                let map2: BTreeMap<String, i64> = pairs.iter().cloned().collect();

                let bytes1 = to_canonical_bytes(&map1)
                    .unwrap_or_else(|e| panic!("failed to canonicalize map1: {e}"));
                let bytes2 = to_canonical_bytes(&map2)
                    .unwrap_or_else(|e| panic!("failed to canonicalize map2: {e}"));

                prop_assert_eq!(bytes1, bytes2);
            }
        }
    }
}
